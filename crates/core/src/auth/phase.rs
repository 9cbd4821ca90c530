/// Lifecycle of a single sign-in attempt.
///
/// `Initiated -> Authorizing -> CallbackReceived -> Exchanging -> Established`,
/// with `Failed` reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Initiated,
    Authorizing,
    CallbackReceived,
    Exchanging,
    Established,
    Failed,
}

impl AttemptPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Established | Self::Failed)
    }

    pub fn can_transition_to(&self, next: AttemptPhase) -> bool {
        use AttemptPhase::*;

        match (self, next) {
            (Initiated, Authorizing)
            | (Authorizing, CallbackReceived)
            | (CallbackReceived, Exchanging)
            | (Exchanging, Established) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, or `None` if the transition is not allowed.
    pub fn advance(self, next: AttemptPhase) -> Option<AttemptPhase> {
        self.can_transition_to(next).then_some(next)
    }
}

impl std::fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initiated => "initiated",
            Self::Authorizing => "authorizing",
            Self::CallbackReceived => "callback_received",
            Self::Exchanging => "exchanging",
            Self::Established => "established",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::AttemptPhase::*;
    use super::*;

    #[test]
    fn happy_path_is_linear() {
        let phase = Initiated
            .advance(Authorizing)
            .and_then(|p| p.advance(CallbackReceived))
            .and_then(|p| p.advance(Exchanging))
            .and_then(|p| p.advance(Established));
        assert_eq!(phase, Some(Established));
    }

    #[test]
    fn any_open_phase_can_fail() {
        for phase in [Initiated, Authorizing, CallbackReceived, Exchanging] {
            assert_eq!(phase.advance(Failed), Some(Failed));
        }
    }

    #[test]
    fn terminal_phases_are_final() {
        for phase in [Established, Failed] {
            assert!(phase.is_terminal());
            assert_eq!(phase.advance(Failed), None);
            assert_eq!(phase.advance(Authorizing), None);
        }
    }

    #[test]
    fn cannot_reenter_authorizing() {
        assert_eq!(CallbackReceived.advance(Authorizing), None);
        assert_eq!(Exchanging.advance(Authorizing), None);
    }
}
