//! Functional core for signin.
//!
//! Everything in here is free of network and storage I/O: PKCE generation,
//! authorization URL construction, profile mapping and session binding. The
//! `signin_auth` crate supplies the I/O shell around it.

pub mod auth;
pub mod serde;
