//! Mock Identity Provider for development and testing.
//!
//! Provides a fake OIDC server so the whole sign-in flow can run without a
//! real provider.

mod server;
mod templates;

pub use server::MockIdpServer;
