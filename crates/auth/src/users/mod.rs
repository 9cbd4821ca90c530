//! User and linked-account storage.
//!
//! Provides `UserRepository` implementations for:
//! - In-memory (always available)
//! - SQLite (with `sqlite` feature)

mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use inmemory::UserStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteUserStore;
