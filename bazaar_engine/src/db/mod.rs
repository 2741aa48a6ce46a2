//! Database backends. SQLite is the only backend for now; it implements every trait in [`crate::traits`].
#[cfg(feature = "sqlite")]
pub mod sqlite;
