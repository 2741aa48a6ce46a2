//! Helpers for tests that run against a real SQLite database. Enabled by the `test_utils` feature.
pub mod prepare_env;
