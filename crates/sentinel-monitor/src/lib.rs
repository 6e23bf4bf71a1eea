//! Logging setup for the sentinel binaries.

mod logging;

pub use logging::{setup_logging, WorkerGuard};
