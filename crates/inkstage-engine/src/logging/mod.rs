//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only talks to the `log`
//! facade; `env_logger` is installed by whoever owns `main`.

mod init;

pub use init::{init_logging, LoggingConfig};
