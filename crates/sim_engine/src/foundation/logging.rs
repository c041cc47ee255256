//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Reads the `RUST_LOG` environment variable for filtering. Safe to call from
/// binaries only; library code should just use the `log` macros.
pub fn init() {
    env_logger::init();
}
