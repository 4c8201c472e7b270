//! Logging utilities
//!
//! Thin wrapper over `env_logger` so applications embedding the renderer
//! get diagnostics with a single call.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// Safe to call from examples and tests; panics if a logger was already
/// installed by the host application.
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring an already-installed logger.
pub fn try_init() {
    let _ = env_logger::try_init();
}
