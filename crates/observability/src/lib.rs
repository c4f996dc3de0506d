//! Tracing and logging setup shared by every binary.

/// Initialize process-wide tracing from the given settings.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LoggingConfig) {
    tracing::init(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, LoggingConfig};
