//! Process-wide logging setup shared by the dispensary binaries.

pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_KEY, LogFormat, UnknownLogFormat};

/// Install the global subscriber, reading the format from the environment.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init();
}
