//! Error taxonomy for the audio sampling pipeline.

use thiserror::Error;

/// Errors produced while configuring, opening, or running a sampling session.
///
/// Payloads are plain strings so the error can be cloned across the
/// start-up handshake between the sampler thread and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplerError {
    /// The input stream could not be opened, or was lost mid-session.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single acquisition call failed (disconnect, end of input, ...).
    #[error("audio read failed: {0}")]
    ReadError(String),

    /// The sampler configuration was rejected before any device was touched.
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(String),

    #[error("a sampling session is already running")]
    AlreadyRunning,

    #[error("sampling thread panicked")]
    WorkerPanicked,
}
