//! Error types for wavplay

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WavplayError {
    /// Rejected stream-format parameters. Raised before any device
    /// interaction; a caller bug, not a runtime condition.
    #[error("Invalid stream format: {0}")]
    InvalidFormat(String),

    /// The output device could not begin rendering.
    #[error("Device start error: {0}")]
    DeviceStart(String),

    /// The output device failed mid-stream (hardware removed, backend
    /// error callback fired).
    #[error("Device runtime error: {0}")]
    DeviceRuntime(String),

    /// Reading samples from the source failed for a reason other than
    /// exhaustion.
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WavplayError>;
