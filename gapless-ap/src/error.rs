//! Error types for gapless-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for gapless-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Seek target outside the accumulated stream
    #[error("Cannot seek to {percent}% (target {target_ticks} ticks, stream {total_ticks} ticks)")]
    InvalidSeekPosition {
        percent: f64,
        target_ticks: i64,
        total_ticks: i64,
    },

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<gapless_common::Error> for Error {
    fn from(err: gapless_common::Error) -> Self {
        match err {
            gapless_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using gapless-ap Error
pub type Result<T> = std::result::Result<T, Error>;
