//! Audio I/O: decoding uploads into canonical waveforms and writing stems

pub mod decode;
pub mod encode;
pub mod waveform;

pub use waveform::Waveform;

use std::path::PathBuf;
use thiserror::Error;

/// Errors from audio decoding, validation and encoding
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend could not parse the container or codec
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// Anything that is not (channels, samples) after the single
    /// documented squeeze
    #[error("audio must be (channels, samples), got shape {0:?}")]
    Shape(Vec<usize>),

    /// Both the primary and the fallback encoder failed
    #[error("failed to encode {path}: {primary}; fallback: {fallback}")]
    Encode {
        path: PathBuf,
        primary: String,
        fallback: String,
    },
}
