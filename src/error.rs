//! Error taxonomy for the HVSR pipeline

use thiserror::Error;

/// Errors raised by pipeline stages.
///
/// Only some of these are fatal to a site. Noise-gate and outlier-removal
/// failures are caught by the pipeline, recorded in the status report and
/// skipped.
#[derive(Error, Debug)]
pub enum HvsrError {
    #[error("channel {channel} has {available} samples, one window needs {required}")]
    InsufficientSamples {
        channel: String,
        available: usize,
        required: usize,
    },

    #[error("channel window counts diverge: {counts:?} (tolerance {tolerance:.1}%)")]
    ChannelMismatch { counts: Vec<usize>, tolerance: f64 },

    #[error("no usable windows remain for {stage}")]
    InsufficientWindows { stage: String },

    #[error("manual exclusion ranges overlap: [{first_start}, {first_end}] and [{second_start}, {second_end}]")]
    OverlappingExclusion {
        first_start: f64,
        first_end: f64,
        second_start: f64,
        second_end: f64,
    },

    #[error("malformed exclusion range [{start}, {end}]")]
    MalformedRange { start: f64, end: f64 },

    #[error("invalid sample stream: {0}")]
    InvalidStream(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("spectral estimate failed: {0}")]
    Fft(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HvsrError {
    pub fn insufficient_windows(stage: impl Into<String>) -> Self {
        Self::InsufficientWindows {
            stage: stage.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HvsrError>;
