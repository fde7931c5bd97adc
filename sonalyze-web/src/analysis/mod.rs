//! Metric extraction
//!
//! Each extractor is a pure function of the decoded audio; the only ordering
//! dependency is that the decibel report takes the bitrate as input.
//! [`pipeline::AnalysisPipeline`] runs them in sequence and renders charts.

pub mod bitrate;
pub mod decibels;
pub mod dsp;
pub mod file_size;
pub mod harmonicity;
pub mod loudness;
pub mod peak;
pub mod pipeline;
pub mod silence_detector;
pub mod spectrum;
pub mod tempo;

use thiserror::Error;

pub use pipeline::{AnalysisPipeline, AnalysisReport};

/// Analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File could not be opened, probed or decoded
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Decoded stream contains no samples
    #[error("Audio contains no samples")]
    EmptyAudio,

    /// Invalid analysis parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Chart could not be rendered or written
    #[error(transparent)]
    Chart(#[from] crate::charts::ChartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tunable analysis parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParameters {
    /// Frames quieter than this (RMS dBFS) count as silence
    pub silence_threshold_db: f32,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            silence_threshold_db: silence_detector::DEFAULT_THRESHOLD_DB,
        }
    }
}

/// Frame length shared by frame-energy extractors (samples)
pub const FRAME_LENGTH: usize = 2048;

/// Hop between frames for frame-energy extractors (samples)
pub const HOP_LENGTH: usize = 512;
