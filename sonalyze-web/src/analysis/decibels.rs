//! Decibel level and range over the decoded waveform

use super::dsp::{amplitude_to_dbfs, frame_rms};
use super::{AnalysisError, FRAME_LENGTH, HOP_LENGTH};
use crate::utils::DecodedAudio;

/// Decibel statistics
#[derive(Debug, Clone)]
pub struct DecibelReport {
    /// Mean of the per-frame RMS levels in dBFS
    pub mean_dbfs: f32,
    /// Peak sample level in dBFS
    pub peak_dbfs: f32,
    /// Quietest frame RMS in dBFS
    pub floor_dbfs: f32,
    /// `peak_dbfs - floor_dbfs`
    pub dynamic_range_db: f32,
    /// Per-frame RMS level in dBFS
    pub frame_dbfs: Vec<f32>,
    /// Seconds between consecutive frames
    pub frame_step_seconds: f32,
    /// Bitrate the report was computed alongside, for chart annotation
    pub bitrate_bps: u64,
}

/// Compute decibel statistics
pub fn compute_decibels(audio: &DecodedAudio, bitrate_bps: u64) -> Result<DecibelReport, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::EmptyAudio);
    }

    let peak = audio.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));

    let frame_dbfs: Vec<f32> = frame_rms(&audio.samples, FRAME_LENGTH, HOP_LENGTH)
        .into_iter()
        .map(amplitude_to_dbfs)
        .collect();
    let floor_dbfs = frame_dbfs.iter().copied().fold(f32::INFINITY, f32::min);
    let mean_dbfs = frame_dbfs.iter().map(|&db| db as f64).sum::<f64>() / frame_dbfs.len() as f64;
    let peak_dbfs = amplitude_to_dbfs(peak);

    Ok(DecibelReport {
        mean_dbfs: mean_dbfs as f32,
        peak_dbfs,
        floor_dbfs,
        dynamic_range_db: (peak_dbfs - floor_dbfs).max(0.0),
        frame_dbfs,
        frame_step_seconds: HOP_LENGTH as f32 / audio.sample_rate as f32,
        bitrate_bps,
    })
}
