//! Loudness estimate
//!
//! Block-based loudness in the style of ITU-R BS.1770 without the K-weighting
//! filter: 400 ms blocks, 75 % overlap, absolute gate at -70.

use super::dsp::{power_to_db, DB_FLOOR};
use super::AnalysisError;
use crate::utils::DecodedAudio;

const BLOCK_SECONDS: f64 = 0.4;
const STEP_SECONDS: f64 = 0.1;
const ABSOLUTE_GATE: f64 = -70.0;
const LOUDNESS_OFFSET: f64 = -0.691;

/// Loudness result
#[derive(Debug, Clone)]
pub struct LoudnessReport {
    /// Gated integrated loudness (LUFS-like scale)
    pub integrated: f64,
    /// Loudness of every block
    pub block_loudness: Vec<f32>,
    /// Seconds between block starts
    pub block_step_seconds: f32,
}

pub fn compute_loudness(audio: &DecodedAudio) -> Result<LoudnessReport, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::EmptyAudio);
    }

    let sample_rate = audio.sample_rate as f64;
    let block_len = ((BLOCK_SECONDS * sample_rate) as usize).max(1);
    let step = ((STEP_SECONDS * sample_rate) as usize).max(1);

    let mut mean_squares = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + block_len).min(audio.samples.len());
        let block = &audio.samples[start..end];
        let sum_sq: f64 = block.iter().map(|&s| (s as f64) * (s as f64)).sum();
        mean_squares.push(sum_sq / block.len() as f64);

        if end == audio.samples.len() {
            break;
        }
        start += step;
    }

    let to_loudness = |ms: f64| {
        if ms <= 0.0 {
            DB_FLOOR as f64
        } else {
            LOUDNESS_OFFSET + power_to_db(ms)
        }
    };

    let block_loudness: Vec<f32> = mean_squares.iter().map(|&ms| to_loudness(ms) as f32).collect();

    let gated: Vec<f64> = mean_squares
        .iter()
        .copied()
        .filter(|&ms| to_loudness(ms) > ABSOLUTE_GATE)
        .collect();

    let integrated = if gated.is_empty() {
        DB_FLOOR as f64
    } else {
        to_loudness(gated.iter().sum::<f64>() / gated.len() as f64)
    };

    Ok(LoudnessReport {
        integrated,
        block_loudness,
        block_step_seconds: STEP_SECONDS as f32,
    })
}
