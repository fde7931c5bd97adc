//! Peak sample detection for the annotated waveform chart

use super::dsp::amplitude_to_dbfs;
use super::AnalysisError;
use crate::utils::DecodedAudio;

/// Loudest sample of the waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakReport {
    /// Absolute amplitude of the peak sample
    pub amplitude: f32,
    /// Signed value at the peak (for plotting the marker)
    pub value: f32,
    pub sample_index: usize,
    pub time_seconds: f64,
    pub dbfs: f32,
}

/// Locate the first sample with the largest absolute amplitude
pub fn find_peak(audio: &DecodedAudio) -> Result<PeakReport, AnalysisError> {
    let (sample_index, value) = audio
        .samples
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
            Some((_, b)) if b.abs() >= s.abs() => best,
            _ => Some((i, s)),
        })
        .ok_or(AnalysisError::EmptyAudio)?;

    Ok(PeakReport {
        amplitude: value.abs(),
        value,
        sample_index,
        time_seconds: sample_index as f64 / audio.sample_rate as f64,
        dbfs: amplitude_to_dbfs(value.abs()),
    })
}
