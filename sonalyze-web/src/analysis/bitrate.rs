//! Bitrate

use super::AnalysisError;
use crate::utils::DecodedAudio;

/// Bitrate in bits per second
///
/// PCM streams (decoder reports a bit depth) use
/// `sample_rate * bits_per_sample * channels`. Compressed streams fall back
/// to the average rate over the file: `file_bytes * 8 / duration`.
pub fn compute_bitrate(audio: &DecodedAudio, file_size_bytes: u64) -> Result<u64, AnalysisError> {
    if let Some(bits) = audio.bits_per_sample {
        return Ok(audio.sample_rate as u64 * bits as u64 * audio.channels as u64);
    }

    if audio.duration_seconds <= 0.0 {
        return Err(AnalysisError::EmptyAudio);
    }

    Ok((file_size_bytes as f64 * 8.0 / audio.duration_seconds).round() as u64)
}

/// Bits per second to kilobits per second
pub fn to_kbps(bitrate_bps: u64) -> f64 {
    bitrate_bps as f64 / 1000.0
}
