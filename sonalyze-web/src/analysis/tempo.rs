//! Tempo estimation
//!
//! Onset strength is the positive spectral flux of the log-power STFT. The
//! tempo is the autocorrelation lag of that envelope with the highest score
//! inside 30-300 BPM, weighted by a log-normal prior centred on 120 BPM.

use super::dsp::Stft;

const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 300.0;
const PRIOR_CENTER_BPM: f64 = 120.0;
/// Prior spread in octaves
const PRIOR_STD_OCTAVES: f64 = 1.0;

const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Envelope energy below this is treated as silence
const SILENT_ENVELOPE: f64 = 1e-9;

/// Onset strength per STFT frame (first frame is zero)
///
/// `reference` is the 0 dB magnitude; log-power is clipped [`TOP_DB`] below
/// it. Only the previous frame is kept while the STFT runs.
pub fn onset_envelope(stft: &Stft, samples: &[f32], reference: f32) -> Vec<f64> {
    let ref_db = 10.0 * ((reference as f64) * (reference as f64)).max(AMIN).log10();
    let bins = stft.bin_count();

    let mut envelope = Vec::with_capacity(stft.frame_count(samples.len()));
    let mut previous = vec![0.0f64; bins];
    let mut current = vec![0.0f64; bins];

    stft.for_each_frame(samples, |frame, magnitudes| {
        for (slot, &m) in current.iter_mut().zip(magnitudes) {
            let power = (m as f64) * (m as f64);
            *slot = (10.0 * power.max(AMIN).log10() - ref_db).max(-TOP_DB);
        }

        if frame == 0 {
            envelope.push(0.0);
        } else {
            let flux: f64 = current
                .iter()
                .zip(&previous)
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
            envelope.push(flux / bins as f64);
        }
        std::mem::swap(&mut previous, &mut current);
    });
    envelope
}

/// Estimate tempo in BPM; `0.0` when the envelope carries no energy or is too
/// short to hold one beat period
pub fn estimate_tempo(stft: &Stft, samples: &[f32], reference: f32) -> f64 {
    let envelope = onset_envelope(stft, samples, reference);
    let frame_rate = stft.frame_rate();

    let energy: f64 = envelope.iter().map(|v| v * v).sum();
    if energy < SILENT_ENVELOPE {
        return 0.0;
    }

    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|v| v - mean).collect();

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
    let max_lag = max_lag.min(centered.len().saturating_sub(2));
    if min_lag + 2 > max_lag {
        return 0.0;
    }

    // Unbiased autocorrelation for one lag past each end, for interpolation
    let autocorr = |lag: usize| -> f64 {
        let n = centered.len() - lag;
        centered[..n]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64
    };
    let scores: Vec<f64> = (min_lag - 1..=max_lag + 1).map(autocorr).collect();
    let score_at = |lag: usize| scores[lag + 1 - min_lag];

    let weighted = |lag: usize| {
        let bpm = 60.0 * frame_rate / lag as f64;
        score_at(lag) * log_normal_prior(bpm)
    };

    let best_lag = (min_lag..=max_lag)
        .max_by(|&a, &b| weighted(a).total_cmp(&weighted(b)))
        .unwrap_or(min_lag);

    if score_at(best_lag) <= 0.0 {
        return 0.0;
    }

    let refined_lag = best_lag as f64
        + parabolic_offset(score_at(best_lag - 1), score_at(best_lag), score_at(best_lag + 1));

    let bpm = 60.0 * frame_rate / refined_lag;
    tracing::debug!(bpm = format!("{:.1}", bpm), best_lag, "Tempo estimated");
    bpm
}

fn log_normal_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_STD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Vertex offset of the parabola through three equally spaced points
fn parabolic_offset(left: f64, center: f64, right: f64) -> f64 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}
