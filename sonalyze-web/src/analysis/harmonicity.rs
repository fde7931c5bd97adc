//! Harmonic-to-noise ratio (HNR)
//!
//! Autocorrelation method: for each 40 ms frame the normalized
//! autocorrelation peak `r` inside the 75-600 Hz pitch range gives
//! `HNR = 10 log10(r / (1 - r))`. The frame autocorrelation is divided by the
//! autocorrelation of the analysis window so that the taper does not bias `r`
//! toward zero at long lags.

use rustfft::{num_complex::Complex, FftPlanner};

use super::dsp::hann_window;
use super::AnalysisError;
use crate::utils::DecodedAudio;

const MIN_PITCH_HZ: f64 = 75.0;
const MAX_PITCH_HZ: f64 = 600.0;
const WINDOW_SECONDS: f64 = 0.04;
const STEP_SECONDS: f64 = 0.01;

/// Frames quieter than this fraction of the global peak are unvoiced
const VOICING_FRACTION: f32 = 0.1;

const MIN_HNR_DB: f64 = -20.0;
const MAX_HNR_DB: f64 = 40.0;
const MAX_CORRELATION: f64 = 0.9999;

/// Reported when no frame is voiced
pub const UNVOICED_HNR_DB: f64 = -200.0;

/// Harmonicity result
#[derive(Debug, Clone)]
pub struct HarmonicityReport {
    /// Mean HNR over voiced frames in dB
    pub mean_hnr_db: f64,
    /// `(time_seconds, hnr_db)` of every voiced frame
    pub contour: Vec<(f32, f32)>,
    pub frame_step_seconds: f32,
}

impl HarmonicityReport {
    pub fn voiced_frames(&self) -> usize {
        self.contour.len()
    }
}

pub fn compute_harmonicity(audio: &DecodedAudio) -> Result<HarmonicityReport, AnalysisError> {
    if audio.samples.is_empty() {
        return Err(AnalysisError::EmptyAudio);
    }

    let sample_rate = audio.sample_rate as f64;
    let window_len = (WINDOW_SECONDS * sample_rate).round() as usize;
    let step = ((STEP_SECONDS * sample_rate).round() as usize).max(1);
    let min_lag = ((sample_rate / MAX_PITCH_HZ).floor() as usize).max(1);
    let max_lag = ((sample_rate / MIN_PITCH_HZ).ceil() as usize).min(window_len.saturating_sub(1));

    let frame_step_seconds = step as f32 / audio.sample_rate as f32;
    if window_len < 4 || min_lag >= max_lag {
        return Err(AnalysisError::InvalidParameters(format!(
            "Sample rate {} Hz too low for harmonicity analysis",
            audio.sample_rate
        )));
    }

    let global_peak = audio.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if global_peak == 0.0 || audio.samples.len() < window_len {
        return Ok(unvoiced(frame_step_seconds));
    }

    let window = hann_window(window_len);
    let fft_len = (2 * window_len).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let autocorrelate = |frame: &[f64], buffer: &mut Vec<Complex<f64>>| -> Vec<f64> {
        buffer.clear();
        buffer.extend(frame.iter().map(|&x| Complex::new(x, 0.0)));
        buffer.resize(fft_len, Complex::new(0.0, 0.0));
        forward.process(buffer);
        for c in buffer.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }
        inverse.process(buffer);
        buffer[..=max_lag].iter().map(|c| c.re).collect()
    };

    let mut buffer = Vec::with_capacity(fft_len);
    let window_f64: Vec<f64> = window.iter().map(|&w| w as f64).collect();
    let window_ac = autocorrelate(&window_f64, &mut buffer);

    let mut contour = Vec::new();
    let mut frame = vec![0.0f64; window_len];
    let mut start = 0;

    while start + window_len <= audio.samples.len() {
        let raw = &audio.samples[start..start + window_len];
        let frame_peak = raw.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));

        if frame_peak >= VOICING_FRACTION * global_peak {
            let mean = raw.iter().map(|&s| s as f64).sum::<f64>() / window_len as f64;
            for ((slot, &s), &w) in frame.iter_mut().zip(raw).zip(&window_f64) {
                *slot = (s as f64 - mean) * w;
            }

            let ac = autocorrelate(&frame, &mut buffer);
            if ac[0] > 0.0 {
                let r = (min_lag..=max_lag)
                    .filter(|&lag| window_ac[lag] > 0.0)
                    .map(|lag| (ac[lag] / ac[0]) / (window_ac[lag] / window_ac[0]))
                    .fold(f64::NEG_INFINITY, f64::max);

                let time = (start + window_len / 2) as f32 / audio.sample_rate as f32;
                contour.push((time, correlation_to_hnr(r) as f32));
            }
        }

        start += step;
    }

    if contour.is_empty() {
        return Ok(unvoiced(frame_step_seconds));
    }

    let mean_hnr_db = contour.iter().map(|&(_, h)| h as f64).sum::<f64>() / contour.len() as f64;

    tracing::debug!(
        voiced_frames = contour.len(),
        mean_hnr_db = format!("{:.2}", mean_hnr_db),
        "Harmonicity computed"
    );

    Ok(HarmonicityReport {
        mean_hnr_db,
        contour,
        frame_step_seconds,
    })
}

/// Map a normalized autocorrelation peak to dB, clamped to the reporting range
fn correlation_to_hnr(r: f64) -> f64 {
    if !r.is_finite() || r <= 0.0 {
        return MIN_HNR_DB;
    }
    let r = r.min(MAX_CORRELATION);
    (10.0 * (r / (1.0 - r)).log10()).clamp(MIN_HNR_DB, MAX_HNR_DB)
}

fn unvoiced(frame_step_seconds: f32) -> HarmonicityReport {
    HarmonicityReport {
        mean_hnr_db: UNVOICED_HNR_DB,
        contour: Vec::new(),
        frame_step_seconds,
    }
}
