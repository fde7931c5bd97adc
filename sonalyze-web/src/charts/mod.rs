//! PNG chart rendering
//!
//! Every chart is written with the plotters bitmap backend into one
//! directory per analysed file. File names are fixed, so a directory holds
//! at most one set of charts.

pub mod heatmap;
pub mod line;
pub mod pie;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::drawing::DrawingAreaErrorKind;
use plotters::style::{register_font, FontStyle, RGBColor};
use thiserror::Error;

pub use heatmap::render_spectrogram;
pub use line::{render_line_chart, render_waveform, LineChart, WaveformChart};
pub use pie::{render_pie_chart, PieSlice};

pub const WAVEFORM_SR_FILE: &str = "waveform_sr.png";
pub const DECIBELS_FILE: &str = "decibels.png";
pub const LOUDNESS_FILE: &str = "loudness.png";
pub const PEAK_WAVEFORM_FILE: &str = "peak_waveform.png";
pub const SILENCE_SPEECH_FILE: &str = "silence_speech.png";
pub const HARMONICITY_FILE: &str = "harmonicity.png";
pub const SPECTRUM_FILE: &str = "frequency_spectrum.png";

/// Default image size in pixels
pub const CHART_SIZE: (u32, u32) = (1024, 400);

/// Waveform charts are drawn as a min/max envelope with this many columns
pub const WAVEFORM_COLUMNS: usize = 1000;

pub const WAVE_COLOR: RGBColor = RGBColor(31, 119, 180);
pub const ACCENT_COLOR: RGBColor = RGBColor(214, 39, 40);

/// Font family every chart draws its text with
pub const FONT_FAMILY: &str = "sans-serif";

static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Chart rendering errors
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart drawing failed: {0}")]
    Drawing(String),

    #[error("No data to plot for {0}")]
    EmptyData(&'static str),

    #[error("Chart IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart font could not be loaded")]
    FontUnavailable,
}

/// Register the embedded font with plotters. Runs once per process; every
/// render function calls it before drawing text.
pub fn ensure_font() -> Result<(), ChartError> {
    let registered = *FONT_REGISTERED.get_or_init(|| {
        let ok = register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok();
        if !ok {
            tracing::error!("Embedded chart font rejected by plotters");
        }
        ok
    });

    if registered {
        Ok(())
    } else {
        Err(ChartError::FontUnavailable)
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for ChartError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(err.to_string())
    }
}

/// Locations of every chart produced for one analysed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPaths {
    pub waveform_sr: PathBuf,
    pub decibels: PathBuf,
    pub loudness: PathBuf,
    pub peak_waveform: PathBuf,
    pub silence_speech: PathBuf,
    pub harmonicity: PathBuf,
    pub spectrum: PathBuf,
}

impl ChartPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            waveform_sr: dir.join(WAVEFORM_SR_FILE),
            decibels: dir.join(DECIBELS_FILE),
            loudness: dir.join(LOUDNESS_FILE),
            peak_waveform: dir.join(PEAK_WAVEFORM_FILE),
            silence_speech: dir.join(SILENCE_SPEECH_FILE),
            harmonicity: dir.join(HARMONICITY_FILE),
            spectrum: dir.join(SPECTRUM_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 7] {
        [
            &self.waveform_sr,
            &self.decibels,
            &self.loudness,
            &self.peak_waveform,
            &self.silence_speech,
            &self.harmonicity,
            &self.spectrum,
        ]
    }
}

/// Reduce samples to `columns` (min, max) pairs for plotting
pub fn min_max_envelope(samples: &[f32], columns: usize) -> Vec<(f32, f32)> {
    if samples.is_empty() || columns == 0 {
        return Vec::new();
    }

    let chunk = samples.len().div_ceil(columns);
    samples
        .chunks(chunk)
        .map(|c| {
            c.iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)))
        })
        .collect()
}

/// Axis range covering `values`, widened when it would be empty
pub(crate) fn padded_range(values: impl Iterator<Item = f32>) -> std::ops::Range<f32> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if (hi - lo).abs() < 1e-6 {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}
