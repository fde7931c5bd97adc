//! Analysis pipeline: decode once, extract every metric, render every chart

use std::path::Path;
use std::time::Instant;

use super::bitrate::{compute_bitrate, to_kbps};
use super::decibels::{compute_decibels, DecibelReport};
use super::dsp::Stft;
use super::harmonicity::{compute_harmonicity, HarmonicityReport};
use super::loudness::{compute_loudness, LoudnessReport};
use super::peak::{find_peak, PeakReport};
use super::silence_detector::{SilenceDetector, SilenceSpeechRatio};
use super::spectrum::{compute_spectrum, Spectrogram};
use super::tempo::estimate_tempo;
use super::{file_size, AnalysisError, AnalysisParameters, FRAME_LENGTH, HOP_LENGTH};
use crate::charts::{
    self, ChartPaths, LineChart, PieSlice, WaveformChart, ACCENT_COLOR, WAVE_COLOR,
};
use crate::utils::{decode_audio_file, DecodedAudio};

/// Every metric computed for one file
#[derive(Debug, Clone)]
pub struct AudioMetrics {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_seconds: f64,
    pub bitrate_bps: u64,
    pub file_size_mb: f64,
    pub decibels: DecibelReport,
    pub loudness: LoudnessReport,
    pub peak: PeakReport,
    pub silence: SilenceSpeechRatio,
    pub harmonicity: HarmonicityReport,
    /// Spectrogram pooled to the chart grid
    pub spectrum: Spectrogram,
    pub tempo_bpm: f64,
}

/// Metrics plus the charts rendered from them
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub metrics: AudioMetrics,
    pub charts: ChartPaths,
}

#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    params: AnalysisParameters,
    silence: SilenceDetector,
}

impl AnalysisPipeline {
    pub fn new(params: AnalysisParameters) -> Result<Self, AnalysisError> {
        let silence = SilenceDetector::new().with_threshold_db(params.silence_threshold_db)?;
        Ok(Self { params, silence })
    }

    pub fn params(&self) -> &AnalysisParameters {
        &self.params
    }

    /// Analyse the file at `audio_path` and write its charts into `chart_dir`
    pub fn run(&self, audio_path: &Path, chart_dir: &Path) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();

        let file_size_bytes = std::fs::metadata(audio_path)?.len();
        let audio = decode_audio_file(audio_path).map_err(|e| AnalysisError::Decode(format!("{:#}", e)))?;

        let metrics = self.analyze(&audio, file_size_bytes)?;
        let charts = self.render_charts(&audio, &metrics, chart_dir)?;

        tracing::info!(
            path = %audio_path.display(),
            duration_seconds = format!("{:.2}", metrics.duration_seconds),
            bitrate_kbps = to_kbps(metrics.bitrate_bps),
            tempo_bpm = format!("{:.1}", metrics.tempo_bpm),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisReport { metrics, charts })
    }

    /// Compute every metric from decoded audio
    ///
    /// The bitrate is computed first: the decibel report carries it. Spectrum
    /// and tempo stream the STFT frame by frame; tempo reuses the spectrum's
    /// peak magnitude as its 0 dB reference.
    pub fn analyze(&self, audio: &DecodedAudio, file_size_bytes: u64) -> Result<AudioMetrics, AnalysisError> {
        if audio.samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let bitrate_bps = compute_bitrate(audio, file_size_bytes)?;
        let decibels = compute_decibels(audio, bitrate_bps)?;
        let loudness = compute_loudness(audio)?;
        let peak = find_peak(audio)?;
        let silence = self.silence.classify(&audio.samples)?;
        let harmonicity = compute_harmonicity(audio)?;

        let stft = Stft::new(audio.sample_rate, FRAME_LENGTH, HOP_LENGTH);
        let spectrum = compute_spectrum(&stft, &audio.samples);
        let tempo_bpm = estimate_tempo(&stft, &audio.samples, spectrum.peak_magnitude);

        Ok(AudioMetrics {
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            duration_seconds: audio.duration_seconds,
            bitrate_bps,
            file_size_mb: file_size::bytes_to_mb(file_size_bytes),
            decibels,
            loudness,
            peak,
            silence,
            harmonicity,
            spectrum,
            tempo_bpm,
        })
    }

    /// Write all seven charts into `chart_dir` (created if missing)
    pub fn render_charts(
        &self,
        audio: &DecodedAudio,
        metrics: &AudioMetrics,
        chart_dir: &Path,
    ) -> Result<ChartPaths, AnalysisError> {
        std::fs::create_dir_all(chart_dir)?;
        let paths = ChartPaths::in_dir(chart_dir);
        let duration = audio.duration_seconds as f32;

        charts::render_waveform(
            &paths.waveform_sr,
            &WaveformChart {
                title: format!("Waveform ({} Hz)", audio.sample_rate),
                samples: &audio.samples,
                sample_rate: audio.sample_rate,
                marker: None,
            },
        )?;

        let decibel_points = timed(&metrics.decibels.frame_dbfs, metrics.decibels.frame_step_seconds);
        charts::render_line_chart(
            &paths.decibels,
            &LineChart {
                title: format!("Decibel level ({:.0} kbps)", to_kbps(metrics.bitrate_bps)),
                y_label: "RMS (dBFS)",
                points: &decibel_points,
                duration_seconds: Some(duration),
                y_range: None,
            },
        )?;

        let loudness_points = timed(&metrics.loudness.block_loudness, metrics.loudness.block_step_seconds);
        charts::render_line_chart(
            &paths.loudness,
            &LineChart {
                title: format!("Loudness ({:.1} integrated)", metrics.loudness.integrated),
                y_label: "Loudness (dB)",
                points: &loudness_points,
                duration_seconds: Some(duration),
                y_range: None,
            },
        )?;

        charts::render_waveform(
            &paths.peak_waveform,
            &WaveformChart {
                title: format!(
                    "Peak {:.3} at {:.2} s ({:.1} dBFS)",
                    metrics.peak.amplitude, metrics.peak.time_seconds, metrics.peak.dbfs
                ),
                samples: &audio.samples,
                sample_rate: audio.sample_rate,
                marker: Some((metrics.peak.time_seconds as f32, metrics.peak.value)),
            },
        )?;

        charts::render_pie_chart(
            &paths.silence_speech,
            "Silence vs speech",
            &[
                PieSlice {
                    label: "Silence",
                    value: metrics.silence.silent_frames as f64,
                    color: ACCENT_COLOR,
                },
                PieSlice {
                    label: "Speech",
                    value: metrics.silence.active_frames as f64,
                    color: WAVE_COLOR,
                },
            ],
        )?;

        charts::render_line_chart(
            &paths.harmonicity,
            &LineChart {
                title: format!("Harmonicity ({:.1} dB mean HNR)", metrics.harmonicity.mean_hnr_db),
                y_label: "HNR (dB)",
                points: &metrics.harmonicity.contour,
                duration_seconds: Some(duration),
                y_range: Some(-25.0..45.0),
            },
        )?;

        charts::render_spectrogram(&paths.spectrum, "Frequency spectrum (dB)", &metrics.spectrum)?;

        tracing::debug!(dir = %chart_dir.display(), "Charts rendered");
        Ok(paths)
    }
}

/// Pair each value with its start time
fn timed(values: &[f32], step_seconds: f32) -> Vec<(f32, f32)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f32 * step_seconds, v))
        .collect()
}
