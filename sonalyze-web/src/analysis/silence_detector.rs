//! Silence/speech classification over frame energy
//!
//! Every frame whose RMS level falls below the threshold is silence; every
//! other frame is active sound (speech, music, noise).

use super::dsp::{amplitude_to_dbfs, frame_rms};
use super::{AnalysisError, FRAME_LENGTH, HOP_LENGTH};

/// Default silence threshold (RMS dBFS)
pub const DEFAULT_THRESHOLD_DB: f32 = -40.0;

/// Frame classification counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceSpeechRatio {
    pub silent_frames: usize,
    pub active_frames: usize,
}

impl SilenceSpeechRatio {
    pub fn total_frames(&self) -> usize {
        self.silent_frames + self.active_frames
    }

    /// Silent frames as a fraction of all frames (0.0..=1.0)
    pub fn silence_ratio(&self) -> f64 {
        if self.total_frames() == 0 {
            return 0.0;
        }
        self.silent_frames as f64 / self.total_frames() as f64
    }

    pub fn silence_percentage(&self) -> f64 {
        self.silence_ratio() * 100.0
    }

    pub fn speech_percentage(&self) -> f64 {
        if self.total_frames() == 0 {
            return 0.0;
        }
        100.0 - self.silence_percentage()
    }
}

/// Silence detector
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Silence threshold in dBFS
    threshold_db: f32,
}

impl SilenceDetector {
    /// Create new silence detector with defaults
    pub fn new() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
        }
    }

    /// Set silence threshold in dBFS
    pub fn with_threshold_db(mut self, threshold_db: f32) -> Result<Self, AnalysisError> {
        if !threshold_db.is_finite() || threshold_db > 0.0 {
            return Err(AnalysisError::InvalidParameters(
                "Silence threshold must be a negative dBFS value".to_string(),
            ));
        }
        self.threshold_db = threshold_db;
        Ok(self)
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Classify each frame as silent or active
    ///
    /// Input shorter than one frame is classified as a single frame.
    pub fn classify(&self, samples: &[f32]) -> Result<SilenceSpeechRatio, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let silent_frames = frame_rms(samples, FRAME_LENGTH, HOP_LENGTH)
            .into_iter()
            .filter(|&rms| amplitude_to_dbfs(rms) < self.threshold_db)
            .count();
        let total = super::dsp::frame_count(samples.len(), FRAME_LENGTH, HOP_LENGTH);

        Ok(SilenceSpeechRatio {
            silent_frames,
            active_frames: total - silent_frames,
        })
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_detector_creation() {
        let detector = SilenceDetector::new();
        assert_eq!(detector.threshold_db(), -40.0);
    }

    #[test]
    fn test_with_threshold() {
        let detector = SilenceDetector::new().with_threshold_db(-50.0).unwrap();
        assert_eq!(detector.threshold_db(), -50.0);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(SilenceDetector::new().with_threshold_db(10.0).is_err());
        assert!(SilenceDetector::new().with_threshold_db(f32::NAN).is_err());
    }

    #[test]
    fn test_digital_silence_is_all_silent() {
        let ratio = SilenceDetector::new().classify(&vec![0.0; 5 * 44100]).unwrap();

        assert_eq!(ratio.active_frames, 0);
        assert!(ratio.silent_frames > 0);
        assert_eq!(ratio.silence_percentage(), 100.0);
        assert_eq!(ratio.speech_percentage(), 0.0);
    }

    #[test]
    fn test_half_silence_half_sound() {
        let sample_rate = 44100;
        let mut samples = vec![0.0001f32; 2 * sample_rate];
        samples.extend(std::iter::repeat(0.5f32).take(2 * sample_rate));

        let ratio = SilenceDetector::new().classify(&samples).unwrap();

        assert!((ratio.silence_ratio() - 0.5).abs() < 0.02, "ratio {}", ratio.silence_ratio());
    }

    #[test]
    fn test_short_input_is_one_frame() {
        let ratio = SilenceDetector::new().classify(&[0.5; 10]).unwrap();
        assert_eq!(ratio.total_frames(), 1);
        assert_eq!(ratio.active_frames, 1);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(SilenceDetector::new().classify(&[]).is_err());
    }
}
