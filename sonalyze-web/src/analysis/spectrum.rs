//! Frequency spectrum (log-power spectrogram)
//!
//! The STFT is max-pooled onto a fixed grid while it is computed, so memory
//! does not grow with the length of the recording. Pooling before the dB
//! conversion gives the same cells as pooling afterwards because the
//! conversion is monotonic.

use super::dsp::Stft;

/// Floor applied to power before the log
const AMIN: f64 = 1e-10;

/// Dynamic range kept below the loudest cell
const TOP_DB: f32 = 80.0;

/// Upper bound on time cells kept per spectrogram
pub const MAX_TIME_CELLS: usize = 300;

/// Upper bound on frequency cells kept per spectrogram
pub const MAX_FREQ_CELLS: usize = 256;

/// Pooled spectrogram in dB relative to its loudest cell (all values `<= 0`)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// `db[time_cell][freq_cell]`
    pub db: Vec<Vec<f32>>,
    /// Audio time covered by all frames
    pub duration_seconds: f32,
    /// Frequency of the top bin (Nyquist)
    pub max_frequency_hz: f32,
    /// Largest STFT magnitude, the 0 dB reference
    pub peak_magnitude: f32,
}

impl Spectrogram {
    pub fn time_cells(&self) -> usize {
        self.db.len()
    }

    pub fn freq_cells(&self) -> usize {
        self.db.first().map_or(0, Vec::len)
    }

    /// Quietest value present (`-TOP_DB` unless the dynamic range is smaller)
    pub fn min_db(&self) -> f32 {
        self.db
            .iter()
            .flat_map(|cells| cells.iter().copied())
            .fold(0.0f32, f32::min)
    }
}

/// Compute the pooled spectrogram of `samples`, clipping everything more
/// than [`TOP_DB`] below the peak
pub fn compute_spectrum(stft: &Stft, samples: &[f32]) -> Spectrogram {
    let frames = stft.frame_count(samples.len());
    let bins = stft.bin_count();
    let t_chunk = frames.div_ceil(MAX_TIME_CELLS).max(1);
    let f_chunk = bins.div_ceil(MAX_FREQ_CELLS).max(1);

    let mut pooled = vec![vec![0.0f32; bins.div_ceil(f_chunk)]; frames.div_ceil(t_chunk)];
    stft.for_each_frame(samples, |frame, magnitudes| {
        let cells = &mut pooled[frame / t_chunk];
        for (bin, &m) in magnitudes.iter().enumerate() {
            let cell = &mut cells[bin / f_chunk];
            *cell = cell.max(m);
        }
    });

    let peak_magnitude = pooled
        .iter()
        .flat_map(|cells| cells.iter().copied())
        .fold(0.0f32, f32::max);
    let ref_db = power_db(peak_magnitude);

    let mut db: Vec<Vec<f32>> = pooled
        .iter()
        .map(|cells| cells.iter().map(|&m| (power_db(m) - ref_db) as f32).collect())
        .collect();

    let max_db = db
        .iter()
        .flat_map(|cells| cells.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = max_db - TOP_DB;
    for value in db.iter_mut().flat_map(|cells| cells.iter_mut()) {
        *value = value.max(floor).min(0.0);
    }

    Spectrogram {
        db,
        duration_seconds: frames as f32 * stft.hop as f32 / stft.sample_rate as f32,
        max_frequency_hz: stft.sample_rate as f32 / 2.0,
        peak_magnitude,
    }
}

fn power_db(magnitude: f32) -> f64 {
    let power = (magnitude as f64) * (magnitude as f64);
    10.0 * power.max(AMIN).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, samples: usize, sample_rate: u32) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_values_are_relative_to_peak() {
        let samples = sine(440.0, 16000, 16000);
        let stft = Stft::new(16000, 2048, 512);
        let spectrum = compute_spectrum(&stft, &samples);

        let max = spectrum
            .db
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(f32::NEG_INFINITY, f32::max);

        assert_eq!(max, 0.0);
        assert!(spectrum.min_db() >= -TOP_DB);
        assert_eq!(spectrum.peak_magnitude, stft.max_magnitude(&samples));
        assert_eq!(spectrum.time_cells(), stft.frame_count(samples.len()));
        assert_eq!(spectrum.freq_cells(), 205);
        assert_eq!(spectrum.max_frequency_hz, 8000.0);
    }

    #[test]
    fn test_silence_is_flat() {
        let spectrum = compute_spectrum(&Stft::new(44100, 2048, 512), &[0.0; 8192]);
        assert!(spectrum.db.iter().flatten().all(|&v| v == 0.0));
        assert_eq!(spectrum.peak_magnitude, 0.0);
    }

    #[test]
    fn test_long_input_stays_on_fixed_grid() {
        // ten minutes at 8 kHz: far more frames than time cells
        let sample_rate = 8000;
        let samples = sine(1000.0, 10 * 60 * sample_rate as usize, sample_rate);
        let stft = Stft::new(sample_rate, 2048, 512);

        let spectrum = compute_spectrum(&stft, &samples);

        assert!(stft.frame_count(samples.len()) > 9000);
        assert!(spectrum.time_cells() <= MAX_TIME_CELLS);
        assert!(spectrum.freq_cells() <= MAX_FREQ_CELLS);
        assert!((spectrum.duration_seconds - 600.0).abs() < 1.0);
    }
}
