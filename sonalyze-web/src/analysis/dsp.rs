//! Shared signal helpers: framing, dB conversion, windowing, STFT

use rustfft::{num_complex::Complex, FftPlanner};

/// Lowest dBFS value reported; digital silence maps here instead of -inf
pub const DB_FLOOR: f32 = -120.0;

/// Amplitude (linear, full scale 1.0) to dBFS, floored at [`DB_FLOOR`]
pub fn amplitude_to_dbfs(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return DB_FLOOR;
    }
    (20.0 * amplitude.log10()).max(DB_FLOOR)
}

/// Mean-square power to dB, floored at [`DB_FLOOR`]
pub fn power_to_db(power: f64) -> f64 {
    if power <= 0.0 {
        return DB_FLOOR as f64;
    }
    (10.0 * power.log10()).max(DB_FLOOR as f64)
}

/// Number of frames covering `len` samples; short input still yields one frame
pub fn frame_count(len: usize, frame_len: usize, hop: usize) -> usize {
    if len <= frame_len {
        1
    } else {
        1 + (len - frame_len) / hop
    }
}

/// Root-mean-square of each frame (zero-padded past the end)
pub fn frame_rms(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f32> {
    let frames = frame_count(samples.len(), frame_len, hop);
    (0..frames)
        .map(|i| {
            let start = (i * hop).min(samples.len());
            let end = (start + frame_len).min(samples.len());
            let sum_sq: f64 = samples[start..end].iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_sq / frame_len as f64).sqrt() as f32
        })
        .collect()
}

/// Periodic Hann window
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / len as f32).cos())
        .collect()
}

/// Hann-windowed short-time Fourier transform
///
/// Frames are produced one at a time; callers fold each magnitude frame into
/// whatever summary they need instead of holding the full matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stft {
    pub n_fft: usize,
    pub hop: usize,
    pub sample_rate: u32,
}

impl Stft {
    pub fn new(sample_rate: u32, n_fft: usize, hop: usize) -> Self {
        Self {
            n_fft,
            hop,
            sample_rate,
        }
    }

    /// Call `visit(frame_index, magnitudes)` for every frame of `samples`.
    /// Past the end of the input the frame is zero-padded.
    pub fn for_each_frame(&self, samples: &[f32], mut visit: impl FnMut(usize, &[f32])) {
        let window = hann_window(self.n_fft);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.n_fft);
        let bins = self.bin_count();

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut magnitudes = vec![0.0f32; bins];

        for frame in 0..self.frame_count(samples.len()) {
            let start = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = samples.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * window[i], 0.0);
            }
            fft.process(&mut buffer);
            for (mag, c) in magnitudes.iter_mut().zip(&buffer[..bins]) {
                *mag = c.norm();
            }
            visit(frame, &magnitudes);
        }
    }

    /// Frames produced for `len` input samples
    pub fn frame_count(&self, len: usize) -> usize {
        frame_count(len, self.n_fft, self.hop)
    }

    pub fn bin_count(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop as f64
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.n_fft as f64
    }

    /// Largest magnitude over all frames and bins
    pub fn max_magnitude(&self, samples: &[f32]) -> f32 {
        let mut max = 0.0f32;
        self.for_each_frame(samples, |_, frame| {
            max = frame.iter().copied().fold(max, f32::max);
        });
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitude_to_dbfs() {
        assert_eq!(amplitude_to_dbfs(0.0), DB_FLOOR);
        assert!((amplitude_to_dbfs(1.0)).abs() < 1e-6);
        assert!((amplitude_to_dbfs(0.5) + 6.0206).abs() < 1e-3);
        assert_eq!(amplitude_to_dbfs(1e-9), DB_FLOOR);
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(0, 2048, 512), 1);
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(2048 + 512, 2048, 512), 2);
        assert_eq!(frame_count(2048 + 1023, 2048, 512), 2);
    }

    #[test]
    fn test_frame_rms_of_constant() {
        let rms = frame_rms(&[0.5; 4096], 1024, 1024);
        assert_eq!(rms.len(), 4);
        assert!(rms.iter().all(|&r| (r - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_stft_peak_bin_of_sine() {
        let sample_rate = 8000;
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin())
            .collect();

        let stft = Stft::new(sample_rate, 512, 256);
        let mut peak_bins = Vec::new();
        stft.for_each_frame(&samples, |_, frame| {
            assert_eq!(frame.len(), stft.bin_count());
            let peak = frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            peak_bins.push(peak);
        });

        assert_eq!(peak_bins.len(), stft.frame_count(samples.len()));
        assert!((stft.bin_frequency(peak_bins[3]) - 1000.0).abs() < 20.0);
    }

    #[test]
    fn test_stft_max_magnitude_of_silence() {
        let stft = Stft::new(44100, 2048, 512);
        assert_eq!(stft.max_magnitude(&[0.0; 4096]), 0.0);
    }
}
