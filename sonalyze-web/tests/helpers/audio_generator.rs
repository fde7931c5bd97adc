//! Audio Test Fixture Generator
//!
//! Synthesizes WAV files with hound

use std::io::Cursor;
use std::path::Path;

/// What the generated file contains
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Digital silence
    Silence,
    /// Sine tone
    Tone { frequency: f32, amplitude: f32 },
    /// Short decaying 1 kHz bursts at a fixed tempo
    Clicks { bpm: f64 },
}

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub signal: Signal,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 5.0,
            sample_rate: 44100,
            channels: 1,
            signal: Signal::Silence,
        }
    }
}

impl AudioConfig {
    pub fn silence(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            ..Default::default()
        }
    }

    pub fn tone(frequency: f32, duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            signal: Signal::Tone {
                frequency,
                amplitude: 0.5,
            },
            ..Default::default()
        }
    }
}

fn samples(config: &AudioConfig) -> Vec<i16> {
    let total = (config.duration_seconds * config.sample_rate as f64) as usize;
    let rate = config.sample_rate as f32;

    match config.signal {
        Signal::Silence => vec![0; total],
        Signal::Tone { frequency, amplitude } => (0..total)
            .map(|i| {
                let t = i as f32 / rate;
                (amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin() * i16::MAX as f32) as i16
            })
            .collect(),
        Signal::Clicks { bpm } => {
            let period = (60.0 / bpm * config.sample_rate as f64) as usize;
            let click_len = config.sample_rate as usize / 100;
            let mut out = vec![0i16; total];
            for start in (0..total).step_by(period.max(1)) {
                for i in 0..click_len.min(total - start) {
                    let decay = 1.0 - i as f32 / click_len as f32;
                    let s = 0.8 * decay * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / rate).sin();
                    out[start + i] = (s * i16::MAX as f32) as i16;
                }
            }
            out
        }
    }
}

fn spec(config: &AudioConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Write a 16-bit PCM WAV file
pub fn generate_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<()> {
    let mut writer = hound::WavWriter::create(path, spec(config))?;
    for sample in samples(config) {
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// 16-bit PCM WAV file contents
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec(config)).unwrap();
        for sample in samples(config) {
            for _ in 0..config.channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
