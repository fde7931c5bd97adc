//! Audio decoding
//!
//! Decodes an uploaded file once into mono f32 PCM plus the stream facts the
//! metric extractors need (sample rate, channel count, bit depth).
//!
//! Uses symphonia for format-agnostic decoding (MP3, WAV, ...).

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples (channel average, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source stream
    pub channels: usize,
    /// Bits per sample for PCM streams, `None` for compressed codecs
    pub bits_per_sample: Option<u32>,
    /// Duration in seconds
    pub duration_seconds: f64,
}

impl DecodedAudio {
    /// Build from already-mono samples (used by tests and synthetic input)
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_seconds = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            channels: 1,
            bits_per_sample: None,
            duration_seconds,
        }
    }
}

/// Decode an audio file to mono f32 PCM
///
/// Packets that fail to decode are skipped (MP3 streams commonly start with
/// an undecodable frame); any other error aborts.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let bits_per_sample = track.codec_params.bits_per_sample;
    let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(anyhow::anyhow!("Error reading packet: {}", e));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if channel_count == 0 {
                    channel_count = decoded.spec().channels.count();
                }
                append_mono(&decoded, &mut samples);
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                skipped_packets += 1;
                tracing::debug!(path = %file_path.display(), reason, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to decode packet in: {}", file_path.display())
                });
            }
        }
    }

    if skipped_packets > 0 {
        tracing::warn!(
            path = %file_path.display(),
            skipped_packets,
            "Some packets could not be decoded"
        );
    }

    let duration_seconds = samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels = channel_count,
        total_samples = samples.len(),
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: channel_count.max(1),
        bits_per_sample,
        duration_seconds,
    })
}

/// Average all channels of a decoded buffer into `out`
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::U16(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::U24(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::U32(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::S8(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::S16(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::S24(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::S32(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::F32(buf) => mix_to_mono(&**buf, out),
        AudioBufferRef::F64(buf) => mix_to_mono(&**buf, out),
    }
}

fn mix_to_mono<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    if num_channels == 0 {
        return;
    }

    out.reserve(buf.frames());
    for frame_idx in 0..buf.frames() {
        let sum: f32 = (0..num_channels)
            .map(|ch| f32::from_sample(buf.chan(ch)[frame_idx]))
            .sum();
        out.push(sum / num_channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_audio_file_not_found() {
        let result = decode_audio_file(Path::new("/nonexistent/file.mp3"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to open audio file"));
    }

    #[test]
    fn test_decode_garbage_fails_to_probe() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let result = decode_audio_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_mono_duration() {
        let audio = DecodedAudio::from_mono(vec![0.0; 22050], 44100);
        assert_eq!(audio.channels, 1);
        assert!((audio.duration_seconds - 0.5).abs() < 1e-9);
    }
}
