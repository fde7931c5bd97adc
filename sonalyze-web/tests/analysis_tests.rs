//! Integration tests for decoding and the analysis pipeline on real WAV files

mod helpers;

use helpers::*;
use sonalyze_web::analysis::{AnalysisError, AnalysisParameters, AnalysisPipeline};
use sonalyze_web::charts::ChartPaths;
use sonalyze_web::utils::decode_audio_file;
use tempfile::TempDir;

fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(AnalysisParameters::default()).unwrap()
}

#[test]
fn test_decode_reports_stream_facts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");
    generate_wav(
        &path,
        &AudioConfig {
            channels: 2,
            ..AudioConfig::tone(440.0, 2.0)
        },
    )
    .unwrap();

    let audio = decode_audio_file(&path).unwrap();

    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.bits_per_sample, Some(16));
    assert_eq!(audio.samples.len(), 88200);
    assert!((audio.duration_seconds - 2.0).abs() < 1e-9);
}

#[test]
fn test_silent_wav_metrics() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("silence.wav");
    generate_wav(&path, &AudioConfig::silence(5.0)).unwrap();

    let report = pipeline().run(&path, &dir.path().join("charts")).unwrap();
    let m = &report.metrics;

    assert_eq!(m.bitrate_bps, 44100 * 16);
    assert!(m.decibels.mean_dbfs < -60.0);
    assert_eq!(m.silence.silence_percentage(), 100.0);
    assert_eq!(m.tempo_bpm, 0.0);
    assert!((m.duration_seconds - 5.0).abs() < 1e-9);
    assert!(m.file_size_mb > 0.4 && m.file_size_mb < 0.5);

    assert_eq!(report.charts, ChartPaths::in_dir(&dir.path().join("charts")));
    for chart in report.charts.all() {
        assert!(chart.exists(), "missing {}", chart.display());
    }
}

#[test]
fn test_mp3_bitrate_is_file_average() {
    let dir = TempDir::new().unwrap();
    let path = fixture("mono_22k.mp3");
    let file_bytes = std::fs::metadata(&path).unwrap().len();

    let audio = decode_audio_file(&path).unwrap();
    assert_eq!(audio.bits_per_sample, None);
    assert_eq!(audio.sample_rate, 22050);
    assert_eq!(audio.channels, 1);

    let report = pipeline().run(&path, &dir.path().join("charts")).unwrap();
    let expected = (file_bytes as f64 * 8.0 / audio.duration_seconds).round() as u64;
    assert_eq!(report.metrics.bitrate_bps, expected);
    assert!((48_000..96_000).contains(&report.metrics.bitrate_bps));
}

#[test]
fn test_stereo_bitrate_counts_channels() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");
    generate_wav(
        &path,
        &AudioConfig {
            channels: 2,
            ..AudioConfig::silence(1.0)
        },
    )
    .unwrap();

    let report = pipeline().run(&path, &dir.path().join("charts")).unwrap();
    assert_eq!(report.metrics.bitrate_bps, 44100 * 16 * 2);
}

#[test]
fn test_click_track_tempo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clicks.wav");
    generate_wav(
        &path,
        &AudioConfig {
            duration_seconds: 10.0,
            signal: Signal::Clicks { bpm: 120.0 },
            ..Default::default()
        },
    )
    .unwrap();

    let report = pipeline().run(&path, &dir.path().join("charts")).unwrap();
    let bpm = report.metrics.tempo_bpm;
    assert!((bpm - 120.0).abs() < 4.0, "estimated {} BPM", bpm);
}

#[test]
fn test_tone_is_more_harmonic_than_noise() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let dir = TempDir::new().unwrap();
    let tone_path = dir.path().join("tone.wav");
    generate_wav(&tone_path, &AudioConfig::tone(220.0, 1.0)).unwrap();

    let noise_path = dir.path().join("noise.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&noise_path, spec).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..44100 {
        writer.write_sample(rng.gen_range(-12000i16..12000)).unwrap();
    }
    writer.finalize().unwrap();

    let tone = pipeline().run(&tone_path, &dir.path().join("tone")).unwrap();
    let noise = pipeline().run(&noise_path, &dir.path().join("noise")).unwrap();

    assert!(
        tone.metrics.harmonicity.mean_hnr_db > noise.metrics.harmonicity.mean_hnr_db,
        "tone {} noise {}",
        tone.metrics.harmonicity.mean_hnr_db,
        noise.metrics.harmonicity.mean_hnr_db
    );
    assert!(noise.metrics.silence.silence_percentage() < 1.0);
}

#[test]
fn test_spectrum_is_relative_to_peak() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    generate_wav(&path, &AudioConfig::tone(1000.0, 1.0)).unwrap();

    let report = pipeline().run(&path, &dir.path().join("charts")).unwrap();
    let values: Vec<f32> = report.metrics.spectrum.db.iter().flatten().copied().collect();

    assert!(values.iter().all(|&v| v <= 0.0));
    assert_eq!(values.iter().copied().fold(f32::NEG_INFINITY, f32::max), 0.0);
}

#[test]
fn test_threshold_changes_silence_ratio() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quiet.wav");
    // 0.005 amplitude sine: about -49 dBFS RMS
    generate_wav(
        &path,
        &AudioConfig {
            signal: Signal::Tone {
                frequency: 440.0,
                amplitude: 0.005,
            },
            ..AudioConfig::silence(1.0)
        },
    )
    .unwrap();

    let default = pipeline().run(&path, &dir.path().join("a")).unwrap();
    let strict = AnalysisPipeline::new(AnalysisParameters {
        silence_threshold_db: -60.0,
    })
    .unwrap()
    .run(&path, &dir.path().join("b"))
    .unwrap();

    assert_eq!(default.metrics.silence.silence_percentage(), 100.0);
    assert_eq!(strict.metrics.silence.silence_percentage(), 0.0);
}

#[test]
fn test_garbage_file_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.mp3");
    std::fs::write(&path, vec![0x55u8; 4096]).unwrap();

    let result = pipeline().run(&path, &dir.path().join("charts"));
    assert!(matches!(
        result,
        Err(AnalysisError::Decode(_)) | Err(AnalysisError::EmptyAudio)
    ));
}
