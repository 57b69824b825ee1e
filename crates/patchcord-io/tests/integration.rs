//! Integration tests for patchcord-io WAV I/O and file-backed reverb loading.

use std::sync::Arc;
use std::time::Duration;

use patchcord_core::{AudioBuffer, AudioContext};
use patchcord_effects::{Effect, LoadError, LoadStatus, Reverb, ReverbSettings};
use patchcord_io::{Error, WavFileLoader, read_buffer, write_buffer};
use tempfile::NamedTempFile;

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// WAV decoding
// ---------------------------------------------------------------------------

fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn pcm_spec(channels: u16, sample_rate: u32, bits_per_sample: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    }
}

#[test]
fn buffer_roundtrip_preserves_samples_and_rate() {
    let buffer = AudioBuffer::new(sine_wave(32000, 250.0, 640), 32000.0);
    let file = NamedTempFile::new().unwrap();
    write_buffer(file.path(), &buffer).unwrap();

    let loaded = read_buffer(file.path()).unwrap();
    assert_eq!(loaded.sample_rate(), 32000.0);
    assert_eq!(loaded.samples(), buffer.samples());
}

#[test]
fn reads_24_bit_impulse_response() {
    let expected: Vec<f32> = sine_wave(48000, 1000.0, 480).iter().map(|s| s * 0.5).collect();
    let file = NamedTempFile::new().unwrap();
    let mut writer = hound::WavWriter::create(file.path(), pcm_spec(1, 48000, 24)).unwrap();
    for &s in &expected {
        writer.write_sample((s * 8_388_608.0) as i32).unwrap();
    }
    writer.finalize().unwrap();

    let loaded = read_buffer(file.path()).unwrap();
    assert_eq!(loaded.len(), expected.len());
    for (a, b) in expected.iter().zip(loaded.samples()) {
        assert!((a - b).abs() < 1e-5, "sample mismatch: {a} vs {b}");
    }
}

#[test]
fn stereo_16_bit_response_is_folded_to_mono() {
    let file = NamedTempFile::new().unwrap();
    let mut writer = hound::WavWriter::create(file.path(), pcm_spec(2, 22050, 16)).unwrap();
    for s in [16384i16, 0, -16384, -16384] {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let loaded = read_buffer(file.path()).unwrap();
    assert_eq!(loaded.sample_rate(), 22050.0);
    assert_eq!(loaded.samples(), &[0.25, -0.5]);
}

#[test]
fn truncated_file_is_a_wav_error() {
    let file = NamedTempFile::new().unwrap();
    write_buffer(file.path(), &AudioBuffer::new(vec![0.5; 64], 48000.0)).unwrap();
    let bytes = std::fs::read(file.path()).unwrap();
    std::fs::write(file.path(), &bytes[..20]).unwrap();

    assert!(matches!(read_buffer(file.path()), Err(Error::Wav(_))));
}

// ---------------------------------------------------------------------------
// Reverb with WavFileLoader
// ---------------------------------------------------------------------------

fn wet_reverb(src: &str) -> ReverbSettings {
    ReverbSettings {
        level: Some(1.0),
        time: Some(0.0),
        src: Some(src.to_owned()),
        wet: Some(1.0),
        dry: Some(0.0),
    }
}

#[test]
fn reverb_convolves_with_response_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_buffer(
        dir.path().join("tap.wav"),
        &AudioBuffer::new(vec![0.5], 48000.0),
    )
    .unwrap();

    let mut ctx = AudioContext::new(48000.0);
    let loader = Arc::new(WavFileLoader::with_root(dir.path()));
    let mut reverb = Reverb::new(&mut ctx, wet_reverb("tap.wav"), loader).unwrap();

    let src = ctx.create_constant_source(1.0).unwrap();
    let dest = ctx.destination();
    reverb.set_input(&mut ctx, src).unwrap();
    reverb.set_output(&mut ctx, dest).unwrap();
    ctx.start(src, 0.0).unwrap();

    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);
    let out = ctx.render(128);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6), "{out:?}");
}

#[test]
fn reverb_resamples_response_to_context_rate() {
    let dir = tempfile::tempdir().unwrap();
    let response = AudioBuffer::new(vec![1.0, 0.75, 0.5, 0.25], 24000.0);
    write_buffer(dir.path().join("room.wav"), &response).unwrap();

    let mut ctx = AudioContext::new(48000.0);
    let loader = Arc::new(WavFileLoader::with_root(dir.path()));
    let mut reverb = Reverb::new(&mut ctx, wet_reverb("room.wav"), loader).unwrap();
    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);

    let conv = reverb.convolver().unwrap();
    let installed = ctx.buffer(conv).unwrap().unwrap();
    assert_eq!(installed.sample_rate(), 48000.0);
    assert!(installed.len() > response.len());
}

#[test]
fn reverb_missing_file_fails_without_sound() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = AudioContext::new(48000.0);
    let loader = Arc::new(WavFileLoader::with_root(dir.path()));
    let mut reverb = Reverb::new(&mut ctx, wet_reverb("absent.wav"), loader).unwrap();

    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Failed);
    assert_eq!(
        reverb.last_error(),
        Some(&LoadError::NotFound("absent.wav".to_owned()))
    );
}

#[test]
fn reverb_remote_source_is_unsupported() {
    let mut ctx = AudioContext::new(48000.0);
    let loader = Arc::new(WavFileLoader::new());
    let mut reverb = Reverb::new(&mut ctx, wet_reverb("http://example.com/ir.wav"), loader).unwrap();

    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Failed);
    assert!(matches!(reverb.last_error(), Some(LoadError::Unsupported(_))));
}

#[test]
fn reverb_switches_to_file_url_source() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");
    write_buffer(&first, &AudioBuffer::new(vec![1.0], 48000.0)).unwrap();
    write_buffer(&second, &AudioBuffer::new(vec![0.25, 0.125], 48000.0)).unwrap();

    let mut ctx = AudioContext::new(48000.0);
    let loader = Arc::new(WavFileLoader::new());
    let mut reverb = Reverb::new(&mut ctx, wet_reverb(&first.display().to_string()), loader).unwrap();
    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);

    let url = format!("file://{}", second.display());
    reverb.set_source(&mut ctx, &url).unwrap();
    assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);

    let conv = reverb.convolver().unwrap();
    assert_eq!(
        ctx.buffer(conv).unwrap().map(AudioBuffer::samples),
        Some(&[0.25, 0.125][..])
    );
}
