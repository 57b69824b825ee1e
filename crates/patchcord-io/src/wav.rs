//! WAV decoding into [`AudioBuffer`]s.
//!
//! Impulse responses arrive in whatever shape they were recorded: float or
//! integer PCM, mono or multi-channel. Everything is folded to mono `f32`
//! at the file's own sample rate; resampling to the context rate is the
//! reverb's job.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};
use patchcord_core::AudioBuffer;

use crate::{Error, Result};

/// Reads a WAV file into a mono [`AudioBuffer`] at the file's sample rate.
///
/// Channels are averaged. Integer samples are scaled to `[-1, 1)`.
pub fn read_buffer<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    // through `File` so a missing file is `Error::Io`, not a hound error
    let file = File::open(path.as_ref())?;
    let reader = WavReader::new(BufReader::new(file))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(Error::UnsupportedFormat(format!("{bits}-bit samples")));
            }
            let full_scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<Vec<f32>, _>>()?
        }
    };

    let samples = mix_to_mono(interleaved, spec.channels.max(1) as usize);
    Ok(AudioBuffer::new(samples, spec.sample_rate as f32))
}

fn mix_to_mono(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved;
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Writes `buffer` as a mono 32-bit float WAV file.
pub fn write_buffer<P: AsRef<Path>>(path: P, buffer: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate().round() as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_raw<S: hound::Sample + Copy>(path: &Path, spec: hound::WavSpec, samples: &[S]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_buffer_roundtrip_keeps_rate() {
        let buffer = AudioBuffer::new(vec![1.0, 0.5, 0.25, 0.0], 22050.0);
        let file = NamedTempFile::new().unwrap();
        write_buffer(file.path(), &buffer).unwrap();

        assert_eq!(read_buffer(file.path()).unwrap(), buffer);
    }

    #[test]
    fn test_int_pcm_is_scaled() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_raw(file.path(), spec, &[16384i16, -32768, 0]);

        let loaded = read_buffer(file.path()).unwrap();
        assert_eq!(loaded.sample_rate(), 44100.0);
        assert_eq!(loaded.samples(), &[0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_stereo_is_mixed_to_mono() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_raw(file.path(), spec, &[1.0f32, 0.0, 0.5, 0.5, -1.0, 1.0]);

        assert_eq!(read_buffer(file.path()).unwrap().samples(), &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_buffer(dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_garbage_is_wav_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not a riff header").unwrap();
        assert!(matches!(read_buffer(file.path()), Err(Error::Wav(_))));
    }
}
