//! Audio file I/O for patchcord.
//!
//! This crate provides:
//!
//! - **WAV decoding**: [`read_buffer`] folds any float or integer WAV file
//!   into a mono [`AudioBuffer`]; [`write_buffer`] stores one as 32-bit float
//! - **Impulse-response loading**: [`WavFileLoader`], a file-backed
//!   [`ImpulseResponseLoader`] for the reverb
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use patchcord_core::AudioContext;
//! use patchcord_effects::{Reverb, ReverbSettings};
//! use patchcord_io::WavFileLoader;
//!
//! let mut ctx = AudioContext::new(48000.0);
//! let loader = Arc::new(WavFileLoader::with_root("impulses"));
//! let mut reverb = Reverb::new(&mut ctx, ReverbSettings {
//!     src: Some("hall.wav".into()),
//!     ..Default::default()
//! }, loader).unwrap();
//! reverb.wait(&mut ctx, Duration::from_secs(1)).unwrap();
//! ```
//!
//! [`AudioBuffer`]: patchcord_core::AudioBuffer
//! [`ImpulseResponseLoader`]: patchcord_effects::ImpulseResponseLoader

mod loader;
mod wav;

pub use loader::WavFileLoader;
pub use wav::{read_buffer, write_buffer};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
