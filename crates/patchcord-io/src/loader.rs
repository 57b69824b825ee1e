//! File-backed impulse-response loading.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use patchcord_core::AudioBuffer;
use patchcord_effects::{ImpulseResponseLoader, LoadError};

use crate::Error;
use crate::wav::read_buffer;

/// Loads impulse responses from WAV files on disk.
///
/// Sources are plain paths or `file://` URLs. Relative paths resolve
/// against the root directory when one is set, otherwise against the
/// process working directory. Other URL schemes are rejected with
/// [`LoadError::Unsupported`].
#[derive(Debug, Clone, Default)]
pub struct WavFileLoader {
    root: Option<PathBuf>,
}

impl WavFileLoader {
    /// Loader resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader resolving relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Returns the root directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Maps a source string to a filesystem path.
    pub fn resolve(&self, source: &str) -> Result<PathBuf, LoadError> {
        let path = match source.strip_prefix("file://") {
            Some(rest) => rest,
            None if source.contains("://") => {
                return Err(LoadError::Unsupported(source.to_owned()));
            }
            None => source,
        };
        if path.is_empty() {
            return Err(LoadError::NotFound(source.to_owned()));
        }

        let path = Path::new(path);
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl ImpulseResponseLoader for WavFileLoader {
    fn load(&self, source: &str) -> Result<AudioBuffer, LoadError> {
        let path = self.resolve(source)?;
        tracing::debug!(source, path = %path.display(), "loading impulse response");

        read_buffer(&path).map_err(|e| match e {
            Error::Io(ref io) if io.kind() == ErrorKind::NotFound => {
                LoadError::NotFound(source.to_owned())
            }
            other => LoadError::Decode {
                location: source.to_owned(),
                message: other.to_string(),
            },
        })
    }
}
