//! Impulse-response loading.
//!
//! Fetching and decoding happen behind [`ImpulseResponseLoader`], which runs
//! on a worker thread. Results come back over a channel tagged with the
//! generation of the request that produced them; the owner of the
//! [`AudioContext`](patchcord_core::AudioContext) drains the channel and
//! applies only results whose generation is still current, so the last
//! requested source always wins.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use patchcord_core::AudioBuffer;
use thiserror::Error;

/// Fetches and decodes an impulse response.
///
/// Implementations block; they are always invoked off the thread that owns
/// the audio context.
pub trait ImpulseResponseLoader: Send + Sync {
    /// Loads the response identified by `source` (a path or URL).
    fn load(&self, source: &str) -> Result<AudioBuffer, LoadError>;
}

/// Errors surfaced by an [`ImpulseResponseLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Nothing exists at the source.
    #[error("impulse response not found: {0}")]
    NotFound(String),

    /// The loader cannot handle this kind of source.
    #[error("unsupported impulse response source: {0}")]
    Unsupported(String),

    /// The source exists but could not be decoded.
    #[error("failed to decode '{location}': {message}")]
    Decode {
        /// Source that failed.
        location: String,
        /// Decoder message.
        message: String,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn loader thread: {0}")]
    Spawn(String),
}

/// Where an effect's impulse response stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// No source requested.
    #[default]
    Idle,
    /// A load is in flight; the convolver is silent until it lands.
    Pending,
    /// The response for the current source is installed.
    Ready,
    /// The current source failed to load.
    Failed,
}

/// Result of one load request.
#[derive(Debug)]
pub(crate) struct LoadOutcome {
    pub(crate) generation: u64,
    pub(crate) source: String,
    pub(crate) result: Result<AudioBuffer, LoadError>,
}

/// Issues load requests and collects their outcomes.
#[derive(Debug)]
pub(crate) struct LoadQueue {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    generation: u64,
}

impl LoadQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx, generation: 0 }
    }

    /// Starts loading `source` on a worker thread and returns the request's
    /// generation. Earlier requests become stale.
    pub(crate) fn request(
        &mut self,
        loader: &Arc<dyn ImpulseResponseLoader>,
        source: &str,
    ) -> Result<u64, LoadError> {
        self.generation += 1;
        let generation = self.generation;
        let loader = Arc::clone(loader);
        let tx = self.tx.clone();
        let source = source.to_owned();

        thread::Builder::new()
            .name(format!("patchcord-ir-{generation}"))
            .spawn(move || {
                let result = loader.load(&source);
                // the receiver is gone once the effect is dropped
                let _ = tx.send(LoadOutcome {
                    generation,
                    source,
                    result,
                });
            })
            .map_err(|e| LoadError::Spawn(e.to_string()))?;

        Ok(generation)
    }

    /// Makes every in-flight request stale.
    pub(crate) fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub(crate) fn try_next(&self) -> Option<LoadOutcome> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn next_timeout(&self, timeout: Duration) -> Option<LoadOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}
