//! Buffer playback and constant sources.

use crate::buffer::AudioBuffer;
use crate::oscillator::Playback;

/// Plays an [`AudioBuffer`] once or looped after it is started.
///
/// The buffer is read at its own sample index without resampling; callers
/// resample to the context rate beforehand.
#[derive(Debug, Clone, Default)]
pub struct BufferSource {
    buffer: Option<AudioBuffer>,
    looping: bool,
    position: usize,
    playback: Playback,
}

impl BufferSource {
    /// Creates a source for `buffer`.
    pub fn new(buffer: Option<AudioBuffer>) -> Self {
        Self {
            buffer,
            ..Self::default()
        }
    }

    /// Returns the buffer, if any.
    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }

    /// Replaces the buffer and rewinds.
    pub fn set_buffer(&mut self, buffer: AudioBuffer) {
        self.buffer = Some(buffer);
        self.position = 0;
    }

    /// Returns `true` if playback wraps at the end of the buffer.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Enables or disables looping.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Returns the start/stop window.
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub(crate) fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    /// Renders one sample at `time`.
    #[inline]
    pub fn process(&mut self, time: f64) -> f32 {
        if !self.playback.is_playing(time) {
            return 0.0;
        }
        let Some(buffer) = &self.buffer else {
            return 0.0;
        };
        let samples = buffer.samples();
        if samples.is_empty() {
            return 0.0;
        }
        if self.position >= samples.len() {
            if !self.looping {
                return 0.0;
            }
            self.position = 0;
        }
        let out = samples[self.position];
        self.position += 1;
        out
    }
}

/// Emits its `offset` parameter while playing.
#[derive(Debug, Clone, Default)]
pub struct ConstantSource {
    playback: Playback,
}

impl ConstantSource {
    /// Creates an unstarted constant source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the start/stop window.
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub(crate) fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    /// Renders one sample at `time`.
    #[inline]
    pub fn process(&self, offset: f32, time: f64) -> f32 {
        if self.playback.is_playing(time) {
            offset
        } else {
            0.0
        }
    }
}
