//! Patchcord Effects - composable effects on the patchcord host graph
//!
//! Each effect wraps one or more host nodes behind a single input/output
//! pair and keeps its configuration in a [`ParameterStore`]:
//!
//! - [`Compressor`] - Dynamics compressor node
//! - [`Filter`] - Single biquad filter
//! - [`Delay`] - Feedback delay with presets
//! - [`Distortion`] - Wave-shaping soft clipper
//! - [`EnvelopeFilter`] - ADSR gain envelope
//! - [`Reverb`] - Convolution reverb with async impulse-response loading
//! - [`Vco`] - Two detuned oscillators into a VCA
//!
//! All effects implement [`Effect`], so chains can hold `Box<dyn Effect>`.
//!
//! ## Example
//!
//! ```rust
//! use patchcord_core::AudioContext;
//! use patchcord_effects::{Delay, DelaySettings, Distortion, DistortionSettings, Effect};
//!
//! let mut ctx = AudioContext::new(48000.0);
//! let src = ctx.create_oscillator();
//! let mut dist = Distortion::new(&mut ctx, DistortionSettings::default()).unwrap();
//! let mut delay = Delay::new(&mut ctx, DelaySettings::from_preset("echos").unwrap()).unwrap();
//!
//! let dest = ctx.destination();
//! dist.set_input(&mut ctx, src).unwrap();
//! delay.set_input(&mut ctx, dist.main_node()).unwrap();
//! delay.set_output(&mut ctx, dest).unwrap();
//! ctx.start(src, 0.0).unwrap();
//!
//! let block = ctx.render(256);
//! assert_eq!(block.len(), 256);
//! ```

pub mod compressor;
pub mod delay;
pub mod distortion;
pub mod effect;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod loader;
pub mod node_graph;
pub mod reverb;
pub mod store;
pub mod vco;

// Re-export main types at crate root
pub use compressor::{Compressor, CompressorSettings};
pub use delay::{DELAY_PRESETS, Delay, DelayPreset, DelaySettings, delay_preset};
pub use distortion::{CURVE_SAMPLES, Distortion, DistortionSettings, make_distortion_curve};
pub use effect::{DEFAULT_FADE_SECS, Effect, EffectKind, FADE_FLOOR, UnknownEffect, fade_out, find_param};
pub use envelope::{EnvelopeFilter, EnvelopeSettings};
pub use error::EffectError;
pub use filter::{Filter, FilterSettings};
pub use loader::{ImpulseResponseLoader, LoadError, LoadStatus};
pub use node_graph::{Attachment, NodeGraph};
pub use reverb::{Reverb, ReverbSettings};
pub use store::ParameterStore;
pub use vco::{Vco, VcoSettings};
