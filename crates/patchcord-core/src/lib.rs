//! Patchcord Core - host audio graph for patchcord effects
//!
//! This crate is the runtime effects are built on: an explicitly owned
//! [`AudioContext`] holding primitive processing nodes, the connections
//! between them, and a sample clock that drives parameter automation.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`AudioContext`] - Node arena, connection rules, offline renderer
//! - [`NodeId`] / [`EdgeId`] - Stable handles into the context
//! - [`GraphError`] - Everything a graph mutation can refuse
//!
//! ## Parameters
//!
//! - [`AudioParam`] - Intrinsic value plus an automation timeline
//! - [`ParamName`] - The automatable controls nodes expose
//! - [`ParamDescriptor`] - Conventional ranges of effect parameters
//!
//! ## Primitives
//!
//! - [`Biquad`] / [`FilterType`] - RBJ cookbook filters
//! - [`DelayLine`] - Interpolated circular buffer
//! - [`Convolver`] - partitioned FFT convolution with an [`AudioBuffer`]
//! - [`WaveShaper`] / [`OverSample`] - Curve distortion
//! - [`Oscillator`] / [`Waveform`] - Periodic sources
//! - [`DynamicsCompressor`] - Soft-knee compressor
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`transpose`], etc.
//!
//! # Features
//!
//! - `tracing` - debug-level logs of graph mutations
//!
//! # Example
//!
//! ```rust
//! use patchcord_core::{AudioContext, FilterType, ParamName};
//!
//! let mut ctx = AudioContext::new(48000.0);
//! let osc = ctx.create_oscillator();
//! let filter = ctx.create_biquad_filter();
//! ctx.set_filter_type(filter, FilterType::Highpass).unwrap();
//! ctx.set_param_value(filter, ParamName::Frequency, 1000.0).unwrap();
//!
//! ctx.connect(osc, filter).unwrap();
//! ctx.connect(filter, ctx.destination()).unwrap();
//! ctx.start(osc, 0.0).unwrap();
//!
//! let block = ctx.render(128);
//! assert_eq!(block.len(), 128);
//! ```

pub mod biquad;
pub mod buffer;
pub mod compressor;
pub mod convolver;
pub mod delay;
pub mod graph;
pub mod math;
pub mod oscillator;
pub mod param;
pub mod param_info;
pub mod shaper;
pub mod source;

// Re-export main types at crate root
pub use biquad::{Biquad, Coefficients, FilterType, UnknownFilterType};
pub use buffer::AudioBuffer;
pub use compressor::{CompressorControls, DynamicsCompressor};
pub use convolver::Convolver;
pub use delay::DelayLine;
pub use graph::{AudioContext, EdgeId, GraphError, MAX_DELAY_SECS, NodeId, NodeKind};
pub use math::{cents_to_ratio, db_to_linear, flush_denormal, linear_to_db, midi_to_freq, transpose};
pub use oscillator::{Oscillator, Playback, UnknownWaveform, Waveform};
pub use param::{AudioParam, AutomationError, AutomationEvent, ParamName};
pub use param_info::{ParamDescriptor, ParamUnit};
pub use shaper::{OverSample, UnknownOverSample, WaveShaper};
pub use source::{BufferSource, ConstantSource};
