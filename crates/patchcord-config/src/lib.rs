//! Chain configuration for patchcord effects.
//!
//! This crate turns TOML files into running effect chains.
//!
//! # Features
//!
//! - **Chain files**: [`ChainConfig`] loads and saves `[[effects]]` lists,
//!   each tagged by `effect` and carrying that variant's settings
//! - **Validation**: [`validate_chain`] reports values outside each
//!   parameter's conventional range without rejecting them
//! - **Factory presets**: chains bundled with the library
//! - **Assembly**: [`EffectChain::build`] constructs every effect in an
//!   [`AudioContext`](patchcord_core::AudioContext) and wires them in series
//!
//! # Example
//!
//! ```rust
//! use patchcord_config::ChainConfig;
//! use patchcord_effects::EffectKind;
//!
//! let config = ChainConfig::from_toml_str(r#"
//!     name = "Slap"
//!
//!     [[effects]]
//!     effect = "distortion"
//!     drive = 80
//!
//!     [[effects]]
//!     effect = "delay"
//!     preset = "pingPong"
//! "#).unwrap();
//!
//! assert_eq!(config.sample_rate, 48000);
//! assert_eq!(config.effects[1].kind(), EffectKind::Delay);
//! ```

mod chain;
mod chain_config;
mod effect_config;
mod error;

/// Range checks for chain configurations.
pub mod validation;

/// Factory chain presets bundled with the library.
pub mod factory_presets;

// Re-export main types at crate root
pub use chain::EffectChain;
pub use chain_config::ChainConfig;
pub use effect_config::EffectConfig;
pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset,
    require_factory_preset,
};
pub use validation::{ValidationWarning, validate_chain, validate_effect};
