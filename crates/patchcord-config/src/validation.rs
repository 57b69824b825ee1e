//! Range checks for chain configurations.
//!
//! Effects accept any value they are given. Validation never rejects a
//! chain; it reports values outside each parameter's conventional range
//! (from the variant's [`ParamDescriptor`](patchcord_core::ParamDescriptor)s)
//! and delay presets that do not exist, so callers can decide what to do.
//!
//! # Example
//!
//! ```rust
//! use patchcord_config::{ChainConfig, validate_chain};
//! use patchcord_effects::FilterSettings;
//!
//! let chain = ChainConfig::new("Harsh").with_effect(FilterSettings {
//!     freq: Some(40000.0),
//!     ..Default::default()
//! });
//! let warnings = validate_chain(&chain);
//! assert_eq!(warnings.len(), 1);
//! ```

use std::fmt;

use patchcord_effects::{EffectKind, delay_preset, find_param};

use crate::chain_config::ChainConfig;
use crate::effect_config::EffectConfig;

/// A configuration value worth a second look.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// A numeric setting lies outside its conventional range (or is not
    /// finite).
    OutOfRange {
        /// Position of the effect in the chain.
        index: usize,
        /// Variant the setting belongs to.
        effect: EffectKind,
        /// Setting key.
        param: String,
        /// Supplied value.
        value: f32,
        /// Conventional minimum.
        min: f32,
        /// Conventional maximum.
        max: f32,
    },

    /// A delay names a preset that does not exist; building it will fail.
    UnknownPreset {
        /// Position of the effect in the chain.
        index: usize,
        /// Preset name as written.
        name: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                index,
                effect,
                param,
                value,
                min,
                max,
            } => write!(
                f,
                "effect #{index} ({effect}): '{param}' = {value} is outside [{min}, {max}]"
            ),
            Self::UnknownPreset { index, name } => {
                write!(f, "effect #{index} (delay): unknown preset '{name}'")
            }
        }
    }
}

/// Checks one effect configuration at chain position `index`.
pub fn validate_effect(index: usize, config: &EffectConfig) -> Vec<ValidationWarning> {
    let effect = config.kind();
    let params = effect.params();
    let mut warnings: Vec<ValidationWarning> = config
        .numeric_values()
        .into_iter()
        .filter_map(|(param, value)| {
            let desc = find_param(params, &param)?;
            (!(desc.min..=desc.max).contains(&value)).then_some(ValidationWarning::OutOfRange {
                index,
                effect,
                param,
                value,
                min: desc.min,
                max: desc.max,
            })
        })
        .collect();

    if let EffectConfig::Delay(settings) = config
        && let Some(name) = settings.preset.as_deref()
        && delay_preset(name).is_none()
    {
        warnings.push(ValidationWarning::UnknownPreset {
            index,
            name: name.to_owned(),
        });
    }

    warnings
}

/// Checks every effect of a chain.
pub fn validate_chain(config: &ChainConfig) -> Vec<ValidationWarning> {
    config
        .effects
        .iter()
        .enumerate()
        .flat_map(|(index, effect)| validate_effect(index, effect))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchcord_effects::{
        CompressorSettings, DelaySettings, DistortionSettings, EnvelopeSettings, FilterSettings,
    };

    #[test]
    fn test_defaults_are_clean() {
        for kind in EffectKind::ALL {
            assert!(validate_effect(0, &EffectConfig::new(kind)).is_empty(), "{kind}");
        }
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let config = EffectConfig::Distortion(DistortionSettings {
            drive: Some(1000.0),
            ..Default::default()
        });
        assert_eq!(
            validate_effect(3, &config),
            vec![ValidationWarning::OutOfRange {
                index: 3,
                effect: EffectKind::Distortion,
                param: "drive".into(),
                value: 1000.0,
                min: 0.0,
                max: 400.0,
            }]
        );
    }

    #[test]
    fn test_non_finite_is_reported() {
        let config = EffectConfig::EnvelopeFilter(EnvelopeSettings {
            sustain: Some(f32::NAN),
            ..Default::default()
        });
        let warnings = validate_effect(0, &config);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ValidationWarning::OutOfRange { param, .. } if param == "sustain"
        ));
    }

    #[test]
    fn test_keys_without_descriptor_are_ignored() {
        let config = EffectConfig::Delay(DelaySettings {
            max_delay_time: Some(60.0),
            ..Default::default()
        });
        assert!(validate_effect(0, &config).is_empty());
    }

    #[test]
    fn test_unknown_delay_preset() {
        let config = EffectConfig::Delay(DelaySettings {
            preset: Some("tapeEcho".into()),
            ..Default::default()
        });
        assert_eq!(
            validate_effect(1, &config),
            vec![ValidationWarning::UnknownPreset {
                index: 1,
                name: "tapeEcho".into(),
            }]
        );
    }

    #[test]
    fn test_chain_reports_positions() {
        let chain = ChainConfig::new("Loose")
            .with_effect(CompressorSettings {
                ratio: Some(0.0),
                ..Default::default()
            })
            .with_effect(FilterSettings::default())
            .with_effect(FilterSettings {
                gain: Some(-60.0),
                ..Default::default()
            });

        let warnings = validate_chain(&chain);
        let positions: Vec<usize> = warnings
            .iter()
            .map(|w| match w {
                ValidationWarning::OutOfRange { index, .. }
                | ValidationWarning::UnknownPreset { index, .. } => *index,
            })
            .collect();
        assert_eq!(positions, vec![0, 2]);
        assert!(warnings[1].to_string().contains("'gain' = -60"));
    }
}
