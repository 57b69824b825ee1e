//! Typed per-effect configuration.

use std::sync::Arc;

use patchcord_core::AudioContext;
use patchcord_effects::{
    Compressor, CompressorSettings, Delay, DelaySettings, Distortion, DistortionSettings, Effect,
    EffectError, EffectKind, EnvelopeFilter, EnvelopeSettings, Filter, FilterSettings,
    ImpulseResponseLoader, Reverb, ReverbSettings, Vco, VcoSettings,
};
use serde::{Deserialize, Serialize};

/// Configuration for one effect in a chain.
///
/// Tagged by the `effect` key in TOML; the remaining keys are the variant's
/// settings, each optional.
///
/// ```toml
/// [[effects]]
/// effect = "filter"
/// type = "lowpass"
/// freq = 1200
/// q = 4.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectConfig {
    /// Dynamics compressor.
    Compressor(CompressorSettings),
    /// Single biquad filter.
    Filter(FilterSettings),
    /// Feedback delay.
    Delay(DelaySettings),
    /// Wave-shaping distortion.
    Distortion(DistortionSettings),
    /// ADSR gain envelope.
    EnvelopeFilter(EnvelopeSettings),
    /// Convolution reverb.
    Reverb(ReverbSettings),
    /// Two-oscillator voice.
    Vco(VcoSettings),
}

impl EffectConfig {
    /// Configuration of `kind` with every field left at its default.
    pub fn new(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Compressor => Self::Compressor(CompressorSettings::default()),
            EffectKind::Filter => Self::Filter(FilterSettings::default()),
            EffectKind::Delay => Self::Delay(DelaySettings::default()),
            EffectKind::Distortion => Self::Distortion(DistortionSettings::default()),
            EffectKind::EnvelopeFilter => Self::EnvelopeFilter(EnvelopeSettings::default()),
            EffectKind::Reverb => Self::Reverb(ReverbSettings::default()),
            EffectKind::Vco => Self::Vco(VcoSettings::default()),
        }
    }

    /// Returns which variant this configures.
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Compressor(_) => EffectKind::Compressor,
            Self::Filter(_) => EffectKind::Filter,
            Self::Delay(_) => EffectKind::Delay,
            Self::Distortion(_) => EffectKind::Distortion,
            Self::EnvelopeFilter(_) => EffectKind::EnvelopeFilter,
            Self::Reverb(_) => EffectKind::Reverb,
            Self::Vco(_) => EffectKind::Vco,
        }
    }

    /// Constructs the effect in `ctx`.
    ///
    /// Only the reverb uses `loader`.
    pub fn build(
        &self,
        ctx: &mut AudioContext,
        loader: &Arc<dyn ImpulseResponseLoader>,
    ) -> Result<Box<dyn Effect>, EffectError> {
        Ok(match self {
            Self::Compressor(s) => Box::new(Compressor::new(ctx, s.clone())?),
            Self::Filter(s) => Box::new(Filter::new(ctx, s.clone())?),
            Self::Delay(s) => Box::new(Delay::new(ctx, s.clone())?),
            Self::Distortion(s) => Box::new(Distortion::new(ctx, s.clone())?),
            Self::EnvelopeFilter(s) => Box::new(EnvelopeFilter::new(ctx, s.clone())?),
            Self::Reverb(s) => Box::new(Reverb::new(ctx, s.clone(), Arc::clone(loader))?),
            Self::Vco(s) => Box::new(Vco::new(ctx, s.clone())?),
        })
    }

    /// Returns the numeric settings that were supplied, keyed as in TOML.
    pub fn numeric_values(&self) -> Vec<(String, f32)> {
        let Ok(toml::Value::Table(table)) = toml::Value::try_from(self) else {
            return Vec::new();
        };
        table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::Float(f) => Some((key, f as f32)),
                toml::Value::Integer(i) => Some((key, i as f32)),
                _ => None,
            })
            .collect()
    }
}

impl From<CompressorSettings> for EffectConfig {
    fn from(settings: CompressorSettings) -> Self {
        Self::Compressor(settings)
    }
}

impl From<FilterSettings> for EffectConfig {
    fn from(settings: FilterSettings) -> Self {
        Self::Filter(settings)
    }
}

impl From<DelaySettings> for EffectConfig {
    fn from(settings: DelaySettings) -> Self {
        Self::Delay(settings)
    }
}

impl From<DistortionSettings> for EffectConfig {
    fn from(settings: DistortionSettings) -> Self {
        Self::Distortion(settings)
    }
}

impl From<EnvelopeSettings> for EffectConfig {
    fn from(settings: EnvelopeSettings) -> Self {
        Self::EnvelopeFilter(settings)
    }
}

impl From<ReverbSettings> for EffectConfig {
    fn from(settings: ReverbSettings) -> Self {
        Self::Reverb(settings)
    }
}

impl From<VcoSettings> for EffectConfig {
    fn from(settings: VcoSettings) -> Self {
        Self::Vco(settings)
    }
}
