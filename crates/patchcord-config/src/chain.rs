//! Effect chain assembly.
//!
//! [`EffectChain`] is the composition root: it turns a [`ChainConfig`] into
//! live effects inside an [`AudioContext`] and splices them in order.
//!
//! ```text
//! input ──► effect[0] ──► effect[1] ──► … ──► effect[n-1] ──► output
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use patchcord_config::{EffectChain, get_factory_preset};
//! use patchcord_core::{AudioBuffer, AudioContext};
//! use patchcord_effects::{ImpulseResponseLoader, LoadError};
//!
//! struct NoFiles;
//!
//! impl ImpulseResponseLoader for NoFiles {
//!     fn load(&self, source: &str) -> Result<AudioBuffer, LoadError> {
//!         Err(LoadError::NotFound(source.to_owned()))
//!     }
//! }
//!
//! let mut ctx = AudioContext::new(48000.0);
//! let config = get_factory_preset("crunch").unwrap();
//! let mut chain = EffectChain::build(&mut ctx, &config, Arc::new(NoFiles)).unwrap();
//!
//! let src = ctx.create_oscillator();
//! let dest = ctx.destination();
//! chain.connect_input(&mut ctx, src).unwrap();
//! chain.connect_output(&mut ctx, dest).unwrap();
//! ctx.start(src, 0.0).unwrap();
//! let block = ctx.render(128);
//! assert_eq!(block.len(), 128);
//! ```

use std::sync::Arc;

use patchcord_core::{AudioContext, NodeId};
use patchcord_effects::{Effect, EffectError, EffectKind, ImpulseResponseLoader};

use crate::chain_config::ChainConfig;
use crate::effect_config::EffectConfig;
use crate::error::ConfigError;
use crate::validation::validate_chain;

/// Effects built from a [`ChainConfig`], wired in series.
pub struct EffectChain {
    name: String,
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    /// Builds every effect of `config` in `ctx` and connects each main node
    /// to the next effect's input.
    ///
    /// Out-of-range values are logged as warnings and passed through
    /// unchanged. A sample rate differing from the context's is logged too;
    /// effect times are in seconds, so the chain still behaves the same.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Effect`] for the first effect that cannot be
    /// built or wired (for example a delay naming an unknown preset). The
    /// effects built before it are torn down first, so a failed build leaves
    /// no edges behind in `ctx`.
    pub fn build(
        ctx: &mut AudioContext,
        config: &ChainConfig,
        loader: Arc<dyn ImpulseResponseLoader>,
    ) -> Result<Self, ConfigError> {
        for warning in validate_chain(config) {
            tracing::warn!(chain = %config.name, %warning, "questionable chain setting");
        }
        if config.sample_rate as f32 != ctx.sample_rate() {
            tracing::warn!(
                chain = %config.name,
                designed = config.sample_rate,
                actual = ctx.sample_rate(),
                "chain sample rate differs from context"
            );
        }

        let mut effects: Vec<Box<dyn Effect>> = Vec::with_capacity(config.len());
        for (index, effect_config) in config.effects.iter().enumerate() {
            if let Err(e) = append(ctx, &mut effects, effect_config, &loader) {
                let error = ConfigError::effect(index, effect_config.kind(), e);
                release(ctx, &mut effects);
                return Err(error);
            }
        }

        tracing::debug!(chain = %config.name, effects = effects.len(), "chain built");
        Ok(Self {
            name: config.name.clone(),
            effects,
        })
    }

    /// Returns the chain's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Patches `source` into the first effect.
    pub fn connect_input(&mut self, ctx: &mut AudioContext, source: NodeId) -> Result<(), ConfigError> {
        let effect = self.effects.first_mut().ok_or(ConfigError::EmptyChain)?;
        let kind = effect.kind();
        effect
            .set_input(ctx, source)
            .map_err(|e| ConfigError::effect(0, kind, e))?;
        Ok(())
    }

    /// Patches the last effect into `sink`.
    pub fn connect_output(&mut self, ctx: &mut AudioContext, sink: NodeId) -> Result<(), ConfigError> {
        let index = self.effects.len().checked_sub(1).ok_or(ConfigError::EmptyChain)?;
        let effect = &mut self.effects[index];
        let kind = effect.kind();
        effect
            .set_output(ctx, sink)
            .map_err(|e| ConfigError::effect(index, kind, e))?;
        Ok(())
    }

    /// Node feeding the chain, if any.
    pub fn entry_node(&self) -> Option<NodeId> {
        self.effects.first().map(|e| e.entry_node())
    }

    /// Node the chain's signal leaves from, if any.
    pub fn output_node(&self) -> Option<NodeId> {
        self.effects.last().map(|e| e.main_node())
    }

    /// Applies finished background work (impulse-response loads) on every
    /// effect.
    pub fn poll(&mut self, ctx: &mut AudioContext) -> Result<(), ConfigError> {
        for (index, effect) in self.effects.iter_mut().enumerate() {
            let kind = effect.kind();
            effect.poll(ctx).map_err(|e| ConfigError::effect(index, kind, e))?;
        }
        Ok(())
    }

    /// Starts every source node inside the chain's effects (the VCO's
    /// oscillators) at `when` seconds and returns how many were started.
    pub fn start(&self, ctx: &mut AudioContext, when: f64) -> Result<usize, ConfigError> {
        let mut started = 0;
        for (index, effect) in self.effects.iter().enumerate() {
            for (_, node) in effect.graph().nodes() {
                if ctx.kind(node).is_some_and(|k| k.is_source()) {
                    ctx.start(node, when)
                        .map_err(|e| ConfigError::effect(index, effect.kind(), e.into()))?;
                    started += 1;
                }
            }
        }
        Ok(started)
    }

    /// Sets a numeric parameter on the effect at `index`.
    pub fn set_param(
        &mut self,
        ctx: &mut AudioContext,
        index: usize,
        name: &str,
        value: f32,
    ) -> Result<bool, ConfigError> {
        let Some(effect) = self.effects.get_mut(index) else {
            return Ok(false);
        };
        let kind = effect.kind();
        effect
            .set_param(ctx, name, value)
            .map_err(|e| ConfigError::effect(index, kind, e))?;
        Ok(true)
    }

    /// Disconnects every effect, including the chain's input edge.
    pub fn teardown(&mut self, ctx: &mut AudioContext) -> Result<(), ConfigError> {
        for (index, effect) in self.effects.iter_mut().enumerate() {
            let kind = effect.kind();
            effect.teardown(ctx).map_err(|e| ConfigError::effect(index, kind, e))?;
        }
        tracing::debug!(chain = %self.name, "chain torn down");
        Ok(())
    }

    /// Number of effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether the chain has no effects.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effect at `index`.
    pub fn get(&self, index: usize) -> Option<&dyn Effect> {
        self.effects.get(index).map(|e| e.as_ref())
    }

    /// Effect at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Effect + 'static)> {
        self.effects.get_mut(index).map(|e| e.as_mut())
    }

    /// Variants in signal order.
    pub fn kinds(&self) -> Vec<EffectKind> {
        self.effects.iter().map(|e| e.kind()).collect()
    }

    /// Position of the first effect of `kind`.
    pub fn position(&self, kind: EffectKind) -> Option<usize> {
        self.effects.iter().position(|e| e.kind() == kind)
    }
}

/// Builds one effect and wires the previous effect into it. The effect is
/// pushed even when wiring fails so that [`release`] reaches it.
fn append(
    ctx: &mut AudioContext,
    effects: &mut Vec<Box<dyn Effect>>,
    config: &EffectConfig,
    loader: &Arc<dyn ImpulseResponseLoader>,
) -> Result<(), EffectError> {
    let mut effect = config.build(ctx, loader)?;
    let wired = match effects.last().map(|prev| prev.main_node()) {
        Some(upstream) => effect.set_input(ctx, upstream).map(|_| ()),
        None => Ok(()),
    };
    effects.push(effect);
    wired
}

/// Tears down a partially built chain, last effect first.
fn release(ctx: &mut AudioContext, effects: &mut Vec<Box<dyn Effect>>) {
    while let Some(mut effect) = effects.pop() {
        if let Err(e) = effect.teardown(ctx) {
            tracing::warn!(effect = %effect.kind(), error = %e, "teardown of partial chain failed");
        }
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("name", &self.name)
            .field("effects", &self.kinds())
            .finish()
    }
}
