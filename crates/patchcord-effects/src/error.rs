//! Error types for effect operations.

use patchcord_core::{AutomationError, GraphError};
use thiserror::Error;

use crate::effect::EffectKind;
use crate::loader::LoadError;

/// Errors that can occur while building or driving an effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    /// The host graph refused an operation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The setting name was not part of the effect's configuration.
    #[error("setting not found: {0}")]
    UnknownSetting(String),

    /// The effect exposes no numeric parameter with that name.
    #[error("{effect} has no parameter named '{name}'")]
    UnknownParam {
        /// Effect that was addressed.
        effect: EffectKind,
        /// Parameter requested.
        name: String,
    },

    /// No delay preset has that name.
    #[error("unknown delay preset: {0}")]
    UnknownPreset(String),

    /// An impulse response could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<AutomationError> for EffectError {
    fn from(err: AutomationError) -> Self {
        Self::Graph(GraphError::Automation(err))
    }
}
