//! Factory chain presets bundled with the library.
//!
//! These are embedded at compile time and always available without
//! external files. They double as worked examples of the chain format.

use crate::chain_config::ChainConfig;
use crate::error::ConfigError;

/// Names of the factory presets, in display order.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "init",
    "crunch",
    "dub_echo",
    "ping_pong",
    "metal_tail",
    "synth_pad",
    "room",
];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", INIT_PRESET),
    ("crunch", CRUNCH_PRESET),
    ("dub_echo", DUB_ECHO_PRESET),
    ("ping_pong", PING_PONG_PRESET),
    ("metal_tail", METAL_TAIL_PRESET),
    ("synth_pad", SYNTH_PAD_PRESET),
    ("room", ROOM_PRESET),
];

/// Initialization preset - a wide-open filter.
const INIT_PRESET: &str = r#"
name = "Init"
description = "Neutral starting point: one wide-open lowpass"
sample_rate = 48000

[[effects]]
effect = "filter"
type = "lowpass"
freq = 20000
gain = 0
"#;

/// Crunch preset - compressed overdrive.
const CRUNCH_PRESET: &str = r#"
name = "Crunch"
description = "Squeezed, oversampled overdrive with the fizz filtered off"
sample_rate = 48000

[[effects]]
effect = "compressor"
threshold = -18.0
knee = 6.0
ratio = 4.0
attack = 0.01
release = 0.2

[[effects]]
effect = "distortion"
level = 0.7
drive = 120
oversample = "2x"

[[effects]]
effect = "filter"
type = "lowpass"
freq = 4500
q = 0.7
"#;

/// Dub echo preset - band-limited feedback delay.
const DUB_ECHO_PRESET: &str = r#"
name = "Dub Echo"
description = "Telephone-band repeats that pile up"
sample_rate = 48000

[[effects]]
effect = "filter"
type = "bandpass"
freq = 900
q = 1.5

[[effects]]
effect = "delay"
level = 0.6
preset = "echos"
"#;

/// Ping-pong preset - short slap.
const PING_PONG_PRESET: &str = r#"
name = "Ping Pong"
description = "Short, bright slapback"
sample_rate = 48000

[[effects]]
effect = "delay"
preset = "pingPong"
"#;

/// Metal tail preset - heavy drive into a ringing delay.
const METAL_TAIL_PRESET: &str = r#"
name = "Metal Tail"
description = "Hard clipping into a near-self-oscillating comb"
sample_rate = 48000

[[effects]]
effect = "distortion"
drive = 300
oversample = "4x"

[[effects]]
effect = "delay"
preset = "metalTail"
"#;

/// Synth pad preset - detuned voice through a resonant filter and swell.
const SYNTH_PAD_PRESET: &str = r#"
name = "Synth Pad"
description = "Two saws a fifth apart, resonant lowpass, slow swell"
sample_rate = 48000

[[effects]]
effect = "vco"
level = 0.3
freq = 220
semitones = 7
waveform = "sawtooth"

[[effects]]
effect = "filter"
type = "lowpass"
freq = 1200
q = 4.0

[[effects]]
effect = "envelope_filter"
level = 0.8
multiplier = 1.0
attack = 0.5
decay = 0.4
sustain = 0.6
release = 1.5
"#;

/// Room preset - convolution with a mostly-dry mix.
const ROOM_PRESET: &str = r#"
name = "Room"
description = "Small room impulse response blended under the dry signal"
sample_rate = 48000

[[effects]]
effect = "reverb"
src = "impulses/room.wav"
time = 1.5
wet = 0.4
dry = 0.8
level = 1.0
"#;

/// Returns the factory preset with `name`, if there is one.
///
/// Name matching is case-insensitive.
pub fn get_factory_preset(name: &str) -> Option<ChainConfig> {
    let toml = FACTORY_PRESETS_TOML
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
        .map(|(_, toml)| *toml)?;
    match ChainConfig::from_toml_str(toml) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(preset = name, error = %e, "factory preset failed to parse");
            None
        }
    }
}

/// Like [`get_factory_preset`], but an unknown name is an error.
pub fn require_factory_preset(name: &str) -> Result<ChainConfig, ConfigError> {
    get_factory_preset(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_owned()))
}

/// Returns every factory preset.
pub fn factory_presets() -> Vec<ChainConfig> {
    FACTORY_PRESET_NAMES
        .iter()
        .filter_map(|name| get_factory_preset(name))
        .collect()
}

/// Whether `name` is a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESET_NAMES
        .iter()
        .any(|preset| preset.eq_ignore_ascii_case(name))
}
