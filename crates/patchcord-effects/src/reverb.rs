//! Convolution reverb with asynchronously loaded impulse responses.
//!
//! ```text
//!                  ┌──► convolver ──► wet ──┐
//! input ──► pre ───┤                        ├──► main ──► output
//!                  └──────────► dry ────────┘
//! ```
//!
//! ## Design Decisions
//!
//! - **Readiness window**: until a response has loaded, the convolver holds
//!   no buffer and outputs silence. Signal that arrives during the window is
//!   dropped on the wet path, never buffered; only the dry path is heard.
//!
//! - **Last write wins**: every request carries a generation token; results
//!   from superseded requests are discarded when polled.
//!
//! - **Fresh convolver per response**: a convolver accepts one buffer in its
//!   lifetime. Installing a second response builds a new convolver, wires it
//!   in place of the old one and removes the old one.
//!
//! - **Failure goes dry**: when the current source fails to load, any
//!   response from an earlier source is dropped and the wet path falls
//!   silent.
//!
//! - **Teardown is final**: after [`teardown`](Effect::teardown) no setter
//!   rewires the internal nodes and no new load is started.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use patchcord_core::{AudioBuffer, AudioContext, NodeId, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::loader::{ImpulseResponseLoader, LoadError, LoadOutcome, LoadQueue, LoadStatus};
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Configuration for [`Reverb`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    /// Output level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Seconds of the response to keep; 0 keeps all of it (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f32>,
    /// Path or URL of the impulse response; empty loads nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Gain of the convolved path (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f32>,
    /// Gain of the unprocessed path (default 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry: Option<f32>,
}

/// Convolution reverb.
///
/// The effect never touches the loader on the caller's thread: loads run on
/// a worker and are applied by [`poll()`](Effect::poll) or
/// [`wait()`](Self::wait).
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `time` | 0–10 s | 0.5 |
/// | `wet` | 0–1 | 1.0 |
/// | `dry` | 0–1 | 0.0 |
pub struct Reverb {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    time: f32,
    wet: f32,
    dry: f32,
    source: String,
    loader: Arc<dyn ImpulseResponseLoader>,
    queue: LoadQueue,
    status: LoadStatus,
    last_error: Option<LoadError>,
    response: Option<AudioBuffer>,
    torn_down: bool,
}

impl fmt::Debug for Reverb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reverb")
            .field("graph", &self.graph)
            .field("level", &self.level)
            .field("time", &self.time)
            .field("wet", &self.wet)
            .field("dry", &self.dry)
            .field("source", &self.source)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Reverb {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::time_secs("Time", "time", 0.0, 10.0, 0.5),
        ParamDescriptor::new("Wet", "wet", ParamUnit::None, 0.0, 1.0, 1.0).with_step(0.01),
        ParamDescriptor::new("Dry", "dry", ParamUnit::None, 0.0, 1.0, 0.0).with_step(0.01),
    ];

    /// Builds the reverb and, if `settings.src` is non-empty, starts loading
    /// its impulse response.
    ///
    /// A load that cannot even be started leaves the reverb in
    /// [`LoadStatus::Failed`] rather than failing construction.
    pub fn new(
        ctx: &mut AudioContext,
        settings: ReverbSettings,
        loader: Arc<dyn ImpulseResponseLoader>,
    ) -> Result<Self, EffectError> {
        let level = settings.level.unwrap_or(0.5);
        let wet = settings.wet.unwrap_or(1.0);
        let dry = settings.dry.unwrap_or(0.0);

        let pre = ctx.create_gain(1.0)?;
        let convolver = ctx.create_convolver();
        let wet_gain = ctx.create_gain(wet)?;
        let dry_gain = ctx.create_gain(dry)?;
        let main = ctx.create_gain(level)?;
        ctx.connect(pre, convolver)?;
        ctx.connect(convolver, wet_gain)?;
        ctx.connect(wet_gain, main)?;
        ctx.connect(pre, dry_gain)?;
        ctx.connect(dry_gain, main)?;

        let mut reverb = Self {
            graph: NodeGraph::new(main, pre)
                .with_node("pre", pre)
                .with_node("convolver", convolver)
                .with_node("wet", wet_gain)
                .with_node("dry", dry_gain),
            settings: ParameterStore::from_settings(&settings),
            level,
            time: settings.time.unwrap_or(0.5),
            wet,
            dry,
            source: String::new(),
            loader,
            queue: LoadQueue::new(),
            status: LoadStatus::Idle,
            last_error: None,
            response: None,
            torn_down: false,
        };
        reverb.request(settings.src.as_deref().unwrap_or_default());
        tracing::debug!(source = %reverb.source, "reverb created");
        Ok(reverb)
    }

    /// Returns the convolver currently wired in.
    pub fn convolver(&self) -> Option<NodeId> {
        self.graph.node("convolver")
    }

    /// Returns the requested impulse-response source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns where the current source's load stands.
    pub fn load_status(&self) -> LoadStatus {
        self.status
    }

    /// Returns why the current source failed to load.
    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    /// Switches to a new impulse response.
    ///
    /// The response installed so far keeps playing until the new one lands;
    /// if the new one fails, the wet path falls silent. An empty source
    /// cancels pending loads and silences the wet path.
    pub fn set_source(&mut self, ctx: &mut AudioContext, src: &str) -> Result<(), EffectError> {
        if src.is_empty() {
            self.queue.invalidate();
            self.source.clear();
            self.status = LoadStatus::Idle;
            self.last_error = None;
            self.drop_response(ctx)?;
        } else {
            self.request(src);
            if self.status == LoadStatus::Failed {
                self.drop_response(ctx)?;
            }
        }
        self.settings.record("src", src);
        Ok(())
    }

    fn request(&mut self, src: &str) {
        self.source = src.to_owned();
        self.last_error = None;
        if src.is_empty() || self.torn_down {
            self.status = LoadStatus::Idle;
            return;
        }

        match self.queue.request(&self.loader, src) {
            Ok(generation) => {
                tracing::debug!(source = src, generation, "impulse response requested");
                self.status = LoadStatus::Pending;
            }
            Err(e) => {
                tracing::warn!(source = src, error = %e, "impulse response load not started");
                self.status = LoadStatus::Failed;
                self.last_error = Some(e);
            }
        }
    }

    /// Blocks until the pending load lands or `timeout` elapses, then
    /// returns the load status.
    pub fn wait(&mut self, ctx: &mut AudioContext, timeout: Duration) -> Result<LoadStatus, EffectError> {
        let deadline = Instant::now() + timeout;
        while self.status == LoadStatus::Pending {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.queue.next_timeout(remaining) {
                Some(outcome) => self.apply(ctx, outcome)?,
                None => break,
            }
        }
        Ok(self.status)
    }

    fn apply(&mut self, ctx: &mut AudioContext, outcome: LoadOutcome) -> Result<(), EffectError> {
        if !self.queue.is_current(outcome.generation) {
            tracing::debug!(
                source = %outcome.source,
                generation = outcome.generation,
                "discarding stale impulse response"
            );
            return Ok(());
        }

        match outcome.result {
            Ok(buffer) => {
                let response = buffer.resampled(ctx.sample_rate());
                tracing::debug!(
                    source = %outcome.source,
                    frames = response.len(),
                    "impulse response loaded"
                );
                self.install(ctx, &response)?;
                self.response = Some(response);
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                tracing::warn!(source = %outcome.source, error = %e, "impulse response failed to load");
                self.drop_response(ctx)?;
                self.status = LoadStatus::Failed;
                self.last_error = Some(e);
            }
        }
        Ok(())
    }

    /// Forgets the loaded response and empties the wet path.
    fn drop_response(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        self.response = None;
        if self.installed(ctx)? {
            self.replace_convolver(ctx, None)?;
        }
        Ok(())
    }

    fn installed(&self, ctx: &AudioContext) -> Result<bool, EffectError> {
        match self.convolver() {
            Some(conv) => Ok(ctx.buffer(conv)?.is_some()),
            None => Ok(false),
        }
    }

    /// Puts `response`, cut to the reverb time, into the wet path.
    fn install(&mut self, ctx: &mut AudioContext, response: &AudioBuffer) -> Result<(), EffectError> {
        let trimmed = response.truncated(self.time);
        match self.convolver() {
            Some(conv) if ctx.buffer(conv)?.is_none() => {
                ctx.set_buffer(conv, trimmed)?;
                Ok(())
            }
            _ => self.replace_convolver(ctx, Some(trimmed)),
        }
    }

    /// Swaps in a fresh convolver holding `buffer` (or nothing). Does
    /// nothing once torn down.
    fn replace_convolver(
        &mut self,
        ctx: &mut AudioContext,
        buffer: Option<AudioBuffer>,
    ) -> Result<(), EffectError> {
        if self.torn_down {
            return Ok(());
        }
        let (Some(pre), Some(wet)) = (self.graph.node("pre"), self.graph.node("wet")) else {
            return Ok(());
        };

        let conv = ctx.create_convolver();
        if let Some(buffer) = buffer {
            ctx.set_buffer(conv, buffer)?;
        }
        ctx.connect(pre, conv)?;
        ctx.connect(conv, wet)?;
        if let Some(old) = self.graph.insert("convolver", conv) {
            ctx.remove_node(old)?;
        }
        Ok(())
    }

    /// Returns the response length in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Sets the response length and re-installs a loaded response.
    pub fn set_time(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        if let Some(response) = &self.response {
            let trimmed = response.truncated(secs);
            self.replace_convolver(ctx, Some(trimmed))?;
        }
        self.time = secs;
        self.settings.record("time", secs);
        Ok(())
    }

    /// Returns the wet gain.
    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Sets the wet gain.
    pub fn set_wet(&mut self, ctx: &mut AudioContext, wet: f32) -> Result<(), EffectError> {
        if let Some(node) = self.graph.node("wet") {
            ctx.set_param_value(node, ParamName::Gain, wet)?;
        }
        self.wet = wet;
        self.settings.record("wet", wet);
        Ok(())
    }

    /// Returns the dry gain.
    pub fn dry(&self) -> f32 {
        self.dry
    }

    /// Sets the dry gain.
    pub fn set_dry(&mut self, ctx: &mut AudioContext, dry: f32) -> Result<(), EffectError> {
        if let Some(node) = self.graph.node("dry") {
            ctx.set_param_value(node, ParamName::Gain, dry)?;
        }
        self.dry = dry;
        self.settings.record("dry", dry);
        Ok(())
    }
}

impl Effect for Reverb {
    fn kind(&self) -> EffectKind {
        EffectKind::Reverb
    }

    fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    fn settings(&self) -> &ParameterStore {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ParameterStore {
        &mut self.settings
    }

    fn level(&self) -> f32 {
        self.level
    }

    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.graph.main(), ParamName::Gain, level)?;
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "time" => Some(self.time),
            "wet" => Some(self.wet),
            "dry" => Some(self.dry),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "time" => self.set_time(ctx, value),
            "wet" => self.set_wet(ctx, value),
            "dry" => self.set_dry(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }

    /// Applies every finished load without blocking.
    fn poll(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        while let Some(outcome) = self.queue.try_next() {
            self.apply(ctx, outcome)?;
        }
        Ok(())
    }

    /// Abandons pending loads and disconnects every node.
    fn teardown(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        tracing::debug!(effect = %self.kind(), "teardown");
        self.queue.invalidate();
        if self.status == LoadStatus::Pending {
            self.status = LoadStatus::Idle;
        }
        self.torn_down = true;
        self.graph.teardown(ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, bounded};

    const WAIT: Duration = Duration::from_secs(5);

    /// Returns a short decaying response for any source.
    struct Immediate;

    impl ImpulseResponseLoader for Immediate {
        fn load(&self, source: &str) -> Result<AudioBuffer, LoadError> {
            match source {
                "missing.wav" => Err(LoadError::NotFound(source.to_owned())),
                "long.wav" => Ok(AudioBuffer::new(vec![0.5; 1000], 1000.0)),
                _ => Ok(AudioBuffer::new(vec![1.0, 0.5, 0.25], 1000.0)),
            }
        }
    }

    /// Blocks each load until the test releases it.
    struct Gated {
        gate: Receiver<()>,
    }

    impl ImpulseResponseLoader for Gated {
        fn load(&self, source: &str) -> Result<AudioBuffer, LoadError> {
            self.gate
                .recv()
                .map_err(|_| LoadError::NotFound(source.to_owned()))?;
            let tap = if source == "second.wav" { 0.25 } else { 1.0 };
            Ok(AudioBuffer::new(vec![tap], 1000.0))
        }
    }

    fn with_src(src: &str) -> ReverbSettings {
        ReverbSettings {
            src: Some(src.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_source_never_loads() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, ReverbSettings::default(), Arc::new(Immediate)).unwrap();
        reverb.poll(&mut ctx).unwrap();

        assert_eq!(reverb.load_status(), LoadStatus::Idle);
        let conv = reverb.convolver().unwrap();
        assert!(ctx.buffer(conv).unwrap().is_none());
    }

    #[test]
    fn test_loaded_response_reaches_convolver() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("hall.wav"), Arc::new(Immediate)).unwrap();
        assert_eq!(reverb.load_status(), LoadStatus::Pending);

        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);
        let conv = reverb.convolver().unwrap();
        assert_eq!(
            ctx.buffer(conv).unwrap().map(AudioBuffer::samples),
            Some(&[1.0, 0.5, 0.25][..])
        );
    }

    #[test]
    fn test_response_is_cut_to_time() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("long.wav"), Arc::new(Immediate)).unwrap();
        reverb.wait(&mut ctx, WAIT).unwrap();
        let conv = reverb.convolver().unwrap();
        assert_eq!(ctx.buffer(conv).unwrap().map(AudioBuffer::len), Some(500));

        reverb.set_time(&mut ctx, 0.0).unwrap();
        let rebuilt = reverb.convolver().unwrap();
        assert_ne!(rebuilt, conv);
        assert!(!ctx.contains(conv));
        assert_eq!(ctx.buffer(rebuilt).unwrap().map(AudioBuffer::len), Some(1000));
    }

    #[test]
    fn test_failure_leaves_wet_path_silent() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("missing.wav"), Arc::new(Immediate)).unwrap();
        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Failed);
        assert_eq!(
            reverb.last_error(),
            Some(&LoadError::NotFound("missing.wav".to_owned()))
        );
        assert!(ctx.buffer(reverb.convolver().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_readiness_window_is_silent_then_wet() {
        let (open, gate) = bounded(1);
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(
            &mut ctx,
            ReverbSettings {
                level: Some(1.0),
                src: Some("hall.wav".to_owned()),
                ..Default::default()
            },
            Arc::new(Gated { gate }),
        )
        .unwrap();
        let src = ctx.create_constant_source(1.0).unwrap();
        let dest = ctx.destination();
        reverb.set_input(&mut ctx, src).unwrap();
        reverb.set_output(&mut ctx, dest).unwrap();
        ctx.start(src, 0.0).unwrap();

        reverb.poll(&mut ctx).unwrap();
        assert_eq!(reverb.load_status(), LoadStatus::Pending);
        assert!(ctx.render(64).iter().all(|&s| s == 0.0));

        open.send(()).unwrap();
        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);
        let out = ctx.render(64);
        assert!(out.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_last_requested_source_wins() {
        let (open, gate) = bounded(2);
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("first.wav"), Arc::new(Gated { gate })).unwrap();
        reverb.set_source(&mut ctx, "second.wav").unwrap();

        open.send(()).unwrap();
        open.send(()).unwrap();
        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);
        assert_eq!(reverb.source(), "second.wav");

        let conv = reverb.convolver().unwrap();
        assert_eq!(
            ctx.buffer(conv).unwrap().map(AudioBuffer::samples),
            Some(&[0.25][..])
        );
        std::thread::sleep(Duration::from_millis(50));
        reverb.poll(&mut ctx).unwrap();
        assert_eq!(reverb.convolver(), Some(conv));
    }

    #[test]
    fn test_source_change_rebuilds_convolver() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("a.wav"), Arc::new(Immediate)).unwrap();
        reverb.wait(&mut ctx, WAIT).unwrap();
        let first = reverb.convolver().unwrap();

        reverb.set_source(&mut ctx, "b.wav").unwrap();
        reverb.wait(&mut ctx, WAIT).unwrap();
        let second = reverb.convolver().unwrap();

        assert_ne!(first, second);
        assert!(!ctx.contains(first));
        let pre = reverb.graph().node("pre").unwrap();
        let wet = reverb.graph().node("wet").unwrap();
        assert!(ctx.is_connected(pre, second));
        assert!(ctx.is_connected(second, wet));
    }

    #[test]
    fn test_clearing_source_silences_wet_path() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("a.wav"), Arc::new(Immediate)).unwrap();
        reverb.wait(&mut ctx, WAIT).unwrap();

        reverb.set_source(&mut ctx, "").unwrap();
        assert_eq!(reverb.load_status(), LoadStatus::Idle);
        assert!(ctx.buffer(reverb.convolver().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_teardown_disconnects_every_node() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("a.wav"), Arc::new(Immediate)).unwrap();
        let dest = ctx.destination();
        reverb.set_output(&mut ctx, dest).unwrap();
        reverb.teardown(&mut ctx).unwrap();

        assert_eq!(ctx.outgoing_count(reverb.main_node()), 0);
        for (name, node) in reverb.graph().nodes() {
            assert_eq!(ctx.outgoing_count(node), 0, "{name}");
        }
        // the abandoned load is discarded
        std::thread::sleep(Duration::from_millis(50));
        reverb.poll(&mut ctx).unwrap();
        assert!(ctx.buffer(reverb.convolver().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_failed_switch_drops_previous_response() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("a.wav"), Arc::new(Immediate)).unwrap();
        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Ready);

        reverb.set_source(&mut ctx, "missing.wav").unwrap();
        assert_eq!(reverb.wait(&mut ctx, WAIT).unwrap(), LoadStatus::Failed);
        assert_eq!(reverb.source(), "missing.wav");
        let conv = reverb.convolver().unwrap();
        assert!(ctx.buffer(conv).unwrap().is_none());

        // a new time must not bring the old response back
        reverb.set_time(&mut ctx, 0.0).unwrap();
        assert!(ctx.buffer(reverb.convolver().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_setters_after_teardown_leave_nodes_disconnected() {
        let mut ctx = AudioContext::new(1000.0);
        let mut reverb = Reverb::new(&mut ctx, with_src("long.wav"), Arc::new(Immediate)).unwrap();
        reverb.wait(&mut ctx, WAIT).unwrap();
        reverb.teardown(&mut ctx).unwrap();

        reverb.set_time(&mut ctx, 0.2).unwrap();
        reverb.set_source(&mut ctx, "b.wav").unwrap();
        assert_eq!(reverb.load_status(), LoadStatus::Idle);
        reverb.set_source(&mut ctx, "").unwrap();
        reverb.poll(&mut ctx).unwrap();

        let pre = reverb.graph().node("pre").unwrap();
        assert_eq!(ctx.outgoing_count(pre), 0);
        for (name, node) in reverb.graph().nodes() {
            assert_eq!(ctx.outgoing_count(node), 0, "{name}");
            assert_eq!(ctx.incoming_count(node), 0, "{name}");
        }
        assert_eq!(reverb.time(), 0.2);
    }
}
