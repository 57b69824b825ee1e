//! Offline rendering.
//!
//! Every frame runs in three phases:
//!
//! 1. Delay nodes emit the sample written `delayTime` ago.
//! 2. All other nodes run in topological order, each consuming the sum of
//!    its inputs' outputs from this frame.
//! 3. Delay nodes write their summed input.
//!
//! Edges into delay nodes are left out of the ordering, which is what makes
//! feedback loops through a delay well-defined: the loop is closed one
//! frame (or more) later. The order is cached until the topology changes.

use crate::compressor::CompressorControls;
use crate::math::cents_to_ratio;
use crate::param::{AudioParam, ParamName};

use super::context::AudioContext;
use super::node::{BiquadTuning, NodeData, NodeKind, Processor};

/// Cached evaluation order.
#[derive(Debug, Clone)]
pub(crate) struct RenderPlan {
    /// Non-delay nodes in topological order.
    order: Vec<usize>,
    /// Delay nodes.
    delays: Vec<usize>,
}

impl AudioContext {
    /// Renders `frames` samples, advancing the clock.
    ///
    /// Returns the signal arriving at the destination.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => self.build_plan(),
        };

        let mut out = Vec::with_capacity(frames);
        for _ in 0..frames {
            let time = self.current_time();

            for &idx in &plan.delays {
                if let Some(node) = self.nodes[idx].as_mut() {
                    let delay_secs = node.param_at(ParamName::DelayTime, time);
                    if let Processor::Delay(line) = &node.processor {
                        node.output = line.read(delay_secs * self.sample_rate);
                    }
                }
            }

            for &idx in &plan.order {
                let input = self.sum_inputs(idx);
                let sample_rate = self.sample_rate;
                if let Some(node) = self.nodes[idx].as_mut() {
                    node.output = process_node(node, input, time, sample_rate);
                }
            }

            for &idx in &plan.delays {
                let input = self.sum_inputs(idx);
                if let Some(node) = self.nodes[idx].as_mut()
                    && let Processor::Delay(line) = &mut node.processor
                {
                    line.write(input);
                }
            }

            let dest = self.destination().index() as usize;
            out.push(self.nodes[dest].as_ref().map_or(0.0, |n| n.output));
            self.frame += 1;
        }

        self.plan = Some(plan);
        out
    }

    /// Sums this frame's outputs of every node feeding `idx`.
    fn sum_inputs(&self, idx: usize) -> f32 {
        let Some(node) = self.nodes[idx].as_ref() else {
            return 0.0;
        };
        node.incoming
            .iter()
            .filter_map(|e| self.edge(*e))
            .filter_map(|edge| self.node(edge.from))
            .map(|from| from.output)
            .sum()
    }

    /// Kahn's algorithm over the graph with delay nodes cut out.
    fn build_plan(&self) -> RenderPlan {
        let n = self.nodes.len();
        let is_delay =
            |i: usize| matches!(&self.nodes[i], Some(node) if node.kind == NodeKind::Delay);

        let mut in_degree = vec![0u32; n];
        let mut active = 0usize;
        let mut delays = Vec::new();

        for (i, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            if is_delay(i) {
                delays.push(i);
                continue;
            }
            active += 1;
            for edge_id in &node.incoming {
                if let Some(edge) = self.edge(*edge_id)
                    && !is_delay(edge.from.index() as usize)
                {
                    in_degree[i] += 1;
                }
            }
        }

        let mut queue: Vec<usize> = (0..n)
            .filter(|&i| self.nodes[i].is_some() && !is_delay(i) && in_degree[i] == 0)
            .collect();
        queue.reverse();

        let mut order = Vec::with_capacity(active);
        while let Some(idx) = queue.pop() {
            order.push(idx);
            let Some(node) = self.nodes[idx].as_ref() else {
                continue;
            };
            for edge_id in &node.outgoing {
                if let Some(edge) = self.edge(*edge_id) {
                    let to = edge.to.index() as usize;
                    if is_delay(to) {
                        continue;
                    }
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        queue.push(to);
                    }
                }
            }
        }

        // connect() refuses delay-free cycles, so every node is ordered
        #[cfg(feature = "tracing")]
        if order.len() != active {
            tracing::warn!(
                "render order left {} nodes unscheduled",
                active - order.len()
            );
        }

        RenderPlan { order, delays }
    }
}

/// Runs one non-delay node for one frame.
#[inline]
fn process_node(node: &mut NodeData, input: f32, time: f64, sample_rate: f32) -> f32 {
    match node.kind {
        NodeKind::Destination => return input,
        NodeKind::Gain => return input * node.param_at(ParamName::Gain, time),
        _ => {}
    }

    let frequency = node.param_at(ParamName::Frequency, time)
        * cents_to_ratio(node.param_at(ParamName::Detune, time));

    match &mut node.processor {
        Processor::Stateless | Processor::Delay(_) => input,
        Processor::Biquad {
            filter,
            filter_type,
            tuned,
        } => {
            let nyquist = sample_rate / 2.0;
            let frequency = frequency.clamp(0.0, nyquist);
            let q = node_param(&node.params, ParamName::Q, time);
            let gain_db = node_param(&node.params, ParamName::Gain, time);
            let tuning: BiquadTuning = (*filter_type, frequency, q, gain_db);
            if *tuned != Some(tuning) {
                filter.set_coefficients(filter_type.coefficients(
                    frequency,
                    q,
                    gain_db,
                    sample_rate,
                ));
                *tuned = Some(tuning);
            }
            filter.process(input)
        }
        Processor::Convolver(conv) => conv.process(input),
        Processor::WaveShaper(shaper) => shaper.process(input),
        Processor::Oscillator(osc) => osc.process(frequency, time, sample_rate),
        Processor::Compressor(comp) => {
            let controls = CompressorControls {
                threshold_db: node_param(&node.params, ParamName::Threshold, time),
                knee_db: node_param(&node.params, ParamName::Knee, time),
                ratio: node_param(&node.params, ParamName::Ratio, time),
                attack_secs: node_param(&node.params, ParamName::Attack, time),
                release_secs: node_param(&node.params, ParamName::Release, time),
            };
            comp.process(input, controls, sample_rate)
        }
        Processor::BufferSource(src) => src.process(time),
        Processor::ConstantSource(src) => {
            src.process(node_param(&node.params, ParamName::Offset, time), time)
        }
    }
}

/// Parameter lookup on the params field alone, so the processor can be
/// borrowed mutably at the same time.
#[inline]
fn node_param(params: &[(ParamName, AudioParam)], name: ParamName, time: f64) -> f32 {
    params
        .iter()
        .find(|(n, _)| *n == name)
        .map_or(0.0, |(_, p)| p.value_at(time))
}

#[cfg(test)]
mod tests {
    use crate::buffer::AudioBuffer;
    use crate::graph::AudioContext;
    use crate::oscillator::Waveform;
    use crate::param::ParamName;
    use crate::shaper::OverSample;

    fn impulse(ctx: &mut AudioContext) -> crate::graph::NodeId {
        let rate = ctx.sample_rate();
        let src = ctx
            .create_buffer_source(AudioBuffer::new(vec![1.0], rate))
            .unwrap();
        ctx.start(src, 0.0).unwrap();
        src
    }

    #[test]
    fn test_silent_graph() {
        let mut ctx = AudioContext::new(48000.0);
        assert_eq!(ctx.render(3), vec![0.0; 3]);
        assert_eq!(ctx.frames_rendered(), 3);
        assert!((ctx.current_time() - 3.0 / 48000.0).abs() < 1e-12);
    }

    #[test]
    fn test_fan_in_sums() {
        let mut ctx = AudioContext::new(48000.0);
        let a = ctx.create_constant_source(0.25).unwrap();
        let b = ctx.create_constant_source(0.5).unwrap();
        let dest = ctx.destination();
        ctx.connect(a, dest).unwrap();
        ctx.connect(b, dest).unwrap();
        ctx.start(a, 0.0).unwrap();
        ctx.start(b, 0.0).unwrap();
        assert_eq!(ctx.render(2), vec![0.75, 0.75]);
    }

    #[test]
    fn test_delay_is_exact() {
        let mut ctx = AudioContext::new(1000.0);
        let src = impulse(&mut ctx);
        let delay = ctx.create_delay(1.0).unwrap();
        ctx.set_param_value(delay, ParamName::DelayTime, 0.003).unwrap();
        ctx.connect(src, delay).unwrap();
        ctx.connect(delay, ctx.destination()).unwrap();

        let out = ctx.render(6);
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_delay_is_one_sample() {
        let mut ctx = AudioContext::new(1000.0);
        let src = impulse(&mut ctx);
        let delay = ctx.create_delay(1.0).unwrap();
        ctx.connect(src, delay).unwrap();
        ctx.connect(delay, ctx.destination()).unwrap();
        assert_eq!(ctx.render(3), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_feedback_loop_decays() {
        let mut ctx = AudioContext::new(1000.0);
        let src = impulse(&mut ctx);
        let delay = ctx.create_delay(1.0).unwrap();
        let feedback = ctx.create_gain(0.5).unwrap();
        ctx.set_param_value(delay, ParamName::DelayTime, 0.002).unwrap();
        ctx.connect(src, delay).unwrap();
        ctx.connect(delay, feedback).unwrap();
        ctx.connect(feedback, delay).unwrap();
        ctx.connect(delay, ctx.destination()).unwrap();

        let out = ctx.render(7);
        assert_eq!(out, vec![0.0, 0.0, 1.0, 0.0, 0.5, 0.0, 0.25]);
    }

    #[test]
    fn test_gain_automation_applies() {
        let mut ctx = AudioContext::new(4.0);
        let src = ctx.create_constant_source(1.0).unwrap();
        let gain = ctx.create_gain(0.0).unwrap();
        ctx.connect(src, gain).unwrap();
        ctx.connect(gain, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();
        ctx.param_mut(gain, ParamName::Gain)
            .unwrap()
            .linear_ramp_to_value_at_time(1.0, 1.0)
            .unwrap();

        let out = ctx.render(5);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_convolver_silent_until_buffer() {
        let mut ctx = AudioContext::new(1000.0);
        let src = ctx.create_constant_source(1.0).unwrap();
        let conv = ctx.create_convolver();
        ctx.connect(src, conv).unwrap();
        ctx.connect(conv, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();

        assert_eq!(ctx.render(2), vec![0.0, 0.0]);
        ctx.set_buffer(conv, AudioBuffer::new(vec![0.5], 1000.0)).unwrap();
        assert_eq!(ctx.render(2), vec![0.5, 0.5]);
    }

    #[test]
    fn test_shaper_curve_applies() {
        let mut ctx = AudioContext::new(1000.0);
        let src = ctx.create_constant_source(0.5).unwrap();
        let shaper = ctx.create_wave_shaper();
        ctx.set_curve(shaper, Some(vec![-1.0, 0.0, 0.0])).unwrap();
        ctx.set_oversample(shaper, OverSample::X2).unwrap();
        ctx.connect(src, shaper).unwrap();
        ctx.connect(shaper, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();

        let out = ctx.render(4);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn test_oscillator_renders_after_start() {
        let mut ctx = AudioContext::new(48000.0);
        let osc = ctx.create_oscillator();
        ctx.set_waveform(osc, Waveform::Square).unwrap();
        ctx.connect(osc, ctx.destination()).unwrap();

        assert_eq!(ctx.render(4), vec![0.0; 4]);
        let now = ctx.current_time();
        ctx.start(osc, now).unwrap();
        assert_eq!(ctx.render(1), vec![1.0]);
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut ctx = AudioContext::new(48000.0);
        let src = ctx.create_constant_source(1.0).unwrap();
        let filter = ctx.create_biquad_filter();
        ctx.connect(src, filter).unwrap();
        ctx.connect(filter, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();

        let out = ctx.render(4800);
        assert!((out[4799] - 1.0).abs() < 1e-3, "got {}", out[4799]);
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut ctx = AudioContext::new(48000.0);
        let src = ctx.create_constant_source(1.0).unwrap();
        let comp = ctx.create_dynamics_compressor();
        ctx.connect(src, comp).unwrap();
        ctx.connect(comp, ctx.destination()).unwrap();
        ctx.start(src, 0.0).unwrap();

        let out = ctx.render(4800);
        assert!(out[4799] < 0.5);
        assert!(ctx.compressor_reduction(comp).unwrap() < -6.0);
    }

    #[test]
    fn test_topology_change_reorders() {
        let mut ctx = AudioContext::new(1000.0);
        let src = ctx.create_constant_source(1.0).unwrap();
        let gain = ctx.create_gain(2.0).unwrap();
        ctx.start(src, 0.0).unwrap();
        ctx.connect(gain, ctx.destination()).unwrap();
        assert_eq!(ctx.render(1), vec![0.0]);

        ctx.connect(src, gain).unwrap();
        assert_eq!(ctx.render(1), vec![2.0]);

        ctx.remove_node(gain).unwrap();
        assert_eq!(ctx.render(1), vec![0.0]);
    }
}
