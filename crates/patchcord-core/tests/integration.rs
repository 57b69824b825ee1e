//! Integration tests for the patchcord-core audio graph.
//!
//! Drives signals through rendered graphs and checks them at the signal
//! level: filter responses from sine analysis, sample-accurate delays and
//! feedback, automation envelopes, and convolution against known responses.

use patchcord_core::{
    AudioBuffer, AudioContext, FilterType, NodeId, OverSample, ParamName, Waveform,
};

const SAMPLE_RATE: f32 = 48000.0;
const TAU: f32 = core::f32::consts::TAU;

/// Generate a sine wave buffer at the given frequency and sample rate.
fn generate_sine(freq_hz: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| libm::sinf(TAU * freq_hz * n as f32 / sample_rate))
        .collect()
}

/// Measure RMS amplitude of a signal buffer.
fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

/// Convert linear amplitude to dB.
fn to_db(linear: f32) -> f32 {
    20.0 * libm::log10f(linear.max(1e-10))
}

/// Plays `signal` through `node` into the destination and returns the output.
fn run_through(ctx: &mut AudioContext, node: NodeId, signal: Vec<f32>) -> Vec<f32> {
    let len = signal.len();
    let src = ctx
        .create_buffer_source(AudioBuffer::new(signal, ctx.sample_rate()))
        .unwrap();
    ctx.connect(src, node).unwrap();
    ctx.connect(node, ctx.destination()).unwrap();
    let now = ctx.current_time();
    ctx.start(src, now).unwrap();
    ctx.render(len)
}

/// Gain in dB of a filter node at `freq_hz`, skipping the settling period.
fn filter_response(filter_type: FilterType, cutoff: f32, freq_hz: f32) -> f32 {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let filter = ctx.create_biquad_filter();
    ctx.set_filter_type(filter, filter_type).unwrap();
    ctx.set_param_value(filter, ParamName::Frequency, cutoff).unwrap();

    let input = generate_sine(freq_hz, SAMPLE_RATE, 9600);
    let output = run_through(&mut ctx, filter, input.clone());
    to_db(rms(&output[4800..]) / rms(&input[4800..]))
}

// ============================================================================
// 1. Filter frequency responses
// ============================================================================

#[test]
fn lowpass_attenuates_above_cutoff() {
    let pass = filter_response(FilterType::Lowpass, 1000.0, 100.0);
    let stop = filter_response(FilterType::Lowpass, 1000.0, 10000.0);
    assert!(pass.abs() < 0.5, "passband gain {pass} dB");
    assert!(stop < -30.0, "stopband gain {stop} dB");
}

#[test]
fn highpass_attenuates_below_cutoff() {
    let pass = filter_response(FilterType::Highpass, 1000.0, 10000.0);
    let stop = filter_response(FilterType::Highpass, 1000.0, 100.0);
    assert!(pass.abs() < 0.5, "passband gain {pass} dB");
    assert!(stop < -30.0, "stopband gain {stop} dB");
}

#[test]
fn notch_removes_center() {
    let center = filter_response(FilterType::Notch, 1000.0, 1000.0);
    assert!(center < -20.0, "notch center {center} dB");
}

#[test]
fn peaking_boosts_by_gain() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let filter = ctx.create_biquad_filter();
    ctx.set_filter_type(filter, FilterType::Peaking).unwrap();
    ctx.set_param_value(filter, ParamName::Frequency, 1000.0).unwrap();
    ctx.set_param_value(filter, ParamName::Gain, 6.0).unwrap();

    let input = generate_sine(1000.0, SAMPLE_RATE, 9600);
    let output = run_through(&mut ctx, filter, input.clone());
    let gain = to_db(rms(&output[4800..]) / rms(&input[4800..]));
    assert!((gain - 6.0).abs() < 0.5, "peak gain {gain} dB");
}

#[test]
fn filter_gain_is_clamped_to_nominal_range() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let filter = ctx.create_biquad_filter();
    ctx.set_param_value(filter, ParamName::Gain, 100.0).unwrap();
    // intrinsic value is stored as given, computed value is clamped
    assert_eq!(ctx.param_value(filter, ParamName::Gain).unwrap(), 100.0);
    assert_eq!(ctx.param_value_at(filter, ParamName::Gain, 0.0).unwrap(), 40.0);
}

// ============================================================================
// 2. Delay and feedback
// ============================================================================

#[test]
fn delay_shifts_signal_by_delay_time() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let delay = ctx.create_delay(1.0).unwrap();
    ctx.set_param_value(delay, ParamName::DelayTime, 0.01).unwrap();

    let mut input = vec![0.0; 1000];
    input[0] = 1.0;
    let output = run_through(&mut ctx, delay, input);
    let peak = output
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(peak, 480);
}

#[test]
fn feedback_echoes_decay_geometrically() {
    let mut ctx = AudioContext::new(1000.0);
    let delay = ctx.create_delay(1.0).unwrap();
    let feedback = ctx.create_gain(0.5).unwrap();
    ctx.set_param_value(delay, ParamName::DelayTime, 0.1).unwrap();
    ctx.connect(delay, feedback).unwrap();
    ctx.connect(feedback, delay).unwrap();

    let mut input = vec![0.0; 400];
    input[0] = 1.0;
    let output = run_through(&mut ctx, delay, input);
    assert!((output[100] - 1.0).abs() < 1e-6);
    assert!((output[200] - 0.5).abs() < 1e-6);
    assert!((output[300] - 0.25).abs() < 1e-6);
}

#[test]
fn delay_time_above_max_is_clamped() {
    let mut ctx = AudioContext::new(1000.0);
    let delay = ctx.create_delay(0.05).unwrap();
    ctx.set_param_value(delay, ParamName::DelayTime, 5.0).unwrap();

    let mut input = vec![0.0; 100];
    input[0] = 1.0;
    let output = run_through(&mut ctx, delay, input);
    assert_eq!(output[50], 1.0);
}

// ============================================================================
// 3. Automation through the graph
// ============================================================================

#[test]
fn exponential_fade_reaches_floor() {
    let mut ctx = AudioContext::new(1000.0);
    let src = ctx.create_constant_source(1.0).unwrap();
    let gain = ctx.create_gain(1.0).unwrap();
    ctx.connect(src, gain).unwrap();
    ctx.connect(gain, ctx.destination()).unwrap();
    ctx.start(src, 0.0).unwrap();

    let param = ctx.param_mut(gain, ParamName::Gain).unwrap();
    param.set_value_at_time(1.0, 0.0).unwrap();
    param.exponential_ramp_to_value_at_time(0.0001, 0.5).unwrap();

    let out = ctx.render(600);
    assert!(out[250] < 1.0 && out[250] > 0.0001);
    assert!((out[550] - 0.0001).abs() < 1e-7);
    // monotone decay
    assert!(out[..500].windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn oscillator_stop_silences() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let osc = ctx.create_oscillator();
    ctx.set_waveform(osc, Waveform::Sawtooth).unwrap();
    ctx.connect(osc, ctx.destination()).unwrap();
    ctx.start(osc, 0.0).unwrap();
    ctx.stop(osc, 0.01).unwrap();

    let out = ctx.render(960);
    assert!(rms(&out[..480]) > 0.1);
    assert!(out[480..].iter().all(|&s| s == 0.0));
}

#[test]
fn oscillator_detune_shifts_pitch() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let osc = ctx.create_oscillator();
    ctx.set_param_value(osc, ParamName::Frequency, 100.0).unwrap();
    ctx.set_param_value(osc, ParamName::Detune, 1200.0).unwrap();
    ctx.set_waveform(osc, Waveform::Square).unwrap();
    ctx.connect(osc, ctx.destination()).unwrap();
    ctx.start(osc, 0.0).unwrap();

    let out = ctx.render(4800);
    let rising_edges = out.windows(2).filter(|w| w[0] < 0.0 && w[1] > 0.0).count();
    // 200 Hz for 0.1 s
    assert!((19..=21).contains(&rising_edges), "{rising_edges} cycles");
}

// ============================================================================
// 4. Convolution, shaping, dynamics
// ============================================================================

#[test]
fn convolver_applies_impulse_response() {
    let mut ctx = AudioContext::new(1000.0);
    let conv = ctx.create_convolver();
    ctx.set_buffer(conv, AudioBuffer::new(vec![0.0, 0.0, 0.5], 1000.0))
        .unwrap();

    let mut input = vec![0.0; 6];
    input[0] = 1.0;
    input[1] = 2.0;
    let output = run_through(&mut ctx, conv, input);
    assert_eq!(output, vec![0.0, 0.0, 0.5, 1.0, 0.0, 0.0]);
}

#[test]
fn shaper_with_identity_curve_passes_signal() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let shaper = ctx.create_wave_shaper();
    ctx.set_curve(shaper, Some(vec![-1.0, 1.0])).unwrap();
    ctx.set_oversample(shaper, OverSample::None).unwrap();

    let input = generate_sine(440.0, SAMPLE_RATE, 256);
    let output = run_through(&mut ctx, shaper, input.clone());
    for (a, b) in input.iter().zip(&output) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn compressor_leaves_quiet_signal_alone() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let comp = ctx.create_dynamics_compressor();

    let input: Vec<f32> = generate_sine(440.0, SAMPLE_RATE, 4800)
        .into_iter()
        .map(|s| s * 0.001)
        .collect();
    let output = run_through(&mut ctx, comp, input.clone());
    assert!((rms(&output) - rms(&input)).abs() < 1e-6);
}

#[test]
fn compressor_ratio_of_zero_acts_as_unity() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    let comp = ctx.create_dynamics_compressor();
    for name in [
        ParamName::Threshold,
        ParamName::Knee,
        ParamName::Ratio,
        ParamName::Attack,
        ParamName::Release,
    ] {
        ctx.set_param_value(comp, name, 0.0).unwrap();
    }

    let input = generate_sine(440.0, SAMPLE_RATE, 4800);
    let output = run_through(&mut ctx, comp, input.clone());
    assert!((rms(&output) - rms(&input)).abs() < 1e-5);
}
