//! Property-based tests for patchcord-core.
//!
//! Tests filter stability, automation bounds, transposition laws and
//! delay-line integrity using proptest for randomized input generation.

use patchcord_core::{AudioParam, Biquad, DelayLine, FilterType, transpose};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// For any cutoff (20-20000 Hz), Q (0.1-10.0) and filter type, biquads
    /// produce finite output for random finite input.
    #[test]
    fn biquad_stability(
        freq in 20.0f32..20000.0f32,
        q in 0.1f32..10.0f32,
        gain_db in -40.0f32..40.0f32,
        variant in 0usize..8,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let filter_type = FilterType::ALL[variant];
        let mut biquad = Biquad::new();
        biquad.set_coefficients(filter_type.coefficients(freq, q, gain_db, 48000.0));

        for &sample in &input {
            let out = biquad.process(sample);
            prop_assert!(
                out.is_finite(),
                "{} (freq={}, q={}) produced non-finite output {} for input {}",
                filter_type, freq, q, out, sample
            );
        }
    }

    /// Computed automation values stay finite and inside the nominal range,
    /// whatever linear ramps are scheduled.
    #[test]
    fn automation_stays_in_range(
        steps in prop::collection::vec((-10.0f32..10.0f32, 0.0f64..5.0f64), 1..8),
        probe in 0.0f64..6.0f64,
    ) {
        let mut param = AudioParam::new(0.5, 0.0, 1.0);
        for (value, time) in steps {
            param.linear_ramp_to_value_at_time(value, time).unwrap();
        }
        let v = param.value_at(probe);
        prop_assert!(v.is_finite());
        prop_assert!((0.0..=1.0).contains(&v), "value {} escaped range", v);
    }

    /// A set-target approach never overshoots its target.
    #[test]
    fn set_target_monotone(
        start in -1.0f32..1.0f32,
        target in -1.0f32..1.0f32,
        tau in 0.001f32..2.0f32,
        probe in 0.0f64..10.0f64,
    ) {
        let mut param = AudioParam::new(0.0, -1.0, 1.0);
        param.set_value_at_time(start, 0.0).unwrap();
        param.set_target_at_time(target, 0.0, tau).unwrap();
        let v = param.value_at(probe);
        let (lo, hi) = if start < target { (start, target) } else { (target, start) };
        prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6);
    }

    /// Transposing up then down returns the original frequency, and twelve
    /// semitones double it.
    #[test]
    fn transpose_laws(
        freq in 20.0f32..5000.0f32,
        semitones in -24.0f32..24.0f32,
    ) {
        let back = transpose(transpose(freq, semitones), -semitones);
        prop_assert!((back - freq).abs() / freq < 1e-4);
        let octave = transpose(freq, 12.0);
        prop_assert!((octave / freq - 2.0).abs() < 1e-4);
    }

    /// An integer delay returns exactly the sample written that many
    /// writes ago.
    #[test]
    fn delay_line_integer_delay(
        delay in 1usize..64,
        input in prop::collection::vec(-1.0f32..1.0f32, 64..128),
    ) {
        let mut line = DelayLine::new(64);
        for (i, &sample) in input.iter().enumerate() {
            line.write(sample);
            if i + 1 >= delay {
                prop_assert_eq!(line.read(delay as f32), input[i + 1 - delay]);
            }
        }
    }
}
