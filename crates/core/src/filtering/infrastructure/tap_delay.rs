use crate::filtering::domain::filter_spec::Tap;

/// Sum of delayed, scaled copies added to the dry signal:
/// `out[n] = x[n] + sum_i decay_i * x[n - delay_i]`.
///
/// Output length equals input length; echoes falling past the end are
/// dropped. Taps are not normalized against each other.
pub fn apply_taps(input: &[f32], taps: &[Tap], sample_rate: u32) -> Vec<f32> {
    let mut output = input.to_vec();
    for tap in taps {
        let delay = (tap.delay * sample_rate as f64).round() as usize;
        if delay >= input.len() {
            continue;
        }
        for (out, &dry) in output[delay..].iter_mut().zip(input.iter()) {
            *out += tap.decay * dry;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_impulse_response_matches_tap_sum() {
        let sr = 1000;
        let mut impulse = vec![0.0f32; 400];
        impulse[10] = 1.0;
        let taps = [Tap::new(0.03, 0.7), Tap::new(0.06, 0.5), Tap::new(0.09, 0.4)];

        let out = apply_taps(&impulse, &taps, sr);

        assert_eq!(out.len(), impulse.len());
        for (n, &y) in out.iter().enumerate() {
            let expected: f32 = impulse[n]
                + taps
                    .iter()
                    .map(|t| {
                        let d = (t.delay * sr as f64).round() as usize;
                        if n >= d {
                            t.decay * impulse[n - d]
                        } else {
                            0.0
                        }
                    })
                    .sum::<f32>();
            assert_abs_diff_eq!(y, expected, epsilon = 1e-7);
        }
        assert_abs_diff_eq!(out[40], 0.7);
        assert_abs_diff_eq!(out[70], 0.5);
        assert_abs_diff_eq!(out[100], 0.4);
    }

    #[test]
    fn test_overlapping_taps_accumulate() {
        let out = apply_taps(&[1.0, 0.0, 0.0], &[Tap::new(2.0, 0.5), Tap::new(2.0, 0.25)], 1);
        assert_abs_diff_eq!(out[2], 0.75);
    }

    #[test]
    fn test_delay_longer_than_signal_is_ignored() {
        let input = vec![0.5f32; 10];
        let out = apply_taps(&input, &[Tap::new(2.0, 0.9)], 8);
        assert_eq!(out, input);
    }

    #[test]
    fn test_delay_equal_to_length_is_ignored() {
        let input = vec![0.5f32; 8];
        let out = apply_taps(&input, &[Tap::new(1.0, 0.9)], 8);
        assert_eq!(out, input);
    }

    #[test]
    fn test_delay_one_short_of_length_hits_last_sample() {
        let input = vec![0.5f32; 9];
        let out = apply_taps(&input, &[Tap::new(1.0, 0.9)], 8);
        assert_abs_diff_eq!(out[8], 0.95);
        assert_eq!(&out[..8], &input[..8]);
    }
}
