//! Second-order IIR sections (RBJ cookbook designs) and the Butterworth
//! cascades built from them.

use std::f64::consts::PI;

/// Q values of the two sections of a 4th-order Butterworth response:
/// `1 / (2 cos(pi/8))` and `1 / (2 cos(3pi/8))`.
const BUTTERWORTH_4_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_4];

/// Normalized biquad coefficients (`a0 == 1`), direct form I state.
#[derive(Debug, Clone)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    x: [f64; 2],
    y: [f64; 2],
}

impl Biquad {
    fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b: [b0 / a0, b1 / a0, b2 / a0],
            a: [a1 / a0, a2 / a0],
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    pub fn lowpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_w, alpha) = omega_terms(cutoff_hz, q, sample_rate);
        Self::from_raw(
            (1.0 - cos_w) / 2.0,
            1.0 - cos_w,
            (1.0 - cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    pub fn highpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_w, alpha) = omega_terms(cutoff_hz, q, sample_rate);
        Self::from_raw(
            (1.0 + cos_w) / 2.0,
            -(1.0 + cos_w),
            (1.0 + cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// Peaking EQ with its bandwidth given in octaves between the -3 dB
    /// (midpoint gain) edges. Unity gain far from `center_hz`.
    pub fn peaking(center_hz: f64, width_octaves: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * center_hz / sample_rate;
        let (sin_w, cos_w) = w0.sin_cos();
        let alpha = sin_w * ((2.0_f64.ln() / 2.0) * width_octaves * w0 / sin_w).sinh();
        Self::from_raw(
            1.0 + alpha * a,
            -2.0 * cos_w,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w,
            1.0 - alpha / a,
        )
    }

    #[inline]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let out = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[0] * self.y[0]
            - self.a[1] * self.y[1];
        self.x = [input, self.x[0]];
        self.y = [out, self.y[0]];
        out
    }

    pub fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate;
        let (s1, c1) = (-w).sin_cos();
        let (s2, c2) = (-2.0 * w).sin_cos();
        let num_re = self.b[0] + self.b[1] * c1 + self.b[2] * c2;
        let num_im = self.b[1] * s1 + self.b[2] * s2;
        let den_re = 1.0 + self.a[0] * c1 + self.a[1] * c2;
        let den_im = self.a[0] * s1 + self.a[1] * s2;
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

fn omega_terms(freq_hz: f64, q: f64, sample_rate: f64) -> (f64, f64) {
    let w0 = 2.0 * PI * freq_hz / sample_rate;
    let (sin_w, cos_w) = w0.sin_cos();
    (cos_w, sin_w / (2.0 * q))
}

/// Cascade of biquads run forward-only, one after another.
#[derive(Debug, Clone)]
pub struct BiquadCascade {
    sections: Vec<Biquad>,
}

impl BiquadCascade {
    pub fn new(sections: Vec<Biquad>) -> Self {
        Self { sections }
    }

    /// 4th-order Butterworth lowpass.
    pub fn butterworth_lowpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        Self::new(
            BUTTERWORTH_4_Q
                .iter()
                .map(|&q| Biquad::lowpass(cutoff_hz, q, sample_rate))
                .collect(),
        )
    }

    /// 4th-order Butterworth highpass.
    pub fn butterworth_highpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        Self::new(
            BUTTERWORTH_4_Q
                .iter()
                .map(|&q| Biquad::highpass(cutoff_hz, q, sample_rate))
                .collect(),
        )
    }

    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter_mut()
                    .fold(x as f64, |acc, s| s.process_sample(acc)) as f32
            })
            .collect()
    }

    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.magnitude_at(freq_hz, sample_rate))
            .product()
    }
}

pub fn db(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f64 = 22050.0;

    fn sine(freq: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / SR).sin() as f32)
            .collect()
    }

    fn rms(samples: &[f32]) -> f64 {
        (samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_butterworth_lowpass_is_3db_down_at_cutoff() {
        let lp = BiquadCascade::butterworth_lowpass(1000.0, SR);
        assert_abs_diff_eq!(db(lp.magnitude_at(1000.0, SR)), -3.01, epsilon = 0.05);
        assert_abs_diff_eq!(lp.magnitude_at(10.0, SR), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_butterworth_rolls_off_24db_per_octave() {
        let lp = BiquadCascade::butterworth_lowpass(500.0, SR);
        let one = db(lp.magnitude_at(2000.0, SR));
        let two = db(lp.magnitude_at(4000.0, SR));
        // 4th order: ~24 dB/octave well above the cutoff
        assert!((one - two) > 20.0, "got {one} -> {two}");
    }

    #[test]
    fn test_butterworth_highpass_blocks_low_frequencies() {
        let mut hp = BiquadCascade::butterworth_highpass(1000.0, SR);
        let low = hp.process(&sine(50.0, 22050));
        hp = BiquadCascade::butterworth_highpass(1000.0, SR);
        let high = hp.process(&sine(5000.0, 22050));
        assert!(rms(&low[4410..]) < 0.01);
        assert!(rms(&high[4410..]) > 0.6);
    }

    #[test]
    fn test_peaking_gain_at_center() {
        let eq = Biquad::peaking(1000.0, 2.0, 12.0, SR);
        assert_abs_diff_eq!(db(eq.magnitude_at(1000.0, SR)), 12.0, epsilon = 0.01);
    }

    #[test]
    fn test_peaking_flat_outside_band() {
        let eq = Biquad::peaking(1000.0, 1.0, 9.0, SR);
        // Well outside a one-octave band the response is within +-0.5 dB.
        assert!(db(eq.magnitude_at(50.0, SR)).abs() < 0.5);
        assert!(db(eq.magnitude_at(9000.0, SR)).abs() < 0.5);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut bq = Biquad::lowpass(1000.0, 0.707, SR);
        let first = bq.process_sample(1.0);
        bq.process_sample(0.5);
        bq.reset();
        assert_abs_diff_eq!(bq.process_sample(1.0), first);
    }
}
