use crate::filtering::domain::filter_spec::CompressorParams;

/// Floor for the detector level so silence maps to a finite dB value.
const MIN_LEVEL: f64 = 1e-9;

/// Soft-knee dynamic-range compander.
///
/// An envelope follower tracks the absolute input level with separate
/// attack and decay time constants; each sample is then scaled by the gain
/// the transfer curve assigns to the current level.
pub struct Compander {
    curve: TransferCurve,
    attack_coef: f64,
    decay_coef: f64,
    envelope: f64,
}

impl Compander {
    pub fn new(params: &CompressorParams, sample_rate: u32) -> Self {
        Self {
            curve: TransferCurve::new(&params.points, params.soft_knee_db),
            attack_coef: smoothing_coefficient(params.attack, sample_rate),
            decay_coef: smoothing_coefficient(params.decay, sample_rate),
            envelope: 0.0,
        }
    }

    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input
            .iter()
            .map(|&x| {
                let level = (x as f64).abs();
                let coef = if level > self.envelope {
                    self.attack_coef
                } else {
                    self.decay_coef
                };
                self.envelope += coef * (level - self.envelope);

                let in_db = 20.0 * self.envelope.max(MIN_LEVEL).log10();
                let gain_db = self.curve.output_db(in_db) - in_db;
                (x as f64 * 10.0_f64.powf(gain_db / 20.0)) as f32
            })
            .collect()
    }
}

/// One-pole smoothing coefficient for a time constant; zero time is instant.
fn smoothing_coefficient(seconds: f64, sample_rate: u32) -> f64 {
    if seconds <= 0.0 {
        1.0
    } else {
        1.0 - (-1.0 / (seconds * sample_rate as f64)).exp()
    }
}

/// Piecewise-linear input/output curve in dB with rounded corners.
///
/// Below the first point and above the last the curve continues with
/// slope 1, so levels outside the defined range keep a constant gain.
#[derive(Debug, Clone)]
pub struct TransferCurve {
    points: Vec<(f64, f64)>,
    knee: f64,
}

impl TransferCurve {
    pub fn new(points: &[(f64, f64)], soft_knee_db: f64) -> Self {
        // A knee wider than the closest pair of breakpoints would overlap
        // neighbouring corners.
        let min_gap = points
            .windows(2)
            .map(|w| w[1].0 - w[0].0)
            .fold(f64::INFINITY, f64::min);
        Self {
            points: points.to_vec(),
            knee: soft_knee_db.min(min_gap).max(0.0),
        }
    }

    fn slope_before(&self, idx: usize) -> f64 {
        if idx == 0 {
            1.0
        } else {
            segment_slope(self.points[idx - 1], self.points[idx])
        }
    }

    fn slope_after(&self, idx: usize) -> f64 {
        if idx + 1 >= self.points.len() {
            1.0
        } else {
            segment_slope(self.points[idx], self.points[idx + 1])
        }
    }

    /// Hard-cornered curve value.
    fn linear(&self, in_db: f64) -> f64 {
        let first = self.points[0];
        if in_db <= first.0 {
            return first.1 + (in_db - first.0);
        }
        for w in self.points.windows(2) {
            if in_db <= w[1].0 {
                return w[0].1 + segment_slope(w[0], w[1]) * (in_db - w[0].0);
            }
        }
        let last = self.points[self.points.len() - 1];
        last.1 + (in_db - last.0)
    }

    pub fn output_db(&self, in_db: f64) -> f64 {
        if self.knee > 0.0 {
            let half = self.knee / 2.0;
            for (idx, &(px, py)) in self.points.iter().enumerate() {
                let offset = in_db - px;
                if offset.abs() < half {
                    let s1 = self.slope_before(idx);
                    let s2 = self.slope_after(idx);
                    let t = offset + half;
                    return py + s1 * offset + (s2 - s1) * t * t / (2.0 * self.knee);
                }
            }
        }
        self.linear(in_db)
    }
}

fn segment_slope(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.1 - a.1) / (b.0 - a.0)
}
