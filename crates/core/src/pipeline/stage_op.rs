//! Post-filter processing stages a genre profile is built from.

use crate::audio::domain::audio_signal::{fit_length, AudioSignal};
use crate::dynamics::infrastructure::expansion::rms_expand;
use crate::dynamics::infrastructure::reverb::{reverb, slap_delay};
use crate::dynamics::infrastructure::shaping::{
    clip, gain, hard_knee_compress, validate_clip, validate_compress, validate_gain,
};
use crate::filtering::domain::filter_spec::{validate_taps, Tap};
use crate::shared::error::EngineError;
use crate::spectral::infrastructure::hpss::{Component, HarmonicPercussiveSeparator};
use crate::spectral::infrastructure::spectral_ops::{
    band_gain, validate_band, validate_wobble, wobble,
};
use crate::spectral::infrastructure::stft::Stft;
use crate::temporal::infrastructure::pitch_shift::PitchShifter;
use crate::temporal::infrastructure::swing::SwingWarp;
use crate::temporal::infrastructure::time_stretch::{time_stretch, validate_rate};

/// Shared analysis settings for one transform invocation.
pub struct StageContext {
    pub stft: Stft,
}

impl StageContext {
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            stft: Stft::new(frame_length, hop_length),
        }
    }
}

impl Default for StageContext {
    fn default() -> Self {
        Self {
            stft: Stft::default(),
        }
    }
}

/// One weighted path of a [`StageOp::Mix`].
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub weight: f32,
    pub ops: Vec<StageOp>,
}

impl Branch {
    pub fn new(weight: f32, ops: Vec<StageOp>) -> Self {
        Self { weight, ops }
    }

    /// The unprocessed input at `weight`.
    pub fn dry(weight: f32) -> Self {
        Self::new(weight, Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOp {
    /// Scale STFT bins in `[low_hz, high_hz)`.
    BandGain { low_hz: f64, high_hz: f64, gain: f32 },
    Wobble { rate_hz: f64, depth: f64, boost: f32 },
    Harmonic { margin: f32 },
    Percussive { margin: f32 },
    /// `rate > 1` shortens.
    TimeStretch { rate: f64 },
    PitchShift { semitones: f64 },
    /// Odd beats stretched to `ratio` of their span.
    Swing { ratio: f64 },
    Reverb(Vec<Tap>),
    SlapDelay { delay: f64, level: f32 },
    /// RMS-driven dynamic expansion.
    Expand,
    Compress { threshold: f32, ratio: f32 },
    Clip { drive: f32, ceiling: f32 },
    Gain(f32),
    /// Run each branch on the same input and sum them by weight. The first
    /// branch sets the output length; later ones are padded or cut to it.
    Mix(Vec<Branch>),
}

impl StageOp {
    pub fn name(&self) -> &'static str {
        match self {
            StageOp::BandGain { .. } => "band_gain",
            StageOp::Wobble { .. } => "wobble",
            StageOp::Harmonic { .. } => "harmonic",
            StageOp::Percussive { .. } => "percussive",
            StageOp::TimeStretch { .. } => "time_stretch",
            StageOp::PitchShift { .. } => "pitch_shift",
            StageOp::Swing { .. } => "swing",
            StageOp::Reverb(_) => "reverb",
            StageOp::SlapDelay { .. } => "slap_delay",
            StageOp::Expand => "expand",
            StageOp::Compress { .. } => "compress",
            StageOp::Clip { .. } => "clip",
            StageOp::Gain(_) => "gain",
            StageOp::Mix(_) => "mix",
        }
    }

    /// Check every parameter without touching a signal.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            StageOp::BandGain {
                low_hz,
                high_hz,
                gain,
            } => validate_band(*low_hz, *high_hz, *gain),
            StageOp::Wobble {
                rate_hz,
                depth,
                boost,
            } => validate_wobble(*rate_hz, *depth, *boost),
            StageOp::Harmonic { margin } | StageOp::Percussive { margin } => {
                HarmonicPercussiveSeparator::new(*margin).map(|_| ())
            }
            StageOp::TimeStretch { rate } => validate_rate(*rate),
            StageOp::PitchShift { semitones } => PitchShifter::new(*semitones).map(|_| ()),
            StageOp::Swing { ratio } => SwingWarp::new(*ratio).map(|_| ()),
            StageOp::Reverb(taps) => validate_taps("reverb", taps),
            StageOp::SlapDelay { delay, level } => {
                validate_taps("slap_delay", &[Tap::new(*delay, *level)])
            }
            StageOp::Expand => Ok(()),
            StageOp::Compress { threshold, ratio } => validate_compress(*threshold, *ratio),
            StageOp::Clip { drive, ceiling } => validate_clip(*drive, *ceiling),
            StageOp::Gain(factor) => validate_gain(*factor),
            StageOp::Mix(branches) => {
                if branches.is_empty() {
                    return Err(EngineError::invalid("mix", "no branches"));
                }
                for branch in branches {
                    if !branch.weight.is_finite() {
                        return Err(EngineError::invalid("mix", "branch weight must be finite"));
                    }
                    for op in &branch.ops {
                        op.validate()?;
                    }
                }
                Ok(())
            }
        }
    }

    pub fn apply(&self, signal: &AudioSignal, ctx: &StageContext) -> Result<AudioSignal, EngineError> {
        let stft = &ctx.stft;
        match self {
            StageOp::BandGain {
                low_hz,
                high_hz,
                gain,
            } => band_gain(signal, *low_hz, *high_hz, *gain, stft),
            StageOp::Wobble {
                rate_hz,
                depth,
                boost,
            } => wobble(signal, *rate_hz, *depth, *boost, stft),
            StageOp::Harmonic { margin } => Ok(HarmonicPercussiveSeparator::new(*margin)?
                .extract(signal, Component::Harmonic, stft)),
            StageOp::Percussive { margin } => Ok(HarmonicPercussiveSeparator::new(*margin)?
                .extract(signal, Component::Percussive, stft)),
            StageOp::TimeStretch { rate } => time_stretch(signal, *rate, stft),
            StageOp::PitchShift { semitones } => Ok(PitchShifter::new(*semitones)?.shift(signal, stft)),
            StageOp::Swing { ratio } => SwingWarp::new(*ratio)?.apply(signal, stft),
            StageOp::Reverb(taps) => reverb(signal, taps),
            StageOp::SlapDelay { delay, level } => slap_delay(signal, *delay, *level),
            StageOp::Expand => Ok(rms_expand(signal, stft.frame_length(), stft.hop_length())),
            StageOp::Compress { threshold, ratio } => hard_knee_compress(signal, *threshold, *ratio),
            StageOp::Clip { drive, ceiling } => clip(signal, *drive, *ceiling),
            StageOp::Gain(factor) => gain(signal, *factor),
            StageOp::Mix(branches) => mix(signal, branches, ctx),
        }
    }
}

fn mix(signal: &AudioSignal, branches: &[Branch], ctx: &StageContext) -> Result<AudioSignal, EngineError> {
    let (lead, rest) = branches
        .split_first()
        .ok_or_else(|| EngineError::invalid("mix", "no branches"))?;
    let mut acc: Vec<f32> = run_branch(signal, lead, ctx)?
        .samples()
        .iter()
        .map(|s| s * lead.weight)
        .collect();
    for branch in rest {
        let out = run_branch(signal, branch, ctx)?;
        let fitted = fit_length(out.samples(), acc.len());
        acc.iter_mut()
            .zip(fitted)
            .for_each(|(a, s)| *a += s * branch.weight);
    }
    Ok(signal.with_samples(acc))
}

fn run_branch(signal: &AudioSignal, branch: &Branch, ctx: &StageContext) -> Result<AudioSignal, EngineError> {
    let mut current = signal.clone();
    for op in &branch.ops {
        current = op.apply(&current, ctx)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn ramp(len: usize) -> AudioSignal {
        AudioSignal::new((0..len).map(|i| i as f32 / len as f32).collect(), 8000)
    }

    #[test]
    fn test_mix_weights_branches() {
        let op = StageOp::Mix(vec![
            Branch::dry(0.5),
            Branch::new(0.25, vec![StageOp::Gain(2.0)]),
        ]);
        let signal = ramp(10);
        let out = op.apply(&signal, &StageContext::default()).unwrap();
        for (o, s) in out.samples().iter().zip(signal.samples()) {
            assert_abs_diff_eq!(*o, s * 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mix_lead_branch_sets_length() {
        let ctx = StageContext::default();
        let signal = AudioSignal::new(vec![0.5; 8000], 8000);
        let longer = StageOp::Mix(vec![
            Branch::new(1.0, vec![StageOp::TimeStretch { rate: 0.8 }]),
            Branch::dry(1.0),
        ]);
        assert_eq!(longer.apply(&signal, &ctx).unwrap().len(), 10000);

        let shorter = StageOp::Mix(vec![
            Branch::dry(1.0),
            Branch::new(1.0, vec![StageOp::TimeStretch { rate: 0.8 }]),
        ]);
        assert_eq!(shorter.apply(&signal, &ctx).unwrap().len(), 8000);
    }

    #[test]
    fn test_nested_ops_run_in_order() {
        let op = StageOp::Mix(vec![Branch::new(
            1.0,
            vec![
                StageOp::Gain(4.0),
                StageOp::Clip {
                    drive: 1.0,
                    ceiling: 1.0,
                },
            ],
        )]);
        let out = op
            .apply(&AudioSignal::new(vec![0.1, 0.5], 8000), &StageContext::default())
            .unwrap();
        assert_eq!(out.samples(), &[0.4, 1.0]);
    }

    #[rstest]
    #[case(StageOp::TimeStretch { rate: 0.0 }, "time_stretch")]
    #[case(StageOp::TimeStretch { rate: 1e-9 }, "time_stretch")]
    #[case(StageOp::TimeStretch { rate: 1000.0 }, "time_stretch")]
    #[case(StageOp::TimeStretch { rate: f64::NAN }, "time_stretch")]
    #[case(StageOp::Swing { ratio: 1e-6 }, "swing")]
    #[case(StageOp::Harmonic { margin: 0.5 }, "hpss")]
    #[case(StageOp::Reverb(vec![]), "reverb")]
    #[case(StageOp::Compress { threshold: 0.5, ratio: 0.5 }, "compress")]
    #[case(StageOp::Mix(vec![]), "mix")]
    #[case(StageOp::Mix(vec![Branch::new(1.0, vec![StageOp::Gain(f32::NAN)])]), "gain")]
    #[case(StageOp::Wobble { rate_hz: -1.0, depth: 0.5, boost: 2.0 }, "wobble")]
    fn test_validate_rejects(#[case] op: StageOp, #[case] filter: &str) {
        match op.validate() {
            Err(EngineError::InvalidFilterParameter { filter: f, .. }) => assert_eq!(f, filter),
            other => panic!("expected InvalidFilterParameter, got {other:?}"),
        }
    }

    #[rstest]
    #[case(StageOp::Expand)]
    #[case(StageOp::TimeStretch { rate: 0.01 })]
    #[case(StageOp::TimeStretch { rate: 100.0 })]
    #[case(StageOp::Swing { ratio: 0.92 })]
    #[case(StageOp::PitchShift { semitones: -2.0 })]
    #[case(StageOp::SlapDelay { delay: 0.05, level: 0.4 })]
    fn test_validate_accepts(#[case] op: StageOp) {
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_rate_preserved_by_every_op() {
        let ctx = StageContext::default();
        let signal = AudioSignal::new(
            (0..8000).map(|i| (i as f32 * 0.07).sin() * 0.5).collect(),
            8000,
        );
        let ops = [
            StageOp::BandGain { low_hz: 0.0, high_hz: 150.0, gain: 1.5 },
            StageOp::Percussive { margin: 2.0 },
            StageOp::PitchShift { semitones: 3.0 },
            StageOp::Expand,
            StageOp::Reverb(vec![Tap::new(0.01, 0.5)]),
        ];
        for op in &ops {
            let out = op.apply(&signal, &ctx).unwrap();
            assert_eq!(out.sample_rate(), 8000, "{}", op.name());
            assert_eq!(out.len(), 8000, "{}", op.name());
        }
    }
}
