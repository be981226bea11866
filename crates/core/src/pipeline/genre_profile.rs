//! Static genre -> processing recipe table.

use std::sync::OnceLock;

use crate::audio::domain::genre::Genre;
use crate::dynamics::infrastructure::reverb::HALL_TAPS;
use crate::filtering::domain::filter_spec::{CompressorParams, FilterChainSpec, FilterKind, Tap};
use crate::shared::error::EngineError;
use crate::temporal::infrastructure::swing::DEFAULT_SWING_RATIO;

use super::stage_op::{Branch, StageOp};

/// Fraction of Nyquist above which a built-in filter has nothing left to
/// act on and is dropped for that sample rate.
const BAND_LIMIT: f64 = 0.95;

/// Filter chain plus the ordered post-filter stages for one genre.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreProfile {
    pub genre: Genre,
    pub filter_chain: FilterChainSpec,
    pub stages: Vec<StageOp>,
}

impl GenreProfile {
    /// The process-wide profile for `genre`, built once on first access.
    pub fn for_genre(genre: Genre) -> &'static GenreProfile {
        static PROFILES: OnceLock<Vec<GenreProfile>> = OnceLock::new();
        let profiles = PROFILES.get_or_init(|| Genre::ALL.iter().map(|&g| build(g)).collect());
        // ALL lists every variant, so the lookup cannot miss
        &profiles[Genre::ALL.iter().position(|&g| g == genre).unwrap_or(0)]
    }

    /// The filter chain restricted to what `sample_rate` can represent:
    /// low-pass, EQ and high-pass filters centred at or above 95% of
    /// Nyquist are dropped.
    pub fn filter_chain_for(&self, sample_rate: u32) -> FilterChainSpec {
        let limit = sample_rate as f64 / 2.0 * BAND_LIMIT;
        let filters = self
            .filter_chain
            .filters()
            .iter()
            .filter(|f| {
                let keep = match f {
                    FilterKind::Lowpass { cutoff_hz } | FilterKind::Highpass { cutoff_hz } => {
                        *cutoff_hz < limit
                    }
                    FilterKind::EqBand { center_hz, .. } => *center_hz < limit,
                    _ => true,
                };
                if !keep {
                    log::debug!(
                        "{}: dropping {} above {limit:.0} Hz at {sample_rate} Hz",
                        self.genre,
                        f.name()
                    );
                }
                keep
            })
            .cloned()
            .collect();
        FilterChainSpec::new(filters)
    }

    /// Validate the band-limited chain and every stage.
    pub fn validate(&self, sample_rate: u32) -> Result<(), EngineError> {
        self.filter_chain_for(sample_rate).validate(sample_rate)?;
        self.stages.iter().try_for_each(StageOp::validate)
    }
}

fn eq(center_hz: f64, width_octaves: f64, gain_db: f64) -> FilterKind {
    FilterKind::EqBand {
        center_hz,
        width_octaves,
        gain_db,
    }
}

fn echo(taps: &[(f64, f32)]) -> FilterKind {
    FilterKind::MultiTapEcho(taps.iter().map(|&(d, a)| Tap::new(d, a)).collect())
}

fn build(genre: Genre) -> GenreProfile {
    let (filters, stages) = match genre {
        Genre::Rock => (
            vec![
                FilterKind::Compressor(CompressorParams {
                    attack: 0.0,
                    decay: 0.1,
                    points: vec![(-90.0, -60.0), (-40.0, -10.0), (0.0, -3.0)],
                    soft_knee_db: 6.0,
                }),
                FilterKind::Highpass { cutoff_hz: 40.0 },
                FilterKind::Lowpass { cutoff_hz: 14000.0 },
                eq(800.0, 2.0, 8.0),
                eq(1400.0, 2.0, 12.0),
                eq(4000.0, 2.0, 9.0),
                FilterKind::Gain(3.0),
            ],
            vec![StageOp::Mix(vec![
                Branch::new(
                    0.7,
                    vec![
                        StageOp::Harmonic { margin: 1.0 },
                        StageOp::Clip {
                            drive: 2.0,
                            ceiling: 1.0,
                        },
                    ],
                ),
                Branch::dry(0.5),
            ])],
        ),
        Genre::Electronic => (
            vec![
                echo(&[(0.06, 0.7), (0.09, 0.6), (0.12, 0.5)]),
                FilterKind::Lowpass { cutoff_hz: 15000.0 },
                FilterKind::Highpass { cutoff_hz: 50.0 },
                eq(5000.0, 2.0, 8.0),
                FilterKind::Gain(2.0),
            ],
            vec![
                StageOp::Mix(vec![
                    Branch::new(
                        0.5,
                        vec![StageOp::Wobble {
                            rate_hz: 4.0,
                            depth: 0.5,
                            boost: 2.0,
                        }],
                    ),
                    Branch::new(0.5, vec![StageOp::Harmonic { margin: 1.0 }]),
                ]),
                StageOp::Mix(vec![
                    Branch::dry(0.7),
                    Branch::new(
                        0.3,
                        vec![StageOp::SlapDelay {
                            delay: 0.05,
                            level: 0.4,
                        }],
                    ),
                ]),
                StageOp::TimeStretch { rate: 1.05 },
            ],
        ),
        Genre::Hiphop => (
            vec![
                eq(60.0, 2.0, 12.0),
                eq(100.0, 2.0, 10.0),
                eq(150.0, 1.0, 8.0),
                FilterKind::Compressor(CompressorParams {
                    attack: 0.0,
                    decay: 0.1,
                    points: vec![(-70.0, -70.0), (-60.0, -20.0), (1.0, 0.0)],
                    soft_knee_db: 0.01,
                }),
                FilterKind::Gain(1.8),
            ],
            vec![
                StageOp::Mix(vec![
                    Branch::new(
                        0.7,
                        vec![
                            StageOp::TimeStretch { rate: 0.95 },
                            StageOp::PitchShift { semitones: -2.0 },
                        ],
                    ),
                    Branch::new(
                        0.5,
                        vec![
                            StageOp::Percussive { margin: 8.0 },
                            StageOp::Clip {
                                drive: 2.0,
                                ceiling: 1.0,
                            },
                        ],
                    ),
                ]),
                StageOp::BandGain {
                    low_hz: 0.0,
                    high_hz: 150.0,
                    gain: 1.3,
                },
            ],
        ),
        Genre::Classical => (
            vec![
                echo(&[(1.0, 0.6), (1.8, 0.5), (2.6, 0.4)]),
                FilterKind::Highpass { cutoff_hz: 30.0 },
                FilterKind::Lowpass { cutoff_hz: 16000.0 },
                eq(700.0, 2.0, 4.0),
                FilterKind::Gain(1.6),
            ],
            vec![
                StageOp::Harmonic { margin: 8.0 },
                StageOp::Reverb(HALL_TAPS.to_vec()),
                StageOp::TimeStretch { rate: 0.93 },
                StageOp::Expand,
            ],
        ),
        Genre::Country => (
            vec![
                eq(2000.0, 2.0, 6.0),
                eq(4000.0, 2.0, 4.0),
                eq(6000.0, 2.0, 5.0),
                echo(&[(0.02, 0.3), (0.04, 0.2)]),
                FilterKind::Gain(1.5),
            ],
            vec![StageOp::Mix(vec![
                Branch::new(
                    0.7,
                    vec![StageOp::BandGain {
                        low_hz: 2000.0,
                        high_hz: 5000.0,
                        gain: 1.8,
                    }],
                ),
                Branch::new(
                    0.3,
                    vec![StageOp::Percussive { margin: 1.0 }, StageOp::Gain(1.3)],
                ),
            ])],
        ),
        Genre::Jazz => (
            vec![
                eq(300.0, 2.0, 6.0),
                eq(1000.0, 2.0, 4.0),
                eq(3000.0, 2.0, -2.0),
                echo(&[(0.02, 0.4), (0.04, 0.3)]),
                FilterKind::Gain(1.7),
            ],
            vec![StageOp::Mix(vec![
                Branch::new(
                    0.6,
                    vec![StageOp::Swing {
                        ratio: DEFAULT_SWING_RATIO,
                    }],
                ),
                Branch::new(0.6, vec![StageOp::Harmonic { margin: 5.0 }]),
            ])],
        ),
        Genre::Reggae => (
            vec![
                eq(60.0, 2.0, 8.0),
                eq(100.0, 2.0, 6.0),
                echo(&[(0.08, 0.5), (0.12, 0.4)]),
                FilterKind::Gain(1.6),
            ],
            vec![
                StageOp::BandGain {
                    low_hz: 0.0,
                    high_hz: 150.0,
                    gain: 1.5,
                },
                StageOp::TimeStretch { rate: 0.95 },
                StageOp::Compress {
                    threshold: 0.5,
                    ratio: 4.0,
                },
            ],
        ),
    };
    GenreProfile {
        genre,
        filter_chain: FilterChainSpec::new(filters),
        stages,
    }
}
