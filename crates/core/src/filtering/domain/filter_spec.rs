use crate::shared::error::EngineError;

/// One echo/reflection: a copy delayed by `delay` seconds, scaled by `decay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub delay: f64,
    pub decay: f32,
}

impl Tap {
    pub const fn new(delay: f64, decay: f32) -> Self {
        Self { delay, decay }
    }
}

/// Soft-knee compander settings.
///
/// `points` is the transfer curve as `(input_db, output_db)` pairs in
/// strictly increasing input order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressorParams {
    pub attack: f64,
    pub decay: f64,
    pub points: Vec<(f64, f64)>,
    pub soft_knee_db: f64,
}

/// The fixed set of filters a chain may contain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Gain(f32),
    EqBand {
        center_hz: f64,
        width_octaves: f64,
        gain_db: f64,
    },
    Highpass {
        cutoff_hz: f64,
    },
    Lowpass {
        cutoff_hz: f64,
    },
    Compressor(CompressorParams),
    MultiTapEcho(Vec<Tap>),
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Gain(_) => "gain",
            FilterKind::EqBand { .. } => "equalizer",
            FilterKind::Highpass { .. } => "highpass",
            FilterKind::Lowpass { .. } => "lowpass",
            FilterKind::Compressor(_) => "compressor",
            FilterKind::MultiTapEcho(_) => "echo",
        }
    }

    /// Check every parameter against its domain for the given sample rate.
    pub fn validate(&self, sample_rate: u32) -> Result<(), EngineError> {
        let name = self.name();
        let nyquist = sample_rate as f64 / 2.0;
        match self {
            FilterKind::Gain(g) => {
                if !g.is_finite() {
                    return Err(EngineError::invalid(name, format!("gain {g} is not finite")));
                }
            }
            FilterKind::EqBand {
                center_hz,
                width_octaves,
                gain_db,
            } => {
                check_frequency(name, "center", *center_hz, nyquist)?;
                if !(width_octaves.is_finite() && *width_octaves > 0.0) {
                    return Err(EngineError::invalid(
                        name,
                        format!("bandwidth {width_octaves} octaves must be positive"),
                    ));
                }
                if !gain_db.is_finite() {
                    return Err(EngineError::invalid(
                        name,
                        format!("gain {gain_db} dB is not finite"),
                    ));
                }
            }
            FilterKind::Highpass { cutoff_hz } | FilterKind::Lowpass { cutoff_hz } => {
                check_frequency(name, "cutoff", *cutoff_hz, nyquist)?;
            }
            FilterKind::Compressor(params) => validate_compressor(params)?,
            FilterKind::MultiTapEcho(taps) => validate_taps(name, taps)?,
        }
        Ok(())
    }
}

fn check_frequency(
    filter: &'static str,
    what: &str,
    hz: f64,
    nyquist: f64,
) -> Result<(), EngineError> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(EngineError::invalid(
            filter,
            format!("{what} {hz} Hz must be positive"),
        ));
    }
    if hz >= nyquist {
        return Err(EngineError::invalid(
            filter,
            format!("{what} {hz} Hz >= nyquist {nyquist} Hz"),
        ));
    }
    Ok(())
}

fn validate_compressor(params: &CompressorParams) -> Result<(), EngineError> {
    let name = "compressor";
    if !(params.attack.is_finite() && params.attack >= 0.0) {
        return Err(EngineError::invalid(name, format!("attack {} s", params.attack)));
    }
    if !(params.decay.is_finite() && params.decay >= 0.0) {
        return Err(EngineError::invalid(name, format!("decay {} s", params.decay)));
    }
    if !(params.soft_knee_db.is_finite() && params.soft_knee_db >= 0.0) {
        return Err(EngineError::invalid(
            name,
            format!("soft knee {} dB", params.soft_knee_db),
        ));
    }
    if params.points.is_empty() {
        return Err(EngineError::invalid(name, "transfer curve has no points"));
    }
    if params
        .points
        .iter()
        .any(|(i, o)| !i.is_finite() || !o.is_finite())
    {
        return Err(EngineError::invalid(name, "transfer curve point is not finite"));
    }
    if params.points.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(EngineError::invalid(
            name,
            "transfer curve inputs must be strictly increasing",
        ));
    }
    Ok(())
}

pub(crate) fn validate_taps(name: &'static str, taps: &[Tap]) -> Result<(), EngineError> {
    if taps.is_empty() {
        return Err(EngineError::invalid(name, "no taps"));
    }
    for tap in taps {
        if !(tap.delay.is_finite() && tap.delay > 0.0) {
            return Err(EngineError::invalid(
                name,
                format!("delay {} s must be positive", tap.delay),
            ));
        }
        if !tap.decay.is_finite() {
            return Err(EngineError::invalid(
                name,
                format!("decay {} is not finite", tap.decay),
            ));
        }
    }
    Ok(())
}

/// Ordered list of filters, applied strictly in sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChainSpec {
    filters: Vec<FilterKind>,
}

impl FilterChainSpec {
    pub fn new(filters: Vec<FilterKind>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Validate the whole chain. Called before any filter runs so a bad
    /// parameter late in the chain never leaves a half-processed signal.
    pub fn validate(&self, sample_rate: u32) -> Result<(), EngineError> {
        self.filters
            .iter()
            .try_for_each(|f| f.validate(sample_rate))
    }
}
