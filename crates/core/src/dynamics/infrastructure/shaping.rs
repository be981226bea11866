use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::EngineError;

/// Hard-knee compression on sample magnitude: above `threshold` the excess
/// is divided by `ratio`. Sign is preserved.
pub fn hard_knee_compress(
    signal: &AudioSignal,
    threshold: f32,
    ratio: f32,
) -> Result<AudioSignal, EngineError> {
    validate_compress(threshold, ratio)?;
    Ok(signal.with_samples(
        signal
            .samples()
            .iter()
            .map(|&s| {
                let mag = s.abs();
                if mag > threshold {
                    s.signum() * (threshold + (mag - threshold) / ratio)
                } else {
                    s
                }
            })
            .collect(),
    ))
}

/// Drive into a hard clipper at `±ceiling`.
pub fn clip(signal: &AudioSignal, drive: f32, ceiling: f32) -> Result<AudioSignal, EngineError> {
    validate_clip(drive, ceiling)?;
    Ok(signal.with_samples(
        signal
            .samples()
            .iter()
            .map(|&s| (s * drive).clamp(-ceiling, ceiling))
            .collect(),
    ))
}

pub fn gain(signal: &AudioSignal, factor: f32) -> Result<AudioSignal, EngineError> {
    validate_gain(factor)?;
    Ok(signal.with_samples(signal.samples().iter().map(|s| s * factor).collect()))
}

pub(crate) fn validate_compress(threshold: f32, ratio: f32) -> Result<(), EngineError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(EngineError::invalid(
            "compress",
            format!("threshold must be positive, got {threshold}"),
        ));
    }
    if !ratio.is_finite() || ratio < 1.0 {
        return Err(EngineError::invalid(
            "compress",
            format!("ratio must be >= 1, got {ratio}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_clip(drive: f32, ceiling: f32) -> Result<(), EngineError> {
    if !drive.is_finite() || drive <= 0.0 {
        return Err(EngineError::invalid(
            "clip",
            format!("drive must be positive, got {drive}"),
        ));
    }
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return Err(EngineError::invalid(
            "clip",
            format!("ceiling must be positive, got {ceiling}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_gain(factor: f32) -> Result<(), EngineError> {
    if !factor.is_finite() {
        return Err(EngineError::invalid("gain", "factor must be finite"));
    }
    Ok(())
}
