use crate::shared::error::EngineError;

/// A mono recording: samples in roughly [-1.0, 1.0] plus their sample rate.
///
/// Stages never mutate a signal they are handed; they build a new one with
/// [`AudioSignal::with_samples`], which keeps the sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    /// # Panics
    ///
    /// Panics if `sample_rate` is zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn try_new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::invalid("signal", "sample rate must be positive"));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn sample_index_at_time(&self, time: f64) -> usize {
        (time * self.sample_rate as f64) as usize
    }

    /// New signal at the same sample rate.
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// True for zero-length input or input whose every sample is zero.
    pub fn is_silent(&self) -> bool {
        self.peak() == 0.0
    }

    /// Copy truncated or zero-padded to exactly `len` samples.
    pub fn fit_to_length(&self, len: usize) -> Self {
        self.with_samples(fit_length(&self.samples, len))
    }

    /// Fail with `SignalProcessingFailure` if any sample is NaN or infinite.
    pub fn ensure_finite(&self, stage: &str) -> Result<(), EngineError> {
        match self.samples.iter().position(|s| !s.is_finite()) {
            Some(i) => Err(EngineError::stage_failure(
                stage,
                format!("non-finite sample {} at index {i}", self.samples[i]),
            )),
            None => Ok(()),
        }
    }
}

/// Truncate or zero-pad `samples` to `len`.
pub fn fit_length(samples: &[f32], len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&samples[..samples.len().min(len)]);
    out.resize(len, 0.0);
    out
}
