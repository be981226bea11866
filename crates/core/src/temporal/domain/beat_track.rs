/// Estimated tempo and beat positions of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    pub tempo_bpm: f64,
    /// Beat positions as STFT frame indices, strictly increasing.
    pub beat_frames: Vec<usize>,
    pub hop_length: usize,
}

impl BeatTrack {
    pub fn empty(hop_length: usize) -> Self {
        Self {
            tempo_bpm: 0.0,
            beat_frames: Vec::new(),
            hop_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.beat_frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.beat_frames.len()
    }

    /// Frame `f` is centred on sample `f * hop`.
    pub fn beat_samples(&self) -> Vec<usize> {
        self.beat_frames.iter().map(|&f| f * self.hop_length).collect()
    }

    pub fn beat_times(&self, sample_rate: u32) -> Vec<f64> {
        self.beat_samples()
            .into_iter()
            .map(|s| s as f64 / sample_rate as f64)
            .collect()
    }

    /// Average beat length in samples implied by the tempo.
    pub fn beat_period_samples(&self, sample_rate: u32) -> Option<usize> {
        if self.tempo_bpm > 0.0 {
            Some((sample_rate as f64 * 60.0 / self.tempo_bpm) as usize)
        } else {
            None
        }
    }
}
