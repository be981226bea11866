use ndarray::Array4;

/// Domain interface for the genre network.
///
/// Takes an NCHW image tensor and returns one logit per label. Calls take
/// `&self` and may run concurrently.
pub trait GenreModel: Send + Sync {
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>>;

    /// Square input resolution the model expects, or `None` when the
    /// input shape is dynamic and the caller picks the size.
    fn input_size(&self) -> Option<u32>;
}
