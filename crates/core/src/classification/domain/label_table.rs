use crate::shared::constants::DEFAULT_CLASSIFIER_LABELS;

/// Ordered, read-only mapping from classifier output index to label.
///
/// Fixed when the model is trained; membership need not match the set of
/// transformation genres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CLASSIFIER_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelTable {
    /// `None` if `labels` is empty.
    pub fn new(labels: Vec<String>) -> Option<Self> {
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
