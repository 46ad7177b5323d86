//! Checkpoint stack: one label per open candidate attempt.

/// Labels of the candidate attempts currently open on the search path,
/// oldest first. A frame's depth is its index here and is the only thing a
/// backjump needs to name its target.
#[derive(Debug, Default)]
pub struct CheckpointStack {
    labels: Vec<String>,
}

impl CheckpointStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame labeled `label` and return its depth.
    pub fn push(&mut self, label: &str) -> usize {
        self.labels.push(label.to_string());
        self.labels.len() - 1
    }

    /// Close the frame at `depth` and anything left above it.
    pub fn truncate(&mut self, depth: usize) {
        self.labels.truncate(depth);
    }

    /// Depth of the most recent frame labeled `label`.
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().rposition(|l| l == label)
    }

    /// Depth of the most recent frame whose label is one of `labels`.
    pub fn nearest_of(&self, labels: &[String]) -> Option<usize> {
        self.labels.iter().rposition(|l| labels.contains(l))
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
