use serde::{Deserialize, Serialize};

/// Bounding box for a face located within a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face encoding vector (dimensionality fixed by the extraction model,
/// typically 128 or 512).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f64>,
}

impl Encoding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another encoding.
    pub fn euclidean_distance(&self, other: &Encoding) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// A single enrolled (label, encoding) pair. Several entries may share a
/// label when an identity was enrolled more than once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledFace {
    pub label: String,
    pub encoding: Encoding,
}

/// Ordered, immutable collection of enrolled faces for one session.
/// All encodings share the same dimensionality.
#[derive(Debug, Clone)]
pub struct ModelSet {
    faces: Vec<EnrolledFace>,
    dim: usize,
}

impl ModelSet {
    /// Build a model set from enrolled faces. Callers must have validated
    /// dimensional consistency; the store enforces it at load time.
    pub fn new(faces: Vec<EnrolledFace>) -> Self {
        let dim = faces.first().map(|f| f.encoding.dim()).unwrap_or(0);
        Self { faces, dim }
    }

    pub fn faces(&self) -> &[EnrolledFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Encoding dimensionality, or 0 when empty.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// A face observed in a live frame: where it was, and its encoding.
#[derive(Debug, Clone)]
pub struct FaceObservation {
    pub region: Region,
    pub encoding: Encoding,
}

/// One row of the per-enrollment score table.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub label: String,
    pub distance: f64,
    pub score: f64,
    pub matched: bool,
}

/// Result of scoring one live encoding against every enrolled face.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// Score table, in enrollment order.
    pub candidates: Vec<Candidate>,
    /// Index into `candidates` of the first global-minimum-distance entry.
    pub best: usize,
    /// Whether the best candidate cleared the certainty threshold.
    pub accepted: bool,
    /// On reject: the certainty value that would have accepted, advisory only.
    pub suggested_certainty: Option<f64>,
}

impl MatchResult {
    pub fn best_candidate(&self) -> &Candidate {
        &self.candidates[self.best]
    }
}

/// Terminal outcome of an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
    /// No usable face was ever observed. Distinct from `Reject`, which means
    /// a face was seen but did not match.
    Inconclusive,
}

/// Structured session outcome, intended for CLI/logging layers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub decision: Decision,
    /// Score details; `None` when the session was inconclusive.
    pub result: Option<MatchResult>,
    /// Capture attempts consumed.
    pub attempts: u32,
}

impl SessionReport {
    /// Label of the accepted identity, if the session accepted.
    pub fn winning_label(&self) -> Option<&str> {
        if self.decision != Decision::Accept {
            return None;
        }
        self.result
            .as_ref()
            .map(|r| r.best_candidate().label.as_str())
    }
}
