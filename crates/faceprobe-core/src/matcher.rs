//! Scoring and threshold policy — the trust decision of the probe.

use crate::types::{Candidate, Encoding, MatchResult, ModelSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    /// Defensive: the store guarantees a non-empty model set at load time.
    #[error("no enrolled faces to compare against")]
    NoEnrolledFaces,
    /// The live encoding and the enrolled models came from different
    /// extraction models; a distance between them is meaningless.
    #[error("probe encoding has dimensionality {probe}, enrolled models have {expected}")]
    DimensionMismatch { probe: usize, expected: usize },
}

/// Externally supplied scoring policy.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    /// Maximum acceptable normalized score for a positive match.
    pub certainty: f64,
    /// Distance-to-score multiplier.
    pub scale_factor: f64,
    /// Safety margin added to the best score when suggesting a certainty
    /// that would have accepted.
    pub suggestion_margin: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            certainty: 4.0,
            scale_factor: 10.0,
            suggestion_margin: 0.5,
        }
    }
}

/// Scores a live encoding against every enrolled face and applies the
/// accept/reject threshold.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Score `probe` against every face in `models`.
    ///
    /// The decision is accept iff the globally best (minimal-distance)
    /// candidate clears the certainty threshold; other candidates matching
    /// independently does not accept. Ties on distance resolve to the first
    /// enrolled face, keeping the outcome deterministic.
    pub fn score(&self, probe: &Encoding, models: &ModelSet) -> Result<MatchResult, MatchError> {
        if models.is_empty() {
            return Err(MatchError::NoEnrolledFaces);
        }
        if probe.dim() != models.dim() {
            return Err(MatchError::DimensionMismatch {
                probe: probe.dim(),
                expected: models.dim(),
            });
        }

        let mut candidates = Vec::with_capacity(models.len());
        let mut best = 0usize;
        let mut best_distance = f64::INFINITY;

        for (i, face) in models.faces().iter().enumerate() {
            let distance = probe.euclidean_distance(&face.encoding);
            let score = distance * self.policy.scale_factor;
            candidates.push(Candidate {
                label: face.label.clone(),
                distance,
                score,
                matched: score <= self.policy.certainty,
            });
            // strict less-than: first occurrence wins on equal distances
            if distance < best_distance {
                best_distance = distance;
                best = i;
            }
        }

        let accepted = candidates[best].matched;
        let suggested_certainty = if accepted {
            None
        } else {
            Some(candidates[best].score + self.policy.suggestion_margin)
        };

        tracing::debug!(
            best_label = %candidates[best].label,
            best_score = candidates[best].score,
            accepted,
            "scored probe against {} enrollment(s)",
            candidates.len()
        );

        Ok(MatchResult {
            candidates,
            best,
            accepted,
            suggested_certainty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnrolledFace;

    fn enrolled(label: &str, values: Vec<f64>) -> EnrolledFace {
        EnrolledFace {
            label: label.into(),
            encoding: Encoding::new(values),
        }
    }

    #[test]
    fn identical_encoding_accepts_with_zero_score() {
        let models = ModelSet::new(vec![enrolled("alice", vec![0.1, 0.2, 0.3])]);
        let probe = Encoding::new(vec![0.1, 0.2, 0.3]);

        let result = Matcher::default().score(&probe, &models).unwrap();
        assert!(result.accepted);
        assert_eq!(result.best_candidate().label, "alice");
        assert_eq!(result.best_candidate().distance, 0.0);
        assert_eq!(result.best_candidate().score, 0.0);
        assert_eq!(result.suggested_certainty, None);
    }

    #[test]
    fn distance_half_rejects_and_suggests() {
        // distance 0.5, scale 10 => score 5.0 > certainty 4.0
        let models = ModelSet::new(vec![enrolled("alice", vec![0.0, 0.0])]);
        let probe = Encoding::new(vec![0.3, 0.4]);

        let result = Matcher::default().score(&probe, &models).unwrap();
        assert!(!result.accepted);
        let best = result.best_candidate();
        assert!((best.distance - 0.5).abs() < 1e-12);
        assert!((best.score - 5.0).abs() < 1e-12);
        let suggested = result.suggested_certainty.unwrap();
        assert!((suggested - 5.5).abs() < 1e-12);
    }

    #[test]
    fn best_candidate_has_minimal_distance() {
        let models = ModelSet::new(vec![
            enrolled("far", vec![10.0, 0.0]),
            enrolled("near", vec![1.0, 0.0]),
            enrolled("farther", vec![20.0, 0.0]),
        ]);
        let probe = Encoding::new(vec![0.0, 0.0]);

        let result = Matcher::default().score(&probe, &models).unwrap();
        let best = result.best_candidate();
        assert_eq!(best.label, "near");
        for candidate in &result.candidates {
            assert!(best.distance <= candidate.distance);
        }
    }

    #[test]
    fn ties_resolve_to_first_enrolled_face() {
        let models = ModelSet::new(vec![
            enrolled("first", vec![1.0, 0.0]),
            enrolled("second", vec![-1.0, 0.0]),
        ]);
        let probe = Encoding::new(vec![0.0, 0.0]);

        let result = Matcher::default().score(&probe, &models).unwrap();
        assert_eq!(result.best, 0);
        assert_eq!(result.best_candidate().label, "first");
    }

    #[test]
    fn global_best_decides_not_per_label_vote() {
        // "other" matches the threshold on its own, but the global best
        // ("impostor", distance 0) decides the outcome.
        let policy = MatchPolicy {
            certainty: 4.0,
            ..MatchPolicy::default()
        };
        let models = ModelSet::new(vec![
            enrolled("other", vec![0.2, 0.0]),
            enrolled("impostor", vec![0.0, 0.0]),
        ]);
        let probe = Encoding::new(vec![0.0, 0.0]);

        let result = Matcher::new(policy).score(&probe, &models).unwrap();
        assert!(result.candidates[0].matched);
        assert_eq!(result.best_candidate().label, "impostor");
        assert!(result.accepted);
    }

    #[test]
    fn score_is_exactly_distance_times_scale() {
        let models = ModelSet::new(vec![
            enrolled("a", vec![0.0, 0.0]),
            enrolled("b", vec![3.0, 4.0]),
        ]);
        let probe = Encoding::new(vec![0.0, 3.0]);
        let matcher = Matcher::default();
        let result = matcher.score(&probe, &models).unwrap();

        for candidate in &result.candidates {
            let recovered = candidate.score / matcher.policy().scale_factor;
            assert!((recovered - candidate.distance).abs() < 1e-12);
        }
    }

    #[test]
    fn lowering_certainty_never_turns_reject_into_accept() {
        let models = ModelSet::new(vec![enrolled("alice", vec![0.0, 0.0])]);
        let probe = Encoding::new(vec![0.3, 0.4]); // score 5.0

        let mut prev_accepted = true;
        for certainty in [6.0, 5.0, 4.9, 4.0, 1.0, 0.0] {
            let matcher = Matcher::new(MatchPolicy {
                certainty,
                ..MatchPolicy::default()
            });
            let accepted = matcher.score(&probe, &models).unwrap().accepted;
            assert!(
                prev_accepted || !accepted,
                "accept reappeared at certainty {certainty}"
            );
            prev_accepted = accepted;
        }
    }

    #[test]
    fn mismatched_probe_dimension_is_an_error() {
        // A 2-d probe against a 3-d gallery must not silently truncate:
        // the dropped third component would otherwise make this an accept.
        let models = ModelSet::new(vec![enrolled("alice", vec![0.0, 0.0, 100.0])]);
        let probe = Encoding::new(vec![0.0, 0.0]);

        let err = Matcher::default().score(&probe, &models).unwrap_err();
        match err {
            MatchError::DimensionMismatch { probe, expected } => {
                assert_eq!(probe, 2);
                assert_eq!(expected, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_model_set_is_an_error() {
        let models = ModelSet::new(vec![]);
        let probe = Encoding::new(vec![0.0]);
        let err = Matcher::default().score(&probe, &models).unwrap_err();
        assert!(matches!(err, MatchError::NoEnrolledFaces));
    }
}
