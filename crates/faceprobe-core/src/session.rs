//! Authentication session — bounded retry orchestration over capture,
//! extraction, and matching.
//!
//! Transient conditions (failed read, dark frame, no face, no encodings,
//! extractor error) are absorbed inside the retry loop and only consume
//! attempts. Fatal conditions propagate immediately; the frame source is
//! released on every exit path.

use crate::extractor::{ExtractorError, FaceExtractor};
use crate::frame::Frame;
use crate::matcher::{MatchError, Matcher};
use crate::source::{CaptureFailure, FrameSource};
use crate::types::{Decision, FaceObservation, MatchResult, ModelSet, SessionReport};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Retry policy for one session. No retry state outlives a session.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Maximum capture attempts before giving up as inconclusive.
    pub max_attempts: u32,
    /// Pause between attempts, allowing lighting/pose to change.
    pub retry_delay: Duration,
    /// Minimum mean luminance (0–255) for a frame to be usable.
    pub min_brightness: f64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_millis(300),
            min_brightness: 30.0,
        }
    }
}

/// Why one attempt produced no match result.
enum AttemptMiss {
    Capture(CaptureFailure),
    NoFaceDetected,
    NoEncodings,
    Extractor(ExtractorError),
}

impl AttemptMiss {
    fn reason(&self) -> String {
        match self {
            AttemptMiss::Capture(err) => err.to_string(),
            AttemptMiss::NoFaceDetected => "no face detected".into(),
            AttemptMiss::NoEncodings => "face located but not encodable".into(),
            AttemptMiss::Extractor(err) => err.to_string(),
        }
    }
}

/// Orchestrates one authentication decision against a loaded model set.
pub struct AuthenticationSession {
    models: ModelSet,
    matcher: Matcher,
    policy: SessionPolicy,
}

impl AuthenticationSession {
    pub fn new(models: ModelSet, matcher: Matcher, policy: SessionPolicy) -> Self {
        Self {
            models,
            matcher,
            policy,
        }
    }

    /// Run the capture/evaluate loop to a terminal decision.
    ///
    /// `source.close()` is called exactly once, success or failure alike.
    pub fn run<S, E>(&self, source: &mut S, extractor: &mut E) -> Result<SessionReport, SessionError>
    where
        S: FrameSource,
        E: FaceExtractor,
    {
        let outcome = self.capture_loop(source, extractor);
        source.close();
        outcome
    }

    fn capture_loop<S, E>(
        &self,
        source: &mut S,
        extractor: &mut E,
    ) -> Result<SessionReport, SessionError>
    where
        S: FrameSource,
        E: FaceExtractor,
    {
        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(source, extractor)? {
                Some(result) => {
                    let decision = if result.accepted {
                        Decision::Accept
                    } else {
                        Decision::Reject
                    };
                    tracing::info!(
                        attempt,
                        ?decision,
                        best_label = %result.best_candidate().label,
                        best_score = result.best_candidate().score,
                        "session decided"
                    );
                    return Ok(SessionReport {
                        decision,
                        result: Some(result),
                        attempts: attempt,
                    });
                }
                None => {
                    if attempt < self.policy.max_attempts {
                        std::thread::sleep(self.policy.retry_delay);
                    }
                }
            }
        }

        tracing::warn!(
            attempts = self.policy.max_attempts,
            "no usable face observed; session inconclusive"
        );
        Ok(SessionReport {
            decision: Decision::Inconclusive,
            result: None,
            attempts: self.policy.max_attempts,
        })
    }

    /// One capture attempt. `Ok(None)` is a transient miss; `Ok(Some)` ends
    /// the loop with the frame's final match result.
    fn attempt<S, E>(
        &self,
        source: &mut S,
        extractor: &mut E,
    ) -> Result<Option<MatchResult>, SessionError>
    where
        S: FrameSource,
        E: FaceExtractor,
    {
        match self.observe(source, extractor) {
            Ok(observations) => {
                // Multiple faces in one frame are scored in order; the last
                // result becomes the attempt's outcome.
                let mut last = None;
                for observation in &observations {
                    let result = self.matcher.score(&observation.encoding, &self.models)?;
                    last = Some(result);
                }
                Ok(last)
            }
            Err(miss) => {
                tracing::debug!(reason = %miss.reason(), "attempt produced no result");
                Ok(None)
            }
        }
    }

    /// Capture one frame and extract the faces observed in it.
    fn observe<S, E>(
        &self,
        source: &mut S,
        extractor: &mut E,
    ) -> Result<Vec<FaceObservation>, AttemptMiss>
    where
        S: FrameSource,
        E: FaceExtractor,
    {
        let frame = source.read().map_err(AttemptMiss::Capture)?;

        let luminance = frame.mean_luminance();
        if luminance < self.policy.min_brightness {
            return Err(AttemptMiss::Capture(CaptureFailure::TooDark { luminance }));
        }

        let rgb: Frame = frame.into_rgb();

        let regions = extractor.locate(&rgb).map_err(AttemptMiss::Extractor)?;
        if regions.is_empty() {
            return Err(AttemptMiss::NoFaceDetected);
        }
        tracing::debug!(faces = regions.len(), "located face region(s)");

        let encodings = extractor
            .encode(&rgb, &regions)
            .map_err(AttemptMiss::Extractor)?;
        if encodings.is_empty() {
            return Err(AttemptMiss::NoEncodings);
        }

        // encodings are order-aligned with their regions
        Ok(regions
            .into_iter()
            .zip(encodings)
            .map(|(region, encoding)| FaceObservation { region, encoding })
            .collect())
    }
}
