//! faceprobe-core — enrollment lookup and live-face matching.
//!
//! Loads enrolled face encodings, scores live encodings against them with a
//! deterministic threshold policy, and drives the bounded capture/evaluate
//! retry loop. Camera hardware and the detection/encoding models sit behind
//! the [`FrameSource`] and [`FaceExtractor`] ports.

pub mod extractor;
pub mod frame;
pub mod matcher;
pub mod onnx;
pub mod session;
pub mod source;
pub mod store;
pub mod types;

pub use extractor::{ExtractorError, FaceExtractor};
pub use frame::{Frame, PixelOrder};
pub use matcher::{MatchError, MatchPolicy, Matcher};
pub use onnx::OnnxExtractor;
pub use session::{AuthenticationSession, SessionError, SessionPolicy};
pub use source::{CaptureFailure, FrameSource};
pub use store::{load_model_set, ModelLoadError};
pub use types::{
    Candidate, Decision, Encoding, EnrolledFace, FaceObservation, MatchResult, ModelSet, Region,
    SessionReport,
};
