//! Face extraction boundary — the external detection/encoding capability.

use crate::frame::Frame;
use crate::types::{Encoding, Region};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face detection and encoding capability.
///
/// Frames passed in are RGB; callers normalize color ordering first.
/// Locating zero regions is a valid outcome, not an error. `encode`
/// returns one encoding per region, order-aligned with its input.
pub trait FaceExtractor {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<Region>, ExtractorError>;

    fn encode(
        &mut self,
        frame: &Frame,
        regions: &[Region],
    ) -> Result<Vec<Encoding>, ExtractorError>;
}
