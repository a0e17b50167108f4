//! ONNX-backed face extractor.
//!
//! Consumes two opaque models via ONNX Runtime: an UltraFace-style detector
//! (fixed 320x240 input, score/box output pair) and an ArcFace-style encoder
//! (112x112 aligned crop in, fixed-length embedding out). The probe treats
//! both as external capabilities; this module only does the tensor plumbing.

use crate::extractor::{ExtractorError, FaceExtractor};
use crate::frame::{Frame, PixelOrder};
use crate::types::{Encoding, Region};
use image::{imageops, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const DETECT_INPUT_WIDTH: u32 = 320;
const DETECT_INPUT_HEIGHT: u32 = 240;
const DETECT_MEAN: f32 = 127.0;
const DETECT_STD: f32 = 128.0;
const DETECT_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECT_NMS_THRESHOLD: f32 = 0.3;

const ENCODE_INPUT_SIZE: u32 = 112;
const ENCODE_MEAN: f32 = 127.5;
const ENCODE_STD: f32 = 127.5; // symmetric normalization

/// Face extractor backed by two ONNX sessions.
pub struct OnnxExtractor {
    detector: Session,
    encoder: Session,
}

impl OnnxExtractor {
    /// Load both models. Fails fast when either file is absent.
    pub fn load(detector_path: &Path, encoder_path: &Path) -> Result<Self, ExtractorError> {
        let detector = load_session(detector_path)?;
        let encoder = load_session(encoder_path)?;
        Ok(Self { detector, encoder })
    }
}

fn load_session(path: &Path) -> Result<Session, ExtractorError> {
    if !path.exists() {
        return Err(ExtractorError::ModelNotFound(path.display().to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(path)?;

    tracing::info!(
        path = %path.display(),
        inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
        outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
        "loaded ONNX model"
    );
    Ok(session)
}

impl FaceExtractor for OnnxExtractor {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<Region>, ExtractorError> {
        let img = frame_to_image(frame)?;
        let resized = imageops::resize(
            &img,
            DETECT_INPUT_WIDTH,
            DETECT_INPUT_HEIGHT,
            imageops::FilterType::Triangle,
        );

        let input = image_to_tensor(&resized, DETECT_MEAN, DETECT_STD);
        let outputs = self
            .detector
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("detector scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("detector boxes: {e}")))?;

        let regions = decode_detections(
            scores,
            boxes,
            frame.width as f32,
            frame.height as f32,
        )?;
        tracing::debug!(faces = regions.len(), "detector pass complete");
        Ok(regions)
    }

    fn encode(
        &mut self,
        frame: &Frame,
        regions: &[Region],
    ) -> Result<Vec<Encoding>, ExtractorError> {
        let img = frame_to_image(frame)?;
        let mut encodings = Vec::with_capacity(regions.len());

        for region in regions {
            let crop = crop_region(&img, region);
            let aligned = imageops::resize(
                &crop,
                ENCODE_INPUT_SIZE,
                ENCODE_INPUT_SIZE,
                imageops::FilterType::Triangle,
            );

            let input = image_to_tensor(&aligned, ENCODE_MEAN, ENCODE_STD);
            let outputs = self
                .encoder
                .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

            let (_, raw) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ExtractorError::InferenceFailed(format!("embedding: {e}")))?;

            encodings.push(Encoding::new(l2_normalize(raw)));
        }

        Ok(encodings)
    }
}

/// View an RGB frame as an `image::RgbImage` for resize/crop operations.
fn frame_to_image(frame: &Frame) -> Result<RgbImage, ExtractorError> {
    if frame.order != PixelOrder::Rgb {
        return Err(ExtractorError::InferenceFailed(
            "extractor requires RGB frames".into(),
        ));
    }
    RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(|| {
        ExtractorError::InferenceFailed(format!(
            "frame buffer too short for {}x{} RGB",
            frame.width, frame.height
        ))
    })
}

/// HWC u8 image to normalized NCHW float tensor.
fn image_to_tensor(img: &RgbImage, mean: f32, std: f32) -> Array4<f32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, px) in img.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (px.0[c] as f32 - mean) / std;
        }
    }
    tensor
}

/// Crop a detection box out of the frame, clamped to the image bounds.
fn crop_region(img: &RgbImage, region: &Region) -> RgbImage {
    let x = region.x.max(0.0) as u32;
    let y = region.y.max(0.0) as u32;
    let x = x.min(img.width().saturating_sub(1));
    let y = y.min(img.height().saturating_sub(1));
    let w = (region.width as u32).max(1).min(img.width() - x);
    let h = (region.height as u32).max(1).min(img.height() - y);
    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Decode the detector's (scores, boxes) output pair into frame-space
/// regions: confidence filter, scale-up, then NMS.
fn decode_detections(
    scores: &[f32],
    boxes: &[f32],
    frame_w: f32,
    frame_h: f32,
) -> Result<Vec<Region>, ExtractorError> {
    // scores: [1, N, 2] (background, face); boxes: [1, N, 4] normalized corners
    let n = scores.len() / 2;
    if boxes.len() < n * 4 {
        return Err(ExtractorError::InferenceFailed(format!(
            "detector output mismatch: {n} scores but {} box values",
            boxes.len()
        )));
    }

    let mut candidates = Vec::new();
    for i in 0..n {
        let confidence = scores[i * 2 + 1];
        if confidence < DETECT_CONFIDENCE_THRESHOLD {
            continue;
        }
        let x1 = boxes[i * 4] * frame_w;
        let y1 = boxes[i * 4 + 1] * frame_h;
        let x2 = boxes[i * 4 + 2] * frame_w;
        let y2 = boxes[i * 4 + 3] * frame_h;
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        candidates.push(Region {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence,
        });
    }

    Ok(non_max_suppression(candidates, DETECT_NMS_THRESHOLD))
}

/// Greedy NMS, keeping highest-confidence regions first.
fn non_max_suppression(mut regions: Vec<Region>, iou_threshold: f32) -> Vec<Region> {
    regions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Region> = Vec::new();
    for region in regions {
        if kept.iter().all(|k| iou(k, &region) <= iou_threshold) {
            kept.push(region);
        }
    }
    kept
}

fn iou(a: &Region, b: &Region) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// L2-normalize and widen the raw embedding.
fn l2_normalize(raw: &[f32]) -> Vec<f64> {
    let norm: f64 = raw.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|&x| x as f64 / norm).collect()
    } else {
        raw.iter().map(|&x| x as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_to_tensor_shape_and_normalization() {
        let img = RgbImage::from_pixel(4, 2, image::Rgb([127, 127, 127]));
        let tensor = image_to_tensor(&img, DETECT_MEAN, DETECT_STD);
        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 2, 1, 3]], 0.0);
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        // two anchors: one confident face, one background-dominated
        let scores = [0.1, 0.9, 0.95, 0.05];
        let boxes = [0.25, 0.25, 0.75, 0.75, 0.0, 0.0, 0.5, 0.5];
        let regions = decode_detections(&scores, &boxes, 100.0, 100.0).unwrap();
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.x, 25.0);
        assert_eq!(r.y, 25.0);
        assert_eq!(r.width, 50.0);
        assert_eq!(r.height, 50.0);
    }

    #[test]
    fn test_decode_drops_degenerate_boxes() {
        let scores = [0.1, 0.9];
        let boxes = [0.5, 0.5, 0.5, 0.5]; // zero area
        let regions = decode_detections(&scores, &boxes, 100.0, 100.0).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let near_duplicate = |confidence| Region {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
            confidence,
        };
        let distant = Region {
            x: 200.0,
            y: 200.0,
            width: 50.0,
            height: 50.0,
            confidence: 0.8,
        };
        let kept = non_max_suppression(
            vec![near_duplicate(0.9), near_duplicate(0.95), distant],
            DETECT_NMS_THRESHOLD,
        );
        assert_eq!(kept.len(), 2);
        // highest-confidence duplicate survives
        assert_eq!(kept[0].confidence, 0.95);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = Region { x: 0.0, y: 0.0, width: 10.0, height: 10.0, confidence: 1.0 };
        let b = Region { x: 20.0, y: 20.0, width: 10.0, height: 10.0, confidence: 1.0 };
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        let norm: f64 = normalized.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!((normalized[0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_crop_region_clamps_to_bounds() {
        let img = RgbImage::new(10, 10);
        let region = Region {
            x: 8.0,
            y: 8.0,
            width: 50.0,
            height: 50.0,
            confidence: 1.0,
        };
        let crop = crop_region(&img, &region);
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
    }
}
