//! Still-image frame source — probe a photo instead of a live camera.
//!
//! Useful for diagnosing matcher behavior without camera hardware. The
//! image is yielded once; subsequent reads fail like an exhausted device.

use anyhow::{Context, Result};
use faceprobe_core::{CaptureFailure, Frame, FrameSource, PixelOrder};
use std::path::Path;

pub struct StillImage {
    frame: Option<Frame>,
}

impl StillImage {
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("decoding image {}", path.display()))?
            .into_rgb8();

        let frame = Frame {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
            order: PixelOrder::Rgb,
        };
        tracing::info!(path = %path.display(), width = frame.width, height = frame.height, "still image loaded");
        Ok(Self { frame: Some(frame) })
    }
}

impl FrameSource for StillImage {
    fn read(&mut self) -> Result<Frame, CaptureFailure> {
        self.frame
            .take()
            .ok_or_else(|| CaptureFailure::ReadFailed("still image already consumed".into()))
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn yields_the_image_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.png");
        RgbImage::from_pixel(4, 3, image::Rgb([120, 130, 140]))
            .save(&path)
            .unwrap();

        let mut source = StillImage::open(&path).unwrap();
        let frame = source.read().unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.order, PixelOrder::Rgb);
        assert_eq!(frame.data[..3], [120, 130, 140]);

        assert!(source.read().is_err());
        source.close();
    }

    #[test]
    fn open_fails_on_missing_file() {
        assert!(StillImage::open(Path::new("/nonexistent/probe.png")).is_err());
    }
}
