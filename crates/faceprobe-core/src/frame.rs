//! Frame type, luminance measurement, and color-space normalization.

/// Byte ordering of a frame's pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    /// 3 bytes/pixel, R-G-B.
    Rgb,
    /// 3 bytes/pixel, B-G-R (device-native for many webcams).
    Bgr,
    /// 1 byte/pixel grayscale (native IR camera output).
    Gray,
}

/// A raw image sample from a frame source. Produced transiently per capture
/// attempt; not retained after processing.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub order: PixelOrder,
}

impl Frame {
    /// Mean value over all stored bytes (0.0–255.0). For packed color frames
    /// this averages across channels, matching the usual exposure heuristic.
    pub fn mean_luminance(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Normalize to RGB ordering, as the extraction capability expects.
    ///
    /// Grayscale frames are expanded to three channels; BGR frames get their
    /// channels swapped; RGB frames pass through unchanged.
    pub fn into_rgb(self) -> Frame {
        let Frame {
            mut data,
            width,
            height,
            order,
        } = self;

        match order {
            PixelOrder::Rgb => {}
            PixelOrder::Bgr => {
                for px in data.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
            }
            PixelOrder::Gray => {
                let mut expanded = Vec::with_capacity(data.len() * 3);
                for &y in &data {
                    expanded.extend_from_slice(&[y, y, y]);
                }
                data = expanded;
            }
        }

        Frame {
            data,
            width,
            height,
            order: PixelOrder::Rgb,
        }
    }
}
