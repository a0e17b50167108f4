//! Raw V4L2 buffer conversions to grayscale pixel data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; luminance is every
/// even-indexed byte.
pub fn yuyv_to_gray(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(ConvertError::BufferTooShort {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Convert 16-bit little-endian grayscale (common IR camera format) to
/// 8-bit by dropping the low byte.
pub fn y16_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let pixels = (width * height) as usize;
    let expected = pixels * 2;
    if buf.len() < expected {
        return Err(ConvertError::BufferTooShort {
            expected,
            actual: buf.len(),
        });
    }

    let mut gray = Vec::with_capacity(pixels);
    for idx in 0..pixels {
        let value = u16::from_le_bytes([buf[idx * 2], buf[idx * 2 + 1]]);
        gray.push((value >> 8) as u8);
    }
    Ok(gray)
}
