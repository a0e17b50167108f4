//! V4L2 camera capture via the `v4l` crate.

use crate::convert;
use faceprobe_core::{CaptureFailure, Frame, FrameSource, PixelOrder};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Fatal device-open errors. An unavailable device aborts the session;
/// there is no retry at the open level.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("device query failed: {0}")]
    QueryFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel, extract Y channel).
    Yuyv,
    /// 8-bit grayscale (native IR camera output).
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
}

/// V4L2 camera device handle. Owned exclusively by one session.
pub struct Camera {
    device: Option<Device>,
    width: u32,
    height: u32,
    device_path: String,
    format: NativeFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video2").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::QueryFailed(format!("failed to query capabilities: {e}")))?;

        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CameraError::StreamingNotSupported);
        }

        // Request YUYV at 640x480; accept GREY or Y16 if the driver
        // negotiates them (common for IR cameras).
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = 640;
        fmt.height = 480;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let format = if fourcc == FourCC::new(b"YUYV") {
            NativeFormat::Yuyv
        } else if fourcc == FourCC::new(b"GREY") {
            NativeFormat::Grey
        } else if fourcc == FourCC::new(b"Y16 ") || fourcc == FourCC::new(b"Y16\0") {
            NativeFormat::Y16
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, GREY, or Y16)"
            )));
        };

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "camera opened"
        );

        Ok(Self {
            device: Some(device),
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            format,
        })
    }

    fn buf_to_gray(&self, buf: &[u8]) -> Result<Vec<u8>, CaptureFailure> {
        let result = match self.format {
            NativeFormat::Grey => {
                let pixels = (self.width * self.height) as usize;
                if buf.len() < pixels {
                    return Err(CaptureFailure::ReadFailed(format!(
                        "GREY buffer too short: expected {pixels}, got {}",
                        buf.len()
                    )));
                }
                Ok(buf[..pixels].to_vec())
            }
            NativeFormat::Yuyv => convert::yuyv_to_gray(buf, self.width, self.height),
            NativeFormat::Y16 => convert::y16_to_gray(buf, self.width, self.height),
        };
        result.map_err(|e| CaptureFailure::ReadFailed(e.to_string()))
    }
}

impl FrameSource for Camera {
    /// Dequeue a single frame. Each read is an independent attempt over a
    /// fresh mmap stream; failures are transient and left to the caller.
    fn read(&mut self) -> Result<Frame, CaptureFailure> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| CaptureFailure::ReadFailed("device already closed".into()))?;

        let mut stream = MmapStream::with_buffers(device, BufType::VideoCapture, 4)
            .map_err(|e| CaptureFailure::ReadFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CaptureFailure::ReadFailed(format!("failed to dequeue buffer: {e}")))?;

        let gray = self.buf_to_gray(buf)?;
        tracing::trace!(seq = meta.sequence, "frame dequeued");

        Ok(Frame {
            data: gray,
            width: self.width,
            height: self.height,
            order: PixelOrder::Gray,
        })
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            tracing::info!(device = %self.device_path, "camera released");
        }
    }
}

/// Info about a discovered V4L2 capture device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
}

/// List available V4L2 video capture devices.
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for i in 0..16 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }
        devices.push(DeviceInfo {
            path,
            name: caps.card.clone(),
            driver: caps.driver.clone(),
        });
    }

    devices
}
