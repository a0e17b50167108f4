//! faceprobe-hw — V4L2 camera implementation of the core's frame source.

pub mod camera;
pub mod convert;

pub use camera::{list_devices, Camera, CameraError, DeviceInfo};
