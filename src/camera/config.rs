//! Camera configuration

use crate::preview::{DeviceOrientationInfo, PixelFormat};
use serde::{Deserialize, Serialize};

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    /// If None, cameras are picked by facing, then enumeration order
    pub device_index: Option<usize>,

    /// Camera device name to search for
    /// If set, this takes priority over device_index
    pub device_name: Option<String>,

    /// Frames per second
    pub fps: u32,

    /// Pixel format requested from the driver
    pub format: PixelFormat,

    /// Number of V4L2 buffers to keep mapped (higher = smoother but more memory)
    pub buffer_count: u32,

    /// Milliseconds to wait for a frame before giving control back (0 blocks)
    pub frame_timeout_ms: u64,

    /// Mount angle and facing, which V4L2 cannot report
    pub orientation: DeviceOrientationInfo,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: None,
            device_name: None,
            fps: 30,
            format: PixelFormat::Yuyv,
            buffer_count: 4,
            frame_timeout_ms: 500,
            orientation: DeviceOrientationInfo::default(),
        }
    }
}

/// V4L2 FourCC code for a pixel format
pub fn fourcc(format: PixelFormat) -> v4l::FourCC {
    match format {
        PixelFormat::Mjpeg => v4l::FourCC::new(b"MJPG"),
        PixelFormat::Yuyv => v4l::FourCC::new(b"YUYV"),
        PixelFormat::Nv21 => v4l::FourCC::new(b"NV21"),
        PixelFormat::Rgb24 => v4l::FourCC::new(b"RGB3"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::Facing;

    #[test]
    fn test_default_config() {
        let config = CameraConfig::default();
        assert_eq!(config.fps, 30);
        assert_eq!(config.format, PixelFormat::Yuyv);
        assert_eq!(config.orientation.facing, Facing::Back);
    }

    #[test]
    fn test_pixel_format_fourcc() {
        assert_eq!(fourcc(PixelFormat::Mjpeg), v4l::FourCC::new(b"MJPG"));
        assert_eq!(fourcc(PixelFormat::Nv21), v4l::FourCC::new(b"NV21"));
        assert_eq!(&fourcc(PixelFormat::Rgb24).repr, b"RGB3");
    }
}
