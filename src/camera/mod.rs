//! V4L2 capture host for Linux
//!
//! Implements [`CameraHost`](crate::session::CameraHost) and
//! [`CaptureDevice`](crate::session::CaptureDevice) on top of the
//! Video4Linux2 API so the session controller can drive a webcam.

mod config;
mod device;
mod host;

pub use config::{CameraConfig, fourcc};
pub use device::V4l2Device;
pub use host::V4l2Host;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Information about a camera device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Device index (e.g., 0 for /dev/video0)
    pub index: usize,
    /// Device path (e.g., "/dev/video0")
    pub path: String,
    /// Device name as reported by the driver
    pub name: String,
    /// Driver name
    pub driver: String,
    /// Bus information
    pub bus_info: String,
}

/// List available V4L2 capture devices
pub fn list_devices() -> Result<Vec<CameraDevice>> {
    let mut devices = Vec::new();

    for i in 0..10 {
        let Ok(dev) = v4l::Device::new(i) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };

        // Metadata nodes share the driver but cannot stream frames
        if caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            devices.push(CameraDevice {
                index: i,
                path: format!("/dev/video{}", i),
                name: caps.card,
                driver: caps.driver,
                bus_info: caps.bus,
            });
        }
    }

    if devices.is_empty() {
        return Err(Error::CameraNotFound(
            "No V4L2 capture devices found".to_string(),
        ));
    }

    Ok(devices)
}

/// Find a camera device by name (case-insensitive substring match)
pub fn find_device_by_name(name: &str) -> Result<CameraDevice> {
    let devices = list_devices()?;
    let name_lower = name.to_lowercase();

    devices
        .into_iter()
        .find(|d| d.name.to_lowercase().contains(&name_lower))
        .ok_or_else(|| Error::CameraNotFound(format!("No device matching '{}'", name)))
}
