//! Preview negotiation primitives
//!
//! Everything in this module is a plain value or a pure function: choosing a
//! preview size, resolving the rotation that makes sensor frames upright, and
//! fitting the preview into a view. The session controller composes them each
//! time a camera is opened.

pub mod layout;
pub mod orientation;
pub mod size;

pub use layout::{ViewTransform, fit_view, frame_buffer_len, preview_transform};
pub use orientation::{resolve_for, resolve_rotation};
pub use size::{DEFAULT_THRESHOLD, select_preview_size};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A capture size reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Build a resolution, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResolution(format!("{width}x{height}")));
        }
        Ok(Self { width, height })
    }

    /// The larger of the two dimensions
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// The smaller of the two dimensions
    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Pixel count
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::InvalidResolution(format!("expected WxH, got '{s}'")))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| Error::InvalidResolution(format!("'{s}': {e}")))
        };

        Self::new(parse(width)?, parse(height)?)
    }
}

/// Parse a comma separated list such as `640x480,1280x720`.
pub fn parse_resolution_list(s: &str) -> Result<Vec<Resolution>> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Resolution::from_str)
        .collect()
}

/// Which way the camera faces relative to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Same side as the display (selfie camera)
    Front,
    /// Opposite side from the display
    Back,
}

impl Facing {
    /// Canonical string representation for configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Back => "back",
        }
    }
}

impl FromStr for Facing {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "back" | "rear" | "environment" => Ok(Facing::Back),
            other => Err(Error::Config(format!(
                "Unknown camera facing '{other}', expected front or back"
            ))),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation of the display relative to its natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayRotation {
    /// Natural orientation
    #[default]
    #[serde(rename = "0")]
    Rot0,
    /// Rotated 90 degrees
    #[serde(rename = "90")]
    Rot90,
    /// Upside down
    #[serde(rename = "180")]
    Rot180,
    /// Rotated 270 degrees
    #[serde(rename = "270")]
    Rot270,
}

impl DisplayRotation {
    /// Rotation in degrees
    pub fn degrees(self) -> u32 {
        match self {
            DisplayRotation::Rot0 => 0,
            DisplayRotation::Rot90 => 90,
            DisplayRotation::Rot180 => 180,
            DisplayRotation::Rot270 => 270,
        }
    }

    /// Normalize an arbitrary multiple of 90 degrees.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(DisplayRotation::Rot0),
            90 => Some(DisplayRotation::Rot90),
            180 => Some(DisplayRotation::Rot180),
            270 => Some(DisplayRotation::Rot270),
            _ => None,
        }
    }
}

impl FromStr for DisplayRotation {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        value
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(Self::from_degrees)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unknown display rotation '{value}', expected 0, 90, 180 or 270"
                ))
            })
    }
}

impl fmt::Display for DisplayRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Fixed orientation facts about one physical camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOrientationInfo {
    /// Degrees the sensor is rotated from the device's natural orientation
    pub mount_angle: u32,
    /// Which side the camera faces
    pub facing: Facing,
}

impl Default for DeviceOrientationInfo {
    fn default() -> Self {
        Self {
            mount_angle: 0,
            facing: Facing::Back,
        }
    }
}

/// Chosen preview size, split into long and short side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSize {
    /// `max(width, height)` of the chosen resolution
    pub long_side: u32,
    /// `min(width, height)` of the chosen resolution
    pub short_side: u32,
}

impl PreviewSize {
    /// Landscape resolution, the form capture devices are configured with
    pub fn to_resolution(self) -> Resolution {
        Resolution {
            width: self.long_side,
            height: self.short_side,
        }
    }
}

impl From<Resolution> for PreviewSize {
    fn from(res: Resolution) -> Self {
        Self {
            long_side: res.long_side(),
            short_side: res.short_side(),
        }
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.long_side, self.short_side)
    }
}

/// Pixel size of the surface the preview is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ViewSize {
    /// Build a view size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for ViewSize {
    fn from(res: Resolution) -> Self {
        Self::new(res.width, res.height)
    }
}

impl fmt::Display for ViewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout of preview frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Motion JPEG (compressed)
    Mjpeg,
    /// YUYV 4:2:2
    Yuyv,
    /// YUV 4:2:0 semi-planar with interleaved VU
    Nv21,
    /// RGB24
    Rgb24,
}

impl PixelFormat {
    /// Bits per pixel. MJPEG is variable, so an uncompressed 4:2:2 bound is used.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Nv21 => 12,
            PixelFormat::Yuyv | PixelFormat::Mjpeg => 16,
            PixelFormat::Rgb24 => 24,
        }
    }

    /// Canonical string representation for configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Mjpeg => "mjpeg",
            PixelFormat::Yuyv => "yuyv",
            PixelFormat::Nv21 => "nv21",
            PixelFormat::Rgb24 => "rgb24",
        }
    }

    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mjpeg" | "mjpg" => Some(PixelFormat::Mjpeg),
            "yuyv" => Some(PixelFormat::Yuyv),
            "nv21" => Some(PixelFormat::Nv21),
            "rgb" | "rgb24" => Some(PixelFormat::Rgb24),
            _ => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_rejects_zero() {
        assert!(Resolution::new(0, 480).is_err());
        assert!(Resolution::new(640, 0).is_err());
        assert_eq!(Resolution::new(640, 480).unwrap().long_side(), 640);
    }

    #[test]
    fn test_resolution_from_str() {
        let res: Resolution = "1280x720".parse().unwrap();
        assert_eq!(res, Resolution { width: 1280, height: 720 });
        assert!("1280".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_parse_resolution_list() {
        let list = parse_resolution_list("320x240, 640x480,").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1], Resolution { width: 640, height: 480 });
    }

    #[test]
    fn test_display_rotation_from_degrees() {
        assert_eq!(DisplayRotation::from_degrees(-90), Some(DisplayRotation::Rot270));
        assert_eq!(DisplayRotation::from_degrees(450), Some(DisplayRotation::Rot90));
        assert_eq!(DisplayRotation::from_degrees(45), None);
        assert_eq!("180".parse::<DisplayRotation>().unwrap(), DisplayRotation::Rot180);
        assert!("left".parse::<DisplayRotation>().is_err());
    }

    #[test]
    fn test_facing_from_str() {
        assert_eq!("FRONT".parse::<Facing>().unwrap(), Facing::Front);
        assert_eq!("rear".parse::<Facing>().unwrap(), Facing::Back);
        assert!("sideways".parse::<Facing>().is_err());
    }

    #[test]
    fn test_preview_size_from_portrait_resolution() {
        let size = PreviewSize::from(Resolution { width: 720, height: 1280 });
        assert_eq!(size.long_side, 1280);
        assert_eq!(size.short_side, 720);
        assert_eq!(size.to_resolution(), Resolution { width: 1280, height: 720 });
    }

    #[test]
    fn test_pixel_format_parse() {
        assert_eq!(PixelFormat::parse("MJPG"), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::parse("nv21"), Some(PixelFormat::Nv21));
        assert!(PixelFormat::parse("bayer").is_none());
    }
}
