//! campreview - live camera preview negotiation
//!
//! Binds a capture device to a preview surface: picks a camera, negotiates a
//! preview resolution, resolves the rotation that shows sensor frames upright
//! and fits the preview into its view.
//!
//! # Features
//!
//! - **Preview negotiation**: pure size selection, orientation and layout math
//! - **Session controller**: event-driven state machine over a host trait
//! - **Camera Integration**: V4L2 host for Linux webcams (`camera` feature)
//!
//! # Example
//!
//! ```
//! use campreview::preview::{
//!     DisplayRotation, Facing, Resolution, resolve_rotation, select_preview_size,
//! };
//!
//! let sizes = [Resolution::new(640, 480)?, Resolution::new(1280, 720)?];
//! let size = select_preview_size(&sizes, 720)?;
//! assert_eq!((size.long_side, size.short_side), (1280, 720));
//!
//! assert_eq!(resolve_rotation(90, Facing::Front, DisplayRotation::Rot0), 270);
//! # Ok::<(), campreview::Error>(())
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod logging;
pub mod preview;
pub mod session;

#[cfg(feature = "camera")]
#[cfg_attr(docsrs, doc(cfg(feature = "camera")))]
pub mod camera;

// Re-exports for convenience
pub use error::{Error, Result};

#[cfg(feature = "camera")]
pub use camera::{CameraConfig, CameraDevice, V4l2Device, V4l2Host};

pub use config::{
    CameraOptions, CampreviewConfig, LogRotation, LoggingOptions, PreviewOptions, PreviewSettings,
};
pub use preview::{
    DeviceOrientationInfo, DisplayRotation, Facing, PixelFormat, PreviewSize, Resolution,
    ViewSize, ViewTransform,
};
pub use session::{
    CameraDescriptor, CameraHost, CaptureDevice, PreviewFrame, PreviewPlan, SessionController,
    SessionEvent, SessionState,
};
