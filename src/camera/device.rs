//! Camera device implementation

use crate::camera::{CameraConfig, CameraDevice, fourcc};
use crate::error::{Error, Result};
use crate::preview::{PixelFormat, Resolution};
use crate::session::{CaptureDevice, PreviewFrame, PreviewPlan};
use std::io;
use std::mem;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// An opened V4L2 capture device
pub struct V4l2Device {
    /// Memory-mapped stream while previewing. Declared before `device` so it drops first.
    stream: Option<MmapStream<'static>>,
    /// Owning handle to the V4L device, `None` once released
    device: Option<Box<Device>>,
    info: CameraDevice,
    config: CameraConfig,
    rotation: u32,
}

impl V4l2Device {
    /// Open the device node described by `info`
    pub fn open(info: CameraDevice, config: CameraConfig) -> Result<Self> {
        let dev = Device::new(info.index).map_err(|e| {
            Error::CameraUnavailable(format!("Failed to open {}: {}", info.path, e))
        })?;

        tracing::debug!("Opened V4L2 device {} ({})", info.name, info.path);

        Ok(Self {
            stream: None,
            device: Some(Box::new(dev)),
            info,
            config,
            rotation: 0,
        })
    }

    /// Get camera device information
    pub fn info(&self) -> &CameraDevice {
        &self.info
    }

    /// Rotation hint last applied, in degrees
    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    fn device(&self) -> Result<&Device> {
        self.device
            .as_deref()
            .ok_or_else(|| Error::Camera(format!("{} has been released", self.info.path)))
    }
}

impl CaptureDevice for V4l2Device {
    fn supported_preview_sizes(&self) -> Result<Vec<Resolution>> {
        let fourcc = fourcc(self.config.format);
        let frame_sizes = self
            .device()?
            .enum_framesizes(fourcc)
            .map_err(|e| Error::Camera(format!("Failed to enumerate frame sizes: {}", e)))?;

        let mut sizes = Vec::new();
        for frame_size in frame_sizes {
            match frame_size.size {
                FrameSizeEnum::Discrete(d) => sizes.push(Resolution {
                    width: d.width,
                    height: d.height,
                }),
                // Continuous ranges contribute their bounds
                FrameSizeEnum::Stepwise(s) => {
                    sizes.push(Resolution {
                        width: s.min_width,
                        height: s.min_height,
                    });
                    sizes.push(Resolution {
                        width: s.max_width,
                        height: s.max_height,
                    });
                }
            }
        }

        sizes.sort_by_key(|r| (r.width, r.height));
        sizes.dedup();

        tracing::debug!(
            format = %self.config.format,
            count = sizes.len(),
            "Enumerated preview sizes"
        );

        Ok(sizes)
    }

    fn preview_size(&self) -> Result<Option<Resolution>> {
        let fmt = self
            .device()?
            .format()
            .map_err(|e| Error::Camera(format!("Failed to get format: {}", e)))?;

        Ok(Resolution::new(fmt.width, fmt.height).ok())
    }

    fn set_preview_size(&mut self, size: Resolution) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::Camera(
                "Cannot change preview size while streaming".to_string(),
            ));
        }

        let dev = self.device()?;
        let mut fmt = dev
            .format()
            .map_err(|e| Error::Camera(format!("Failed to get format: {}", e)))?;

        fmt.width = size.width;
        fmt.height = size.height;
        fmt.fourcc = fourcc(self.config.format);

        let applied = dev
            .set_format(&fmt)
            .map_err(|e| Error::Camera(format!("Failed to set format: {}", e)))?;

        if applied.width != size.width || applied.height != size.height {
            tracing::warn!(
                requested = %size,
                "Driver adjusted preview size to {}x{}",
                applied.width,
                applied.height
            );
        }

        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<()> {
        // V4L2 has no display orientation control; consumers read it from the plan
        tracing::debug!(degrees, "Recording display orientation");
        self.rotation = degrees % 360;
        Ok(())
    }

    fn pixel_format(&self) -> PixelFormat {
        self.config.format
    }

    fn start_preview(&mut self, plan: &PreviewPlan) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let dev = self.device()?;

        let mut params = dev
            .params()
            .map_err(|e| Error::Camera(format!("Failed to get params: {}", e)))?;

        params.interval = v4l::Fraction::new(1, self.config.fps.max(1));

        dev.set_params(&params)
            .map_err(|e| Error::Camera(format!("Failed to set params: {}", e)))?;

        let fmt = dev
            .format()
            .map_err(|e| Error::Camera(format!("Failed to get format: {}", e)))?;

        tracing::info!(
            "Camera configured: {}x{} @ {} fps ({}), rotation {}°",
            fmt.width,
            fmt.height,
            self.config.fps,
            String::from_utf8_lossy(&fmt.fourcc.repr),
            self.rotation
        );

        if fmt.size as usize > plan.buffer_len {
            tracing::debug!(
                driver = fmt.size,
                planned = plan.buffer_len,
                "Driver frame size exceeds planned buffer length"
            );
        }

        // SAFETY: the boxed device is only dropped after the stream (see field
        // order and `release`), so the extended borrow never dangles.
        let static_device: &'static Device =
            unsafe { mem::transmute::<&Device, &'static Device>(dev) };

        let buffer_count = self.config.buffer_count.max(2);

        let mut stream = MmapStream::with_buffers(static_device, Type::VideoCapture, buffer_count)
            .map_err(|e| Error::FrameCapture(format!("Failed to create stream: {}", e)))?;

        if self.config.frame_timeout_ms > 0 {
            stream.set_timeout(Duration::from_millis(self.config.frame_timeout_ms));
        }

        self.stream = Some(stream);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<PreviewFrame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::FrameCapture("Preview is not running".to_string()))?;

        let (buf, meta) = stream.next().map_err(capture_error)?;

        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };

        Ok(PreviewFrame {
            sequence: meta.sequence,
            data: buf[..used].to_vec(),
        })
    }

    fn stop_preview(&mut self) -> Result<()> {
        if self.stream.take().is_some() {
            tracing::debug!("Stopped streaming from {}", self.info.path);
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.stream = None;
        if self.device.take().is_some() {
            tracing::debug!("Released {}", self.info.path);
        }
        Ok(())
    }
}

/// Dequeue failures; a poll timeout is not fatal to the stream.
fn capture_error(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::TimedOut {
        Error::FrameTimeout
    } else {
        Error::FrameCapture(format!("Failed to capture: {}", e))
    }
}
