//! Capture session controller
//!
//! The host platform (window system, permission broker, camera stack) is
//! reached only through [`CameraHost`] and [`CaptureDevice`]. Platform
//! callbacks are fed in as [`SessionEvent`]s; the controller owns the open
//! device for the lifetime of one preview and releases it when the surface
//! goes away.

use crate::error::{Error, Result};
use crate::preview::{
    self, DeviceOrientationInfo, DisplayRotation, Facing, PixelFormat, PreviewSize, Resolution,
    ViewSize, ViewTransform,
};
use serde::{Deserialize, Serialize};

/// Message shown when the user refuses camera access
pub const PERMISSION_REQUIRED_MESSAGE: &str = "Camera permission is needed to run this application";

/// Platform callbacks delivered to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The preview surface exists and has the given size
    SurfaceAvailable(ViewSize),
    /// The preview surface was torn down
    SurfaceDestroyed,
    /// The user granted camera access
    PermissionGranted,
    /// The user refused camera access
    PermissionDenied,
}

/// Where the controller is in the preview lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No surface, or surface without an open camera
    Idle,
    /// Surface is ready, waiting on the permission prompt
    AwaitingPermission,
    /// A camera is open and streaming into the surface
    Previewing,
    /// Permission was refused; the session is over
    Finished,
}

/// One camera as enumerated by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Host-specific identifier passed back to [`CameraHost::open_camera`]
    pub id: usize,
    /// Human readable name
    pub name: String,
    /// Mount angle and facing
    pub orientation: DeviceOrientationInfo,
}

/// A frame pulled from a previewing device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    /// Driver sequence number
    pub sequence: u32,
    /// Raw frame bytes in the plan's pixel format
    pub data: Vec<u8>,
}

/// Everything decided when a preview starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewPlan {
    /// Camera that was opened
    pub camera_id: usize,
    /// Name of that camera
    pub camera_name: String,
    /// Orientation facts the rotation was derived from
    pub orientation: DeviceOrientationInfo,
    /// Display rotation at session start
    pub display_rotation: DisplayRotation,
    /// Clockwise rotation applied to frames, in degrees
    pub rotation: u32,
    /// Negotiated preview size
    pub preview: PreviewSize,
    /// Preview size the device had before negotiation
    pub original: Option<Resolution>,
    /// Size of the preview box inside the view
    pub layout: ViewSize,
    /// Scale applied to the surface
    pub transform: ViewTransform,
    /// Frame pixel format
    pub format: PixelFormat,
    /// Bytes per frame buffer
    pub buffer_len: usize,
}

impl PreviewPlan {
    /// Whether the device has to be reconfigured to the negotiated size
    ///
    /// Sizes are compared by long and short side, so a portrait original that
    /// already matches the negotiated size is left alone.
    pub fn needs_resize(&self) -> bool {
        self.original.map(PreviewSize::from) != Some(self.preview)
    }
}

/// Inputs for [`plan_preview`]
#[derive(Debug, Clone)]
pub struct PlanInputs<'a> {
    /// Camera to plan for
    pub camera: &'a CameraDescriptor,
    /// Sizes the camera supports
    pub supported: &'a [Resolution],
    /// Size the camera is currently configured with, if known
    pub original: Option<Resolution>,
    /// Current display rotation
    pub display_rotation: DisplayRotation,
    /// Long-side threshold for size selection
    pub threshold: u32,
    /// Surface size
    pub view: ViewSize,
    /// Frame pixel format
    pub format: PixelFormat,
}

/// Compose size selection, rotation and layout for one camera.
pub fn plan_preview(inputs: PlanInputs<'_>) -> Result<PreviewPlan> {
    let preview = preview::select_preview_size(inputs.supported, inputs.threshold)?;
    let rotation = preview::resolve_for(&inputs.camera.orientation, inputs.display_rotation);
    let layout = preview::fit_view(preview, inputs.view);
    let surface = inputs.original.unwrap_or(preview.to_resolution());
    let transform = preview::preview_transform(layout, surface);
    let buffer_len = preview::frame_buffer_len(preview.to_resolution(), inputs.format);

    Ok(PreviewPlan {
        camera_id: inputs.camera.id,
        camera_name: inputs.camera.name.clone(),
        orientation: inputs.camera.orientation,
        display_rotation: inputs.display_rotation,
        rotation,
        preview,
        original: inputs.original,
        layout,
        transform,
        format: inputs.format,
        buffer_len,
    })
}

/// Pick the first back-facing camera, or the first camera if none faces back.
pub fn select_camera(cameras: &[CameraDescriptor]) -> Result<&CameraDescriptor> {
    cameras
        .iter()
        .find(|c| c.orientation.facing == Facing::Back)
        .or_else(|| cameras.first())
        .ok_or_else(|| Error::CameraNotFound("Default camera not available".to_string()))
}

/// An opened capture device
pub trait CaptureDevice {
    /// Resolutions the device can stream
    fn supported_preview_sizes(&self) -> Result<Vec<Resolution>>;
    /// Currently configured preview size
    fn preview_size(&self) -> Result<Option<Resolution>>;
    /// Reconfigure the preview size
    fn set_preview_size(&mut self, size: Resolution) -> Result<()>;
    /// Apply the clockwise rotation hint, in degrees
    fn set_display_orientation(&mut self, degrees: u32) -> Result<()>;
    /// Pixel format frames will arrive in
    fn pixel_format(&self) -> PixelFormat;
    /// Start streaming according to `plan`
    fn start_preview(&mut self, plan: &PreviewPlan) -> Result<()>;
    /// Block until the next frame is available.
    ///
    /// Devices with a frame timeout return [`Error::FrameTimeout`] when it
    /// elapses; the preview keeps running.
    fn next_frame(&mut self) -> Result<PreviewFrame>;
    /// Stop streaming
    fn stop_preview(&mut self) -> Result<()>;
    /// Give the hardware back; the device is unusable afterwards
    fn release(&mut self) -> Result<()>;
}

/// Platform services the controller depends on
pub trait CameraHost {
    /// Whether camera access is currently granted
    fn has_camera_permission(&self) -> bool;
    /// Ask for camera access; the answer arrives as a [`SessionEvent`]
    fn request_camera_permission(&mut self);
    /// Cameras in enumeration order
    fn cameras(&self) -> Result<Vec<CameraDescriptor>>;
    /// Open a camera by descriptor id
    fn open_camera(&mut self, id: usize) -> Result<Box<dyn CaptureDevice>>;
    /// Current display rotation
    fn display_rotation(&self) -> DisplayRotation;
    /// Resize the preview view and install its transform
    fn apply_layout(&mut self, plan: &PreviewPlan);
    /// Show a message to the user
    fn notify_user(&mut self, message: &str);
    /// Send the user to the system permission settings
    fn launch_permission_settings(&mut self);
    /// End the hosting screen
    fn finish(&mut self);
}

struct ActivePreview {
    device: Box<dyn CaptureDevice>,
    plan: PreviewPlan,
}

/// Drives one host through the preview lifecycle
pub struct SessionController<H: CameraHost> {
    host: H,
    threshold: u32,
    state: SessionState,
    surface: Option<ViewSize>,
    active: Option<ActivePreview>,
}

impl<H: CameraHost> SessionController<H> {
    /// Create a controller using the given size-selection threshold
    pub fn new(host: H, threshold: u32) -> Self {
        Self {
            host,
            threshold,
            state: SessionState::Idle,
            surface: None,
            active: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Plan of the running preview
    pub fn plan(&self) -> Option<&PreviewPlan> {
        self.active.as_ref().map(|a| &a.plan)
    }

    /// Borrow the host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the host
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Feed one platform event through the state machine.
    ///
    /// Events that make no sense in the current state are logged and
    /// dropped. If starting the preview fails the device is released, the
    /// error is returned and the state is left unchanged.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<SessionState> {
        tracing::debug!(?event, state = ?self.state, "Session event");

        match (self.state, event) {
            (SessionState::Finished, _) => {
                tracing::debug!(?event, "Session finished, ignoring event");
            }
            (SessionState::Idle, SessionEvent::SurfaceAvailable(view)) => {
                self.surface = Some(view);
                if self.host.has_camera_permission() {
                    self.start_preview(view)?;
                    self.state = SessionState::Previewing;
                } else {
                    tracing::info!("Camera permission missing, requesting it");
                    self.host.request_camera_permission();
                    self.state = SessionState::AwaitingPermission;
                }
            }
            (SessionState::AwaitingPermission, SessionEvent::PermissionGranted) => {
                let view = self.surface.unwrap_or_default();
                self.start_preview(view)?;
                self.state = SessionState::Previewing;
            }
            (SessionState::AwaitingPermission, SessionEvent::PermissionDenied) => {
                tracing::warn!("Camera permission denied");
                self.host.notify_user(PERMISSION_REQUIRED_MESSAGE);
                self.host.launch_permission_settings();
                self.host.finish();
                self.surface = None;
                self.state = SessionState::Finished;
            }
            (SessionState::AwaitingPermission, SessionEvent::SurfaceDestroyed) => {
                self.surface = None;
                self.state = SessionState::Idle;
            }
            (SessionState::Previewing, SessionEvent::SurfaceDestroyed) => {
                self.surface = None;
                self.state = SessionState::Idle;
                self.stop_preview()?;
            }
            (state, event) => {
                tracing::warn!(?state, ?event, "Ignoring unexpected session event");
            }
        }

        Ok(self.state)
    }

    /// Pull one frame from the running preview.
    ///
    /// Returns `None` when no preview is running.
    pub fn pump_frame(&mut self) -> Result<Option<PreviewFrame>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };

        let frame = match active.device.next_frame() {
            Ok(frame) => frame,
            Err(Error::FrameTimeout) => {
                tracing::trace!("No frame within timeout, preview still running");
                return Err(Error::FrameTimeout);
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(
            sequence = frame.sequence,
            bytes = frame.data.len(),
            expected = active.plan.buffer_len,
            "Preview frame"
        );
        Ok(Some(frame))
    }

    fn start_preview(&mut self, view: ViewSize) -> Result<()> {
        let cameras = self.host.cameras()?;
        let camera = select_camera(&cameras)?.clone();
        let display_rotation = self.host.display_rotation();

        tracing::info!(
            id = camera.id,
            facing = %camera.orientation.facing,
            mount_angle = camera.orientation.mount_angle,
            "Opening camera: {}",
            camera.name
        );

        let mut device = self.host.open_camera(camera.id)?;

        match self.configure(device.as_mut(), &camera, display_rotation, view) {
            Ok(plan) => {
                tracing::info!(
                    preview = %plan.preview,
                    rotation = plan.rotation,
                    layout = %plan.layout,
                    "Preview started"
                );
                self.active = Some(ActivePreview { device, plan });
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to start preview: {err}");
                if let Err(release_err) = device.release() {
                    tracing::warn!("Failed to release camera after error: {release_err}");
                }
                Err(err)
            }
        }
    }

    fn configure(
        &mut self,
        device: &mut dyn CaptureDevice,
        camera: &CameraDescriptor,
        display_rotation: DisplayRotation,
        view: ViewSize,
    ) -> Result<PreviewPlan> {
        let rotation = preview::resolve_for(&camera.orientation, display_rotation);
        device.set_display_orientation(rotation)?;

        let original = device.preview_size()?;
        let supported = device.supported_preview_sizes()?;

        let plan = plan_preview(PlanInputs {
            camera,
            supported: &supported,
            original,
            display_rotation,
            threshold: self.threshold,
            view,
            format: device.pixel_format(),
        })?;

        if plan.needs_resize() {
            device.set_preview_size(plan.preview.to_resolution())?;
        }

        self.host.apply_layout(&plan);
        device.start_preview(&plan)?;

        Ok(plan)
    }

    fn stop_preview(&mut self) -> Result<()> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };

        tracing::info!(camera = active.plan.camera_id, "Stopping preview");
        let stopped = active.device.stop_preview();
        let released = active.device.release();
        stopped.and(released)
    }
}

impl<H: CameraHost> Drop for SessionController<H> {
    fn drop(&mut self) {
        if let Err(err) = self.stop_preview() {
            tracing::warn!("Failed to release camera on shutdown: {err}");
        }
    }
}
