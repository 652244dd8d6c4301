//! Linux host services for the session controller

use crate::camera::{CameraConfig, CameraDevice, V4l2Device, find_device_by_name, list_devices};
use crate::config::PreviewSettings;
use crate::error::{Error, Result};
use crate::preview::DisplayRotation;
use crate::session::{CameraDescriptor, CameraHost, CaptureDevice, PreviewPlan};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// [`CameraHost`] backed by V4L2 device nodes and static configuration
pub struct V4l2Host {
    config: CameraConfig,
    settings: PreviewSettings,
    layout: Option<PreviewPlan>,
    permission_requested: bool,
    finished: bool,
}

impl V4l2Host {
    /// Create a host from resolved camera and preview settings
    pub fn new(config: CameraConfig, settings: PreviewSettings) -> Self {
        Self {
            config,
            settings,
            layout: None,
            permission_requested: false,
            finished: false,
        }
    }

    /// Plan most recently handed to [`CameraHost::apply_layout`]
    pub fn applied_layout(&self) -> Option<&PreviewPlan> {
        self.layout.as_ref()
    }

    /// Whether a permission request was issued
    pub fn permission_requested(&self) -> bool {
        self.permission_requested
    }

    /// Whether the session asked the host to shut down
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Device nodes the configuration allows us to use
    fn candidate_nodes(&self) -> Vec<PathBuf> {
        match self.config.device_index {
            Some(index) => vec![PathBuf::from(format!("/dev/video{index}"))],
            None => (0..10)
                .map(|i| PathBuf::from(format!("/dev/video{i}")))
                .filter(|p| p.exists())
                .collect(),
        }
    }

    fn configured_devices(&self) -> Result<Vec<CameraDevice>> {
        if let Some(ref name) = self.config.device_name {
            return Ok(vec![find_device_by_name(name)?]);
        }

        let devices = list_devices()?;
        match self.config.device_index {
            Some(index) => devices
                .into_iter()
                .find(|d| d.index == index)
                .map(|d| vec![d])
                .ok_or_else(|| {
                    Error::CameraNotFound(format!("Device /dev/video{} not found", index))
                }),
            None => Ok(devices),
        }
    }
}

fn node_accessible(path: &Path) -> bool {
    OpenOptions::new().read(true).write(true).open(path).is_ok()
}

impl CameraHost for V4l2Host {
    fn has_camera_permission(&self) -> bool {
        let nodes = self.candidate_nodes();
        // With no nodes there is nothing to be denied; opening reports the missing camera
        nodes.is_empty() || nodes.iter().any(|p| node_accessible(p))
    }

    fn request_camera_permission(&mut self) {
        self.permission_requested = true;
        tracing::warn!(
            "Camera device nodes are not accessible; access is granted through the 'video' group"
        );
    }

    fn cameras(&self) -> Result<Vec<CameraDescriptor>> {
        Ok(self
            .configured_devices()?
            .into_iter()
            .map(|d| CameraDescriptor {
                id: d.index,
                name: d.name,
                orientation: self.config.orientation,
            })
            .collect())
    }

    fn open_camera(&mut self, id: usize) -> Result<Box<dyn CaptureDevice>> {
        let info = list_devices()?
            .into_iter()
            .find(|d| d.index == id)
            .ok_or_else(|| Error::CameraNotFound(format!("Device /dev/video{} not found", id)))?;

        Ok(Box::new(V4l2Device::open(info, self.config.clone())?))
    }

    fn display_rotation(&self) -> DisplayRotation {
        self.settings.display_rotation
    }

    fn apply_layout(&mut self, plan: &PreviewPlan) {
        tracing::info!(
            layout = %plan.layout,
            scale_x = plan.transform.scale_x,
            scale_y = plan.transform.scale_y,
            "Applying preview layout"
        );
        self.layout = Some(plan.clone());
    }

    fn notify_user(&mut self, message: &str) {
        tracing::error!("{message}");
        eprintln!("{message}");
    }

    fn launch_permission_settings(&mut self) {
        tracing::info!("Grant access with: sudo usermod -aG video $USER (then log in again)");
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
