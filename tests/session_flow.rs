use std::cell::RefCell;
use std::rc::Rc;

use campreview::session::PERMISSION_REQUIRED_MESSAGE;
use campreview::{
    CameraDescriptor, CameraHost, CaptureDevice, DeviceOrientationInfo, DisplayRotation, Error,
    Facing, PixelFormat, PreviewFrame, PreviewPlan, PreviewSize, Resolution, Result,
    SessionController, SessionEvent, SessionState, ViewSize,
};

type CallLog = Rc<RefCell<Vec<String>>>;

struct FakeDevice {
    log: CallLog,
    supported: Vec<Resolution>,
    current: Option<Resolution>,
    streaming: bool,
    sequence: u32,
    timeouts: u32,
}

impl CaptureDevice for FakeDevice {
    fn supported_preview_sizes(&self) -> Result<Vec<Resolution>> {
        Ok(self.supported.clone())
    }

    fn preview_size(&self) -> Result<Option<Resolution>> {
        self.log.borrow_mut().push("read_size".to_string());
        Ok(self.current)
    }

    fn set_preview_size(&mut self, size: Resolution) -> Result<()> {
        self.log.borrow_mut().push(format!("set_size {size}"));
        self.current = Some(size);
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<()> {
        self.log.borrow_mut().push(format!("orientation {degrees}"));
        Ok(())
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Nv21
    }

    fn start_preview(&mut self, plan: &PreviewPlan) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("start {}", plan.buffer_len));
        self.streaming = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<PreviewFrame> {
        if !self.streaming {
            return Err(Error::FrameCapture("not streaming".to_string()));
        }
        if self.timeouts > 0 {
            self.timeouts -= 1;
            return Err(Error::FrameTimeout);
        }
        self.sequence += 1;
        Ok(PreviewFrame {
            sequence: self.sequence,
            data: vec![0u8; 16],
        })
    }

    fn stop_preview(&mut self) -> Result<()> {
        self.log.borrow_mut().push("stop".to_string());
        self.streaming = false;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.log.borrow_mut().push("release".to_string());
        Ok(())
    }
}

struct FakeHost {
    log: CallLog,
    permission: bool,
    cameras: Vec<CameraDescriptor>,
    supported: Vec<Resolution>,
    current: Option<Resolution>,
    frame_timeouts: u32,
    rotation: DisplayRotation,
    opened: Vec<usize>,
    layouts: Vec<PreviewPlan>,
    messages: Vec<String>,
    permission_requests: usize,
    settings_launched: bool,
    finished: bool,
}

impl FakeHost {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            permission: true,
            cameras: vec![
                descriptor(0, 270, Facing::Front),
                descriptor(1, 90, Facing::Back),
            ],
            supported: vec![
                Resolution { width: 320, height: 240 },
                Resolution { width: 640, height: 480 },
                Resolution { width: 1280, height: 720 },
            ],
            current: Some(Resolution { width: 640, height: 480 }),
            frame_timeouts: 0,
            rotation: DisplayRotation::Rot0,
            opened: Vec::new(),
            layouts: Vec::new(),
            messages: Vec::new(),
            permission_requests: 0,
            settings_launched: false,
            finished: false,
        }
    }
}

impl CameraHost for FakeHost {
    fn has_camera_permission(&self) -> bool {
        self.permission
    }

    fn request_camera_permission(&mut self) {
        self.permission_requests += 1;
    }

    fn cameras(&self) -> Result<Vec<CameraDescriptor>> {
        Ok(self.cameras.clone())
    }

    fn open_camera(&mut self, id: usize) -> Result<Box<dyn CaptureDevice>> {
        self.opened.push(id);
        Ok(Box::new(FakeDevice {
            log: self.log.clone(),
            supported: self.supported.clone(),
            current: self.current,
            streaming: false,
            sequence: 0,
            timeouts: self.frame_timeouts,
        }))
    }

    fn display_rotation(&self) -> DisplayRotation {
        self.rotation
    }

    fn apply_layout(&mut self, plan: &PreviewPlan) {
        self.layouts.push(plan.clone());
    }

    fn notify_user(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn launch_permission_settings(&mut self) {
        self.settings_launched = true;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

fn descriptor(id: usize, mount_angle: u32, facing: Facing) -> CameraDescriptor {
    CameraDescriptor {
        id,
        name: format!("fake{id}"),
        orientation: DeviceOrientationInfo {
            mount_angle,
            facing,
        },
    }
}

fn controller() -> (SessionController<FakeHost>, CallLog) {
    let log = CallLog::default();
    let host = FakeHost::new(log.clone());
    (SessionController::new(host, 720), log)
}

const PHONE_VIEW: ViewSize = ViewSize {
    width: 1080,
    height: 2400,
};

#[test]
fn surface_with_permission_starts_back_camera() {
    let (mut controller, log) = controller();

    let state = controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .expect("start preview");
    assert_eq!(state, SessionState::Previewing);
    assert_eq!(controller.host().opened, vec![1]);

    let plan = controller.plan().expect("plan");
    assert_eq!(plan.rotation, 90);
    assert_eq!(
        plan.preview,
        PreviewSize {
            long_side: 1280,
            short_side: 720
        }
    );
    assert_eq!(plan.layout, ViewSize::new(1080, 1920));
    assert_eq!(controller.host().layouts.len(), 1);

    assert_eq!(
        *log.borrow(),
        vec![
            "orientation 90".to_string(),
            "read_size".to_string(),
            "set_size 1280x720".to_string(),
            format!("start {}", 1280 * 720 * 3 / 2),
        ]
    );
}

#[test]
fn matching_original_size_is_not_reapplied() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.current = Some(Resolution { width: 1280, height: 720 });
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .expect("start preview");

    assert!(!log.borrow().iter().any(|c| c.starts_with("set_size")));
}

#[test]
fn portrait_active_size_is_not_reapplied() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.supported = vec![Resolution { width: 720, height: 1280 }];
    host.current = Some(Resolution { width: 720, height: 1280 });
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .expect("start preview");

    assert!(!controller.plan().unwrap().needs_resize());
    assert!(!log.borrow().iter().any(|c| c.starts_with("set_size")));
}

#[test]
fn permission_grant_uses_remembered_surface() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.permission = false;
    let mut controller = SessionController::new(host, 720);

    let state = controller
        .dispatch(SessionEvent::SurfaceAvailable(ViewSize::new(1000, 1000)))
        .unwrap();
    assert_eq!(state, SessionState::AwaitingPermission);
    assert_eq!(controller.host().permission_requests, 1);
    assert!(controller.host().opened.is_empty());

    let state = controller.dispatch(SessionEvent::PermissionGranted).unwrap();
    assert_eq!(state, SessionState::Previewing);
    // 1280x720 in a square view keeps the view height
    assert_eq!(controller.plan().unwrap().layout, ViewSize::new(562, 1000));
}

#[test]
fn permission_denial_finishes_session() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.permission = false;
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();
    let state = controller.dispatch(SessionEvent::PermissionDenied).unwrap();

    assert_eq!(state, SessionState::Finished);
    let host = controller.host();
    assert_eq!(host.messages, vec![PERMISSION_REQUIRED_MESSAGE.to_string()]);
    assert!(host.settings_launched);
    assert!(host.finished);

    // Finished absorbs everything
    let state = controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();
    assert_eq!(state, SessionState::Finished);
    assert!(controller.host().opened.is_empty());
}

#[test]
fn surface_destroyed_releases_camera() {
    let (mut controller, log) = controller();

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();
    let state = controller.dispatch(SessionEvent::SurfaceDestroyed).unwrap();

    assert_eq!(state, SessionState::Idle);
    assert!(controller.plan().is_none());
    assert!(controller.pump_frame().unwrap().is_none());

    let calls = log.borrow();
    assert_eq!(&calls[calls.len() - 2..], ["stop", "release"]);
}

#[test]
fn surface_destroyed_while_waiting_returns_to_idle() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.permission = false;
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();
    let state = controller.dispatch(SessionEvent::SurfaceDestroyed).unwrap();
    assert_eq!(state, SessionState::Idle);

    // A late grant without a surface is ignored
    let state = controller.dispatch(SessionEvent::PermissionGranted).unwrap();
    assert_eq!(state, SessionState::Idle);
    assert!(controller.host().opened.is_empty());
}

#[test]
fn failed_start_releases_device_and_keeps_state() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.supported.clear();
    let mut controller = SessionController::new(host, 720);

    let result = controller.dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW));
    assert!(matches!(result, Err(Error::NoSupportedSizes)));
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(*log.borrow(), vec!["orientation 90", "read_size", "release"]);
}

#[test]
fn missing_camera_is_reported() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.cameras.clear();
    let mut controller = SessionController::new(host, 720);

    let result = controller.dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW));
    assert!(matches!(result, Err(Error::CameraNotFound(_))));
    assert!(log.borrow().is_empty());
}

#[test]
fn front_only_device_is_mirror_compensated() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.cameras = vec![descriptor(4, 270, Facing::Front)];
    host.rotation = DisplayRotation::Rot90;
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();

    assert_eq!(controller.host().opened, vec![4]);
    assert_eq!(controller.plan().unwrap().rotation, 0);
}

#[test]
fn frames_are_pumped_while_previewing() {
    let (mut controller, _log) = controller();
    assert!(controller.pump_frame().unwrap().is_none());

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();

    let first = controller.pump_frame().unwrap().expect("frame");
    let second = controller.pump_frame().unwrap().expect("frame");
    assert_eq!((first.sequence, second.sequence), (1, 2));
}

#[test]
fn frame_timeout_keeps_preview_running() {
    let log = CallLog::default();
    let mut host = FakeHost::new(log.clone());
    host.frame_timeouts = 1;
    let mut controller = SessionController::new(host, 720);

    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();

    assert!(matches!(controller.pump_frame(), Err(Error::FrameTimeout)));
    assert_eq!(controller.state(), SessionState::Previewing);

    let frame = controller.pump_frame().unwrap().expect("frame");
    assert_eq!(frame.sequence, 1);
    assert!(!log.borrow().iter().any(|c| c == "stop" || c == "release"));
}

#[test]
fn unexpected_events_are_ignored() {
    let (mut controller, log) = controller();

    assert_eq!(
        controller.dispatch(SessionEvent::PermissionDenied).unwrap(),
        SessionState::Idle
    );
    controller
        .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
        .unwrap();
    assert_eq!(
        controller
            .dispatch(SessionEvent::SurfaceAvailable(PHONE_VIEW))
            .unwrap(),
        SessionState::Previewing
    );
    assert_eq!(controller.host().opened.len(), 1);
    assert!(!controller.host().finished);
    drop(controller);

    assert_eq!(log.borrow().last().map(String::as_str), Some("release"));
}
