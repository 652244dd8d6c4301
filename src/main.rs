//! campreview daemon entrypoint

#[cfg(not(feature = "camera"))]
compile_error!("campreviewd requires the `camera` feature");

use campreview::preview::parse_resolution_list;
use campreview::session::{PlanInputs, plan_preview};
use campreview::{
    CameraDescriptor, CameraHost, CampreviewConfig, Error, PixelFormat, PreviewPlan,
    PreviewSettings, Result, SessionController, SessionEvent, SessionState, V4l2Host, camera,
    logging,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "campreviewd",
    version,
    about = "Negotiate and run a live camera preview"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to campreview.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override camera by name (takes precedence over config file)
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Override camera by index (/dev/videoN)
    #[arg(long, value_name = "INDEX")]
    device_index: Option<usize>,

    /// Long-side threshold used to pick the preview size
    #[arg(long, value_name = "PIXELS")]
    threshold: Option<u32>,

    /// Display rotation in degrees (0, 90, 180, 270)
    #[arg(long, value_name = "DEGREES")]
    display_rotation: Option<String>,

    /// Preview view size as WxH
    #[arg(long, value_name = "WxH")]
    view: Option<String>,

    /// Sensor mount angle in degrees
    #[arg(long, value_name = "DEGREES")]
    mount_angle: Option<u32>,

    /// Camera facing (front or back)
    #[arg(long, value_name = "FACING")]
    facing: Option<String>,

    /// Plan offline from a list of supported sizes (e.g. 640x480,1280x720) instead of opening a camera
    #[arg(long, value_name = "SIZES")]
    sizes: Option<String>,

    /// Stop after this many frames (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Output the preview plan as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// List detected cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_cameras {
        list_cameras()?;
        return Ok(());
    }

    let mut config = CampreviewConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&cli, &mut config);

    logging::init(&config.logging)?;

    let settings = config.preview_settings()?;

    if let Some(ref sizes) = cli.sizes {
        let plan = plan_offline(sizes, &config, settings)?;
        return print_plan(&plan, cli.json);
    }

    let camera_config = config.camera_config()?;
    info!(?camera_config, ?settings, "Starting campreview");

    let host = V4l2Host::new(camera_config, settings);
    let mut controller = SessionController::new(host, settings.threshold);

    let mut state = controller.dispatch(SessionEvent::SurfaceAvailable(settings.view))?;
    if state == SessionState::AwaitingPermission {
        let event = if controller.host().has_camera_permission() {
            SessionEvent::PermissionGranted
        } else {
            SessionEvent::PermissionDenied
        };
        state = controller.dispatch(event)?;
    }

    if state != SessionState::Previewing {
        return Err(Error::PermissionDenied(
            "camera device nodes are not accessible".to_string(),
        ));
    }

    if let Some(plan) = controller.plan() {
        print_plan(plan, cli.json)?;
    }

    let result = run_preview(&mut controller, cli.frames).await;
    controller.dispatch(SessionEvent::SurfaceDestroyed)?;
    result
}

fn apply_cli_overrides(cli: &Cli, config: &mut CampreviewConfig) {
    if let Some(ref name) = cli.device {
        config.camera.device_name = Some(name.clone());
        config.camera.device_index = None;
    }

    if let Some(index) = cli.device_index {
        config.camera.device_index = Some(index);
        config.camera.device_name = None;
    }

    if let Some(angle) = cli.mount_angle {
        config.camera.mount_angle = Some(angle);
    }

    if let Some(ref facing) = cli.facing {
        config.camera.facing = Some(facing.clone());
    }

    if let Some(threshold) = cli.threshold {
        config.preview.threshold = Some(threshold);
    }

    if let Some(ref rotation) = cli.display_rotation {
        config.preview.display_rotation = Some(rotation.clone());
    }

    if let Some(ref view) = cli.view {
        config.preview.view = Some(view.clone());
    }
}

fn plan_offline(
    sizes: &str,
    config: &CampreviewConfig,
    settings: PreviewSettings,
) -> Result<PreviewPlan> {
    let supported = parse_resolution_list(sizes)?;
    let format = match config.camera.format.as_deref() {
        Some(raw) => PixelFormat::parse(raw)
            .ok_or_else(|| Error::Config(format!("Unknown pixel format '{raw}'")))?,
        None => PixelFormat::Yuyv,
    };
    let camera = CameraDescriptor {
        id: config.camera.device_index.unwrap_or(0),
        name: config
            .camera
            .device_name
            .clone()
            .unwrap_or_else(|| "offline".to_string()),
        orientation: config.camera.orientation()?,
    };

    plan_preview(PlanInputs {
        camera: &camera,
        supported: &supported,
        original: None,
        display_rotation: settings.display_rotation,
        threshold: settings.threshold,
        view: settings.view,
        format,
    })
}

fn print_plan(plan: &PreviewPlan, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    println!("Camera:        [{}] {}", plan.camera_id, plan.camera_name);
    println!(
        "Orientation:   {} facing, mounted at {}°, display {}",
        plan.orientation.facing, plan.orientation.mount_angle, plan.display_rotation
    );
    println!("Rotation:      {}°", plan.rotation);
    match plan.original {
        Some(original) if plan.needs_resize() => {
            println!("Preview size:  {} (was {})", plan.preview, original)
        }
        _ => println!("Preview size:  {}", plan.preview),
    }
    println!("Layout:        {}", plan.layout);
    println!(
        "Transform:     scale {:.3}x{:.3} about ({}, {})",
        plan.transform.scale_x,
        plan.transform.scale_y,
        plan.transform.pivot_x,
        plan.transform.pivot_y
    );
    println!("Frame buffer:  {} bytes ({})", plan.buffer_len, plan.format);
    Ok(())
}

async fn run_preview(controller: &mut SessionController<V4l2Host>, limit: u64) -> Result<()> {
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut frames: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut interrupt => {
                info!(frames, "Interrupted, stopping preview");
                break;
            }
            frame = async { tokio::task::block_in_place(|| controller.pump_frame()) } => {
                match frame {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    // Gives the interrupt branch a chance on idle cameras
                    Err(Error::FrameTimeout) => continue,
                    Err(e) => return Err(e),
                }
                frames += 1;
                if limit > 0 && frames >= limit {
                    info!(frames, "Frame limit reached");
                    break;
                }
            }
        }
    }

    Ok(())
}

fn list_cameras() -> Result<()> {
    let devices = camera::list_devices()?;
    println!("Discovered cameras:");
    for dev in devices {
        println!("  [{}] {} ({}, {})", dev.index, dev.name, dev.path, dev.driver);
    }
    Ok(())
}
