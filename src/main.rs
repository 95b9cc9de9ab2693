use anyhow::{Context, Result};
use clap::Parser;
use qr_scan::annotate::{self, Annotator};
use qr_scan::capture::{FrameSource, ImageSequence};
use qr_scan::decode::RqrrDecoder;
use qr_scan::output::{DisplaySurface, Headless, SnapshotDir};
use qr_scan::sink::Console;
use qr_scan::{run_scan, PayloadPolicy, ScanOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Read frames from an image file or a directory of images instead of the webcam
    #[arg(long)]
    input: Option<PathBuf>,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Requested camera frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Preview window title
    #[arg(long, default_value = "QR Scanner")]
    window_title: String,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,

    /// Key that stops the scanner
    #[arg(long, default_value_t = 'q')]
    quit_key: char,

    /// How long to wait for a key press after each frame, in milliseconds
    #[arg(long, default_value_t = 1)]
    key_wait_ms: u64,

    /// What to do with QR payloads that are not valid UTF-8
    #[arg(long, value_enum, default_value_t = PayloadPolicy::Skip)]
    on_invalid_utf8: PayloadPolicy,

    /// Font file for payload labels (the bundled DejaVu Sans Mono if omitted)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also save every annotated frame as PNG into this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Also publish annotated frames to this v4l2loopback device
    #[arg(short, long)]
    output_device: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for payload lines
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("QR scanner starting");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    // Initialize capture
    let source = open_source(&args)?;
    let (width, height) = source.resolution();
    tracing::info!("Capture: {}x{}", width, height);

    let mut display = open_displays(&args, width, height)?;

    let annotator = match &args.font {
        Some(path) => {
            tracing::info!("Label font: {}", path.display());
            Annotator::with_font(annotate::load_font(path)?)
        }
        None => Annotator::new()?,
    };

    let options = ScanOptions {
        quit_key: args.quit_key,
        key_wait: Duration::from_millis(args.key_wait_ms),
        payload_policy: args.on_invalid_utf8,
        max_frames: args.max_frames,
        stop: Some(stop),
        ..ScanOptions::default()
    };

    tracing::info!(
        "Starting QR code scanner. Press '{}' to quit.",
        args.quit_key
    );

    // Main loop
    run_scan(
        source,
        &mut RqrrDecoder::new(),
        &annotator,
        &mut display,
        &mut Console,
        &options,
    )?;

    Ok(())
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    if let Some(input) = &args.input {
        let sequence = ImageSequence::open(input).context("Failed to open input images")?;
        return Ok(Box::new(sequence));
    }
    open_webcam(args)
}

#[cfg(feature = "camera")]
fn open_webcam(args: &Args) -> Result<Box<dyn FrameSource>> {
    let capture = qr_scan::capture::WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
        args.fps,
    )
    .context("Failed to initialize webcam capture")?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "camera"))]
fn open_webcam(_args: &Args) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("Built without the `camera` feature; pass --input to read image files")
}

fn open_displays(args: &Args, width: u32, height: u32) -> Result<Vec<Box<dyn DisplaySurface>>> {
    let mut surfaces: Vec<Box<dyn DisplaySurface>> = Vec::new();

    if !args.headless {
        surfaces.push(open_window(&args.window_title)?);
    }

    if let Some(dir) = &args.snapshot_dir {
        surfaces.push(Box::new(SnapshotDir::new(dir)?));
    }

    if let Some(device) = &args.output_device {
        surfaces.push(open_loopback(device, width, height)?);
    }

    if surfaces.is_empty() {
        tracing::info!("Running headless, press Ctrl+C to stop");
        surfaces.push(Box::new(Headless));
    }

    Ok(surfaces)
}

#[cfg(feature = "window")]
fn open_window(title: &str) -> Result<Box<dyn DisplaySurface>> {
    Ok(Box::new(qr_scan::output::PreviewWindow::new(title)))
}

#[cfg(not(feature = "window"))]
fn open_window(_title: &str) -> Result<Box<dyn DisplaySurface>> {
    anyhow::bail!("Built without the `window` feature; pass --headless")
}

#[cfg(all(feature = "loopback", target_os = "linux"))]
fn open_loopback(device: &std::path::Path, width: u32, height: u32) -> Result<Box<dyn DisplaySurface>> {
    let output = qr_scan::output::V4L2Output::new(device, width, height)
        .context("Failed to initialize v4l2loopback output")?;
    Ok(Box::new(output))
}

#[cfg(not(all(feature = "loopback", target_os = "linux")))]
fn open_loopback(_device: &std::path::Path, _width: u32, _height: u32) -> Result<Box<dyn DisplaySurface>> {
    anyhow::bail!("Built without the `loopback` feature; v4l2loopback output is unavailable")
}
