use crate::annotate::Annotator;
use crate::capture::FrameSource;
use crate::decode::{Decoder, Detection};
use crate::error::ScanError;
use crate::output::DisplaySurface;
use crate::sink::LineSink;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prefix of every console line reporting a payload
pub const DETECTION_PREFIX: &str = "QR Code detected: ";

/// What to do with a payload that is not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PayloadPolicy {
    /// Drop the detection and log a warning
    #[default]
    Skip,
    /// Replace invalid sequences with U+FFFD
    Lossy,
    /// Stop scanning with an error
    Abort,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub quit_key: char,
    pub key_wait: Duration,
    pub payload_policy: PayloadPolicy,
    /// Log timing stats every N frames, 0 disables
    pub stats_interval: u64,
    pub max_frames: Option<u64>,
    /// Checked once per iteration; set it to stop the loop
    pub stop: Option<Arc<AtomicBool>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            quit_key: 'q',
            key_wait: Duration::from_millis(1),
            payload_policy: PayloadPolicy::Skip,
            stats_interval: 30,
            max_frames: None,
            stop: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The source ran out of frames, or the frame limit was reached
    EndOfStream,
    AcquisitionFailed,
    QuitKey,
    WindowClosed,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: u64,
    /// Detections printed and drawn
    pub detections: u64,
    /// Detections dropped for invalid payloads
    pub skipped: u64,
    pub exit: ExitReason,
}

/// Payload as text under `policy`, `None` when the detection should be skipped
pub fn payload_text(
    detection: &Detection,
    policy: PayloadPolicy,
) -> Result<Option<Cow<'_, str>>, ScanError> {
    match std::str::from_utf8(&detection.payload) {
        Ok(text) => Ok(Some(Cow::Borrowed(text))),
        Err(source) => match policy {
            PayloadPolicy::Skip => {
                tracing::warn!(
                    "Skipping QR code at {}: payload is not valid UTF-8 ({} bytes)",
                    detection.rect,
                    detection.payload.len()
                );
                Ok(None)
            }
            PayloadPolicy::Lossy => Ok(Some(String::from_utf8_lossy(&detection.payload))),
            PayloadPolicy::Abort => Err(ScanError::InvalidPayload {
                rect: detection.rect,
                len: detection.payload.len(),
                source,
            }),
        },
    }
}

#[derive(Default)]
struct Timings {
    capture: Duration,
    decode: Duration,
    display: Duration,
}

impl Timings {
    fn log(&self, frame_count: u64) {
        let per_frame = |total: Duration| total.as_secs_f64() * 1000.0 / frame_count as f64;
        let capture_ms = per_frame(self.capture);
        let decode_ms = per_frame(self.decode);
        let display_ms = per_frame(self.display);
        let total_ms = capture_ms + decode_ms + display_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        tracing::info!(
            "Frame {}: capture={:.1}ms, decode={:.1}ms, display={:.1}ms, total={:.1}ms, fps={:.1}",
            frame_count,
            capture_ms,
            decode_ms,
            display_ms,
            total_ms,
            fps
        );
    }
}

/// Run the scan loop until the source is exhausted or the user quits
///
/// Each iteration acquires a frame, decodes it, prints and draws every
/// detection, shows the frame and polls for the quit key. The source is owned
/// by the loop and dropped exactly once when it ends, whatever the outcome.
/// Acquisition failures end the loop normally; decoder, display and console
/// failures are returned as errors.
pub fn run_scan<S, D, V, K>(
    source: S,
    decoder: &mut D,
    annotator: &Annotator,
    display: &mut V,
    sink: &mut K,
    options: &ScanOptions,
) -> Result<ScanSummary, ScanError>
where
    S: FrameSource,
    D: Decoder + ?Sized,
    V: DisplaySurface + ?Sized,
    K: LineSink + ?Sized,
{
    let mut source = source;
    let result = scan_frames(&mut source, decoder, annotator, display, sink, options);
    drop(source);
    tracing::debug!("Frame source released");

    if let Ok(summary) = &result {
        tracing::info!(
            "Scan finished ({:?}): {} frames, {} QR codes, {} skipped",
            summary.exit,
            summary.frames,
            summary.detections,
            summary.skipped
        );
    }
    result
}

fn scan_frames<S, D, V, K>(
    source: &mut S,
    decoder: &mut D,
    annotator: &Annotator,
    display: &mut V,
    sink: &mut K,
    options: &ScanOptions,
) -> Result<ScanSummary, ScanError>
where
    S: FrameSource,
    D: Decoder + ?Sized,
    V: DisplaySurface + ?Sized,
    K: LineSink + ?Sized,
{
    let mut frames = 0u64;
    let mut detections_reported = 0u64;
    let mut skipped = 0u64;
    let mut timings = Timings::default();

    let exit = loop {
        if let Some(stop) = &options.stop {
            if stop.load(Ordering::SeqCst) {
                tracing::info!("Stop requested");
                break ExitReason::Interrupted;
            }
        }
        if options.max_frames.is_some_and(|max| frames >= max) {
            tracing::info!("Frame limit reached");
            break ExitReason::EndOfStream;
        }

        // Capture frame
        let capture_start = Instant::now();
        let mut frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("Frame source exhausted");
                break ExitReason::EndOfStream;
            }
            Err(e) => {
                tracing::warn!("Frame acquisition failed: {:#}", e);
                break ExitReason::AcquisitionFailed;
            }
        };
        timings.capture += capture_start.elapsed();

        // Decode
        let decode_start = Instant::now();
        let detections = decoder.decode(&frame).map_err(ScanError::Decode)?;
        timings.decode += decode_start.elapsed();

        for detection in &detections {
            annotator.draw_outline(&mut frame, detection.rect);

            let Some(text) = payload_text(detection, options.payload_policy)? else {
                skipped += 1;
                continue;
            };

            sink.emit(&format!("{}{}", DETECTION_PREFIX, text))
                .map_err(ScanError::Sink)?;
            tracing::debug!(
                "QR code at {} ({} bytes)",
                detection.rect,
                detection.payload.len()
            );

            annotator.draw_label(&mut frame, detection.rect, &text);
            detections_reported += 1;
        }

        // Display
        let display_start = Instant::now();
        display.show(&frame).map_err(ScanError::Display)?;
        timings.display += display_start.elapsed();

        frames += 1;
        if options.stats_interval > 0 && frames % options.stats_interval == 0 {
            timings.log(frames);
        }

        let key = display
            .poll_key(options.key_wait)
            .map_err(ScanError::Display)?;
        if key.is_some_and(|key| key.eq_ignore_ascii_case(&options.quit_key)) {
            tracing::info!("Quit key pressed");
            break ExitReason::QuitKey;
        }
        if !display.is_open() {
            tracing::info!("Display closed");
            break ExitReason::WindowClosed;
        }
    };

    Ok(ScanSummary {
        frames,
        detections: detections_reported,
        skipped,
        exit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Rect;

    #[test]
    fn test_valid_payload() {
        let detection = Detection::new(Rect::new(0, 0, 1, 1), "HELLO");
        for policy in [PayloadPolicy::Skip, PayloadPolicy::Lossy, PayloadPolicy::Abort] {
            let text = payload_text(&detection, policy).unwrap().unwrap();
            assert_eq!(text, "HELLO");
        }
    }

    #[test]
    fn test_invalid_payload_policies() {
        let detection = Detection::new(Rect::new(4, 5, 6, 7), vec![b'O', b'K', 0xff]);

        assert!(payload_text(&detection, PayloadPolicy::Skip)
            .unwrap()
            .is_none());

        let lossy = payload_text(&detection, PayloadPolicy::Lossy)
            .unwrap()
            .unwrap();
        assert_eq!(lossy, "OK\u{fffd}");

        let err = payload_text(&detection, PayloadPolicy::Abort).unwrap_err();
        match err {
            ScanError::InvalidPayload { rect, len, .. } => {
                assert_eq!(rect, Rect::new(4, 5, 6, 7));
                assert_eq!(len, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
