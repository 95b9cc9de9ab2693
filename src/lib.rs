//! Live QR code scanner.
//!
//! Frames come from a [`capture::FrameSource`], QR codes are located and read
//! by a [`decode::Decoder`], and [`scan::run_scan`] prints each payload,
//! outlines it on the frame and presents the frame on a
//! [`output::DisplaySurface`] until the source runs dry or the quit key is
//! pressed.

pub mod annotate;
pub mod capture;
pub mod decode;
pub mod error;
pub mod output;
pub mod scan;
pub mod sink;

pub use annotate::Annotator;
pub use decode::{Detection, Rect};
pub use error::ScanError;
pub use scan::{run_scan, ExitReason, PayloadPolicy, ScanOptions, ScanSummary};
