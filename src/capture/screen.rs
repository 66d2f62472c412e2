//! xcap-backed full-screen capture of the primary monitor.

use image::DynamicImage;

use crate::capture::{Frame, FrameSource};
use crate::error::ClickerError;

/// Captures the primary monitor via xcap.
///
/// Falls back to the first monitor if none is flagged primary. Every
/// `capture` call takes a fresh snapshot; failures (no monitor, denied
/// screen access) surface as `CaptureUnavailable`, which the scheduler
/// treats as a per-cycle miss rather than a fatal error.
pub struct ScreenFrameSource;

impl ScreenFrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for ScreenFrameSource {
    fn capture(&mut self) -> Result<Frame, ClickerError> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| ClickerError::CaptureUnavailable(format!("monitor enumeration failed: {}", e)))?;

        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| ClickerError::CaptureUnavailable("no monitors found".to_string()))?;

        let rgba = monitor
            .capture_image()
            .map_err(|e| ClickerError::CaptureUnavailable(format!("screen capture failed: {}", e)))?;

        let gray = DynamicImage::ImageRgba8(rgba).to_luma8();
        Ok(Frame::new(gray))
    }
}
