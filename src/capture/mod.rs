//! Screen capture for the detection loop.
//!
//! This module provides:
//! - The per-cycle [`Frame`] snapshot type
//! - The [`FrameSource`] boundary trait the scheduler captures through
//! - The xcap-backed production source (`ScreenFrameSource`)

pub mod screen;

pub use screen::ScreenFrameSource;

use image::GrayImage;
use std::time::Instant;

use crate::error::ClickerError;

/// One full-screen snapshot, grayscale-normalized for matching.
///
/// Created fresh every cycle and dropped at the end of it; frames are
/// never cached or reused.
pub struct Frame {
    pub pixels: GrayImage,
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(pixels: GrayImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            pixels,
            width,
            height,
            captured_at: Instant::now(),
        }
    }
}

/// Source of screen snapshots.
///
/// The production implementation talks to the display server; tests
/// substitute scripted frames. This is the capture half of the seam
/// that keeps the loop testable without real hardware.
pub trait FrameSource {
    /// Captures the screen as it is right now. No caching.
    fn capture(&mut self) -> Result<Frame, ClickerError>;
}
