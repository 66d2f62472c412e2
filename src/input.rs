//! Synthetic pointer input.
//!
//! The loop's only externally visible effect: moving the pointer and
//! issuing a left click at a matched region's center. Also exposes the
//! current pointer position so the scheduler can watch for the
//! emergency-stop corner gesture.

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::error::ClickerError;
use crate::validator::ValidatedMatch;

/// Platform pointer boundary: click injection and position queries.
///
/// The production implementation drives the real pointer; tests use a
/// recording stub. Together with `FrameSource` this is the seam that
/// lets the whole loop run without screen or input hardware.
pub trait PointerOutput {
    /// Moves the pointer to (x, y) and issues one primary-button click.
    fn click(&mut self, x: i32, y: i32) -> Result<(), ClickerError>;

    /// Current pointer position in screen coordinates.
    fn location(&mut self) -> Result<(i32, i32), ClickerError>;
}

/// Dispatches a validated match as a single click at its center.
pub fn dispatch<P: PointerOutput>(pointer: &mut P, m: &ValidatedMatch) -> Result<(), ClickerError> {
    let (x, y) = m.target;
    pointer.click(x, y)
}

/// enigo-backed pointer. Injection failures surface as
/// `InputInjectionDenied`, which is fatal to the run: clicking blindly
/// after a refusal would mask a permissions problem.
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self, ClickerError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClickerError::InputInjectionDenied(e.to_string()))?;
        Ok(Self { enigo })
    }
}

impl PointerOutput for EnigoPointer {
    fn click(&mut self, x: i32, y: i32) -> Result<(), ClickerError> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| ClickerError::InputInjectionDenied(e.to_string()))?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ClickerError::InputInjectionDenied(e.to_string()))?;
        Ok(())
    }

    fn location(&mut self) -> Result<(i32, i32), ClickerError> {
        self.enigo
            .location()
            .map_err(|e| ClickerError::InputInjectionDenied(e.to_string()))
    }
}
