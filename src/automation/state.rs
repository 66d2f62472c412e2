//! Scheduler states, loop counters, and the cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polling scheduler states.
///
/// One detection cycle walks Capturing → Matching → (Dispatching |
/// WaitingNoMatch) and back to Capturing. Stopped is terminal and
/// reachable from anywhere via cancellation.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerState {
    /// Corpus loaded, loop not yet started
    Idle,
    /// Taking a screen snapshot
    Capturing,
    /// Searching the snapshot for references, in corpus order
    Matching,
    /// One accepted match this cycle; clicking it
    Dispatching,
    /// Nothing matched this cycle; backing off
    WaitingNoMatch,
    /// Cancelled or emergency-stopped
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "Idle"),
            SchedulerState::Capturing => write!(f, "Capturing"),
            SchedulerState::Matching => write!(f, "Matching"),
            SchedulerState::Dispatching => write!(f, "Dispatching"),
            SchedulerState::WaitingNoMatch => write!(f, "Waiting (no match)"),
            SchedulerState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopState {
    /// Completed capture→search→(act|wait) cycles
    pub cycles: u64,
    /// Successfully dispatched clicks
    pub clicks: u64,
}

/// Shared cancellation flag.
///
/// Cloned into the Ctrl+C handler; the scheduler polls it between
/// state transitions and inside every sleep slice so cancellation
/// takes effect promptly, not at the next cycle boundary.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", SchedulerState::Idle), "Idle");
        assert_eq!(
            format!("{}", SchedulerState::WaitingNoMatch),
            "Waiting (no match)"
        );
        assert_eq!(format!("{}", SchedulerState::Stopped), "Stopped");
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
