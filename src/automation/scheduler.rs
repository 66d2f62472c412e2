//! Polling scheduler: the capture→match→click loop.
//!
//! Advances one state transition per `step()` call, with cancellation
//! checked before every transition and inside every sleep slice. A
//! cycle is strictly sequential: one capture, one pass over the corpus
//! in priority order, at most one click, one sleep.

use std::time::{Duration, Instant};

use crate::automation::config::Config;
use crate::automation::state::{CancelToken, LoopState, SchedulerState};
use crate::capture::{Frame, FrameSource};
use crate::corpus::Corpus;
use crate::error::ClickerError;
use crate::input::{dispatch, PointerOutput};
use crate::matcher::TemplateMatcher;
use crate::validator::{validate, ValidatedMatch};

pub struct Scheduler<F, M, P>
where
    F: FrameSource,
    M: TemplateMatcher,
    P: PointerOutput,
{
    config: Config,
    corpus: Corpus,
    frames: F,
    matcher: M,
    pointer: P,
    cancel: CancelToken,
    pub state: SchedulerState,
    pub counters: LoopState,
    /// Frame captured this cycle, consumed by Matching.
    frame: Option<Frame>,
    /// Accepted match this cycle, consumed by Dispatching.
    pending: Option<ValidatedMatch>,
}

impl<F, M, P> Scheduler<F, M, P>
where
    F: FrameSource,
    M: TemplateMatcher,
    P: PointerOutput,
{
    pub fn new(
        config: Config,
        corpus: Corpus,
        frames: F,
        matcher: M,
        pointer: P,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            corpus,
            frames,
            matcher,
            pointer,
            cancel,
            state: SchedulerState::Idle,
            counters: LoopState::default(),
            frame: None,
            pending: None,
        }
    }

    /// Runs the loop until a terminal state.
    ///
    /// Clean cancellation (interrupt or emergency corner) returns the
    /// final counters; only `InputInjectionDenied` comes back as an
    /// error.
    pub fn run(&mut self) -> Result<LoopState, ClickerError> {
        loop {
            match self.step() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    crate::log(&format!("Loop stopped: {}", e));
                    return Err(e);
                }
            }
        }
        Ok(self.counters)
    }

    /// Advances the state machine by one transition.
    ///
    /// Returns `Ok(true)` to continue, `Ok(false)` on a terminal state.
    /// Cycle-level capture failures are absorbed here as misses; they
    /// never cross a cycle boundary.
    pub fn step(&mut self) -> Result<bool, ClickerError> {
        if self.should_stop() {
            self.state = SchedulerState::Stopped;
            return Ok(false);
        }

        match self.state {
            SchedulerState::Idle => {
                crate::log(&format!(
                    "Watching for {} reference image(s)",
                    self.corpus.len()
                ));
                self.state = SchedulerState::Capturing;
                Ok(true)
            }

            SchedulerState::Capturing => {
                match self.frames.capture() {
                    Ok(frame) => {
                        self.frame = Some(frame);
                        self.state = SchedulerState::Matching;
                    }
                    Err(e) => {
                        // Recoverable: count the cycle as a miss.
                        crate::log(&format!("Capture failed, treating as miss: {}", e));
                        self.counters.cycles += 1;
                        self.state = SchedulerState::WaitingNoMatch;
                    }
                }
                Ok(true)
            }

            SchedulerState::Matching => {
                let frame = self
                    .frame
                    .take()
                    .expect("Matching entered without a captured frame");
                self.counters.cycles += 1;

                // First accepted match in corpus order wins; remaining
                // references are not searched.
                let mut accepted = None;
                for reference in self.corpus.references() {
                    let Some(raw) = self.matcher.find(&frame, reference) else {
                        continue;
                    };
                    if let Some(m) = validate(
                        &raw,
                        reference,
                        self.config.confidence_threshold,
                        self.config.size_tolerance,
                    ) {
                        accepted = Some(m);
                        break;
                    }
                }

                let search_ms = frame.captured_at.elapsed().as_millis();
                match accepted {
                    Some(m) => {
                        self.pending = Some(m);
                        self.state = SchedulerState::Dispatching;
                    }
                    None => {
                        crate::log(&format!(
                            "No match (cycle {}, searched in {}ms)",
                            self.counters.cycles, search_ms
                        ));
                        self.state = SchedulerState::WaitingNoMatch;
                    }
                }
                Ok(true)
            }

            SchedulerState::Dispatching => {
                let m = self
                    .pending
                    .take()
                    .expect("Dispatching entered without an accepted match");

                // InputInjectionDenied is fatal and propagates.
                dispatch(&mut self.pointer, &m)?;
                self.counters.clicks += 1;

                crate::log(&format!(
                    "Clicked '{}' at ({}, {}) confidence {:.3} - total clicks: {}",
                    m.reference, m.target.0, m.target.1, m.confidence, self.counters.clicks
                ));

                if self.sleep_cancellable(self.config.post_click_delay_ms) {
                    self.state = SchedulerState::Stopped;
                    return Ok(false);
                }
                self.state = SchedulerState::Capturing;
                Ok(true)
            }

            SchedulerState::WaitingNoMatch => {
                if self.sleep_cancellable(self.config.no_match_delay_ms) {
                    self.state = SchedulerState::Stopped;
                    return Ok(false);
                }
                self.state = SchedulerState::Capturing;
                Ok(true)
            }

            SchedulerState::Stopped => Ok(false),
        }
    }

    /// True when the loop must stop: explicit cancellation or the
    /// pointer parked in the emergency corner.
    fn should_stop(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        if self.pointer_in_emergency_corner() {
            crate::log("Emergency stop: pointer in the top-left corner");
            self.cancel.cancel();
            return true;
        }
        false
    }

    /// Emergency-stop gesture: pointer inside the top-left corner
    /// square. A failed position query is not a stop condition.
    fn pointer_in_emergency_corner(&mut self) -> bool {
        let corner = self.config.emergency_corner_px;
        if corner <= 0 {
            return false;
        }
        match self.pointer.location() {
            Ok((x, y)) => x <= corner && y <= corner,
            Err(_) => false,
        }
    }

    /// Sleeps for `total_ms`, waking every `cancel_poll_ms` to check
    /// for cancellation. Returns true if the sleep was cancelled.
    fn sleep_cancellable(&mut self, total_ms: u64) -> bool {
        let slice = Duration::from_millis(self.config.cancel_poll_ms.max(1));
        let deadline = Instant::now() + Duration::from_millis(total_ms);
        loop {
            if self.should_stop() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}
