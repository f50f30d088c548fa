use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::sequencer::{TypingSequencer, TypingSession};
use crate::sink::{KeyPressVisualizer, TextSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(TypingSession),
    Cancelled(Option<TypingSession>),
    Idle,
}

/// Run the sequencer to completion on a simulated clock starting at `now_ms`.
///
/// Time jumps straight to each due continuation; `on_wait` sees every jump.
pub fn run_virtual<S, V>(
    seq: &mut TypingSequencer<S, V>,
    now_ms: u64,
    mut on_wait: impl FnMut(u64),
) -> RunOutcome
where
    S: TextSink,
    V: KeyPressVisualizer,
{
    let mut now = now_ms;
    while let Some(due) = seq.next_due() {
        if due > now {
            on_wait(due - now);
            now = due;
        }
        if let Some(fired) = seq.fire(now) {
            if let Some(session) = fired.completed {
                return RunOutcome::Completed(session);
            }
        }
    }
    RunOutcome::Idle
}

#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
    }
}

pub(crate) fn sleep_interruptible(stop: &AtomicBool, ms: u64) {
    let mut remaining = ms;
    while remaining > 0 {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(50);
        std::thread::sleep(Duration::from_millis(step));
        remaining -= step;
    }
}

/// Run the sequencer in real time. Setting `stop` cancels the session at the
/// next check, within one sleep slice.
pub fn run_wall_clock<S, V>(
    seq: &mut TypingSequencer<S, V>,
    clock: &WallClock,
    stop: &AtomicBool,
) -> RunOutcome
where
    S: TextSink,
    V: KeyPressVisualizer,
{
    while let Some(due) = seq.next_due() {
        if stop.load(Ordering::SeqCst) {
            return RunOutcome::Cancelled(seq.cancel());
        }

        let now = clock.now_ms();
        if due > now {
            sleep_interruptible(stop, due - now);
            continue;
        }

        if let Some(fired) = seq.fire(now) {
            if let Some(session) = fired.completed {
                return RunOutcome::Completed(session);
            }
        }
    }
    RunOutcome::Idle
}
