use anyhow::{bail, Result};
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::config::SimulatorConfig;
use crate::keyboard::{key_label_for_char, BACKSPACE_LABEL};
use crate::mistake::TypoPolicy;
use crate::sink::{KeyPressVisualizer, TextSink};
use crate::speed::{SpeedControl, SpeedTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Starting,
    Stepping,
    Mistaking,
    Finishing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingSession {
    target: Vec<char>,
    cursor_index: usize,
    emitted: Vec<char>,
    in_mistake: bool,
}

impl TypingSession {
    fn new(text: &str) -> Self {
        Self {
            target: text.chars().collect(),
            cursor_index: 0,
            emitted: Vec::new(),
            in_mistake: false,
        }
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn in_mistake(&self) -> bool {
        self.in_mistake
    }

    pub fn emitted(&self) -> &[char] {
        &self.emitted
    }

    pub fn emitted_text(&self) -> String {
        self.emitted.iter().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor_index >= self.target.len()
    }

    fn current_char(&self) -> Option<char> {
        self.target.get(self.cursor_index).copied()
    }
}

pub trait SessionObserver {
    fn on_start(&mut self) {}
    /// Called once, after the finish delay, when a session ends on its own.
    fn on_complete(&mut self) {}
    fn on_cancel(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    Tick,
    RevealMistake,
    CorrectMistake,
    Retype { restore: char },
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    due_ms: u64,
    next: Continuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub state: SequencerState,
    pub next_due: Option<u64>,
    pub completed: Option<TypingSession>,
}

/// Drives a [`TypingSession`] one scheduled continuation at a time.
///
/// At most one continuation is pending; each step schedules the next only
/// after its own mutation, so steps run strictly in order. The sequencer never
/// sleeps: a driver asks for [`next_due`](Self::next_due) and calls
/// [`fire`](Self::fire) once that time has come.
pub struct TypingSequencer<S, V> {
    cfg: SimulatorConfig,
    speed: SpeedControl,
    policy: Box<dyn TypoPolicy>,
    rng: StdRng,
    sink: S,
    visualizer: V,
    observer: Box<dyn SessionObserver>,
    state: SequencerState,
    session: Option<TypingSession>,
    pending: Option<Scheduled>,
}

impl<S: TextSink, V: KeyPressVisualizer> TypingSequencer<S, V> {
    pub fn new(
        cfg: SimulatorConfig,
        speed: SpeedControl,
        rng: StdRng,
        sink: S,
        visualizer: V,
    ) -> Self {
        let policy = Box::new(cfg.mistake_model());
        Self {
            cfg,
            speed,
            policy,
            rng,
            sink,
            visualizer,
            observer: Box::new(NoopObserver),
            state: SequencerState::Idle,
            session: None,
            pending: None,
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn TypoPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SequencerState::Idle
    }

    pub fn session(&self) -> Option<&TypingSession> {
        self.session.as_ref()
    }

    pub fn speed(&self) -> &SpeedControl {
        &self.speed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn visualizer(&self) -> &V {
        &self.visualizer
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.map(|p| p.due_ms)
    }

    /// Begin typing `text`. A start request while a session is active is
    /// rejected; the running session is left untouched.
    pub fn start(&mut self, text: &str, now_ms: u64) -> Result<()> {
        if self.is_active() {
            bail!(
                "a typing session is already active (state {:?})",
                self.state
            );
        }

        let session = TypingSession::new(text);
        info!(
            chars = session.target_len(),
            tier = %self.speed.get(),
            "typing session started"
        );

        // Nothing may be drawn before on_start.
        self.observer.on_start();
        self.sink.reset();
        self.sink.set_cursor_visible(true);
        self.visualizer.set_active(true);

        self.session = Some(session);
        self.transition(SequencerState::Starting);
        self.schedule(now_ms, self.cfg.warmup_ms, Continuation::Tick);
        Ok(())
    }

    /// Select `tier` on the shared speed control, then [`start`](Self::start).
    /// The tier is left unchanged when the start is rejected.
    pub fn start_with_tier(&mut self, text: &str, tier: SpeedTier, now_ms: u64) -> Result<()> {
        if self.is_active() {
            bail!(
                "a typing session is already active (state {:?})",
                self.state
            );
        }
        self.speed.set(tier);
        self.start(text, now_ms)
    }

    /// Stop immediately. Nothing scheduled fires afterwards and the text typed
    /// so far stays in the sink. Returns the interrupted session.
    pub fn cancel(&mut self) -> Option<TypingSession> {
        if !self.is_active() {
            return None;
        }

        self.pending = None;
        self.visualizer.set_active(false);
        self.sink.set_cursor_visible(false);
        self.transition(SequencerState::Idle);

        let session = self.session.take();
        if let Some(s) = &session {
            info!(
                typed = s.cursor_index(),
                of = s.target_len(),
                "typing session cancelled"
            );
        }
        self.observer.on_cancel();
        session
    }

    pub fn fire(&mut self, now_ms: u64) -> Option<Fired> {
        let scheduled = self.pending.filter(|p| p.due_ms <= now_ms)?;
        self.pending = None;

        let Some(mut session) = self.session.take() else {
            self.transition(SequencerState::Idle);
            return None;
        };

        debug!(step = ?scheduled.next, at_ms = now_ms, "continuation");

        match scheduled.next {
            Continuation::Tick => self.tick(&mut session, now_ms),
            Continuation::RevealMistake => {
                self.backspace(&mut session);
                let wait = self.cfg.backspace_settle.sample(&mut self.rng)
                    + self.cfg.correct_delay.sample(&mut self.rng);
                self.schedule(now_ms, wait, Continuation::CorrectMistake);
            }
            Continuation::CorrectMistake => {
                self.emit_next(&mut session);
                session.in_mistake = false;
                self.transition(SequencerState::Stepping);
                self.schedule_next_tick(now_ms);
            }
            Continuation::Retype { restore } => {
                self.type_char(&mut session, restore);
                self.emit_next(&mut session);
                self.schedule_next_tick(now_ms);
            }
            Continuation::Finish => {
                self.visualizer.set_active(false);
                self.sink.set_cursor_visible(false);
                self.transition(SequencerState::Idle);
                info!(chars = session.target_len(), "typing session complete");
                self.observer.on_complete();
                return Some(Fired {
                    state: self.state,
                    next_due: None,
                    completed: Some(session),
                });
            }
        }

        self.session = Some(session);
        Some(Fired {
            state: self.state,
            next_due: self.next_due(),
            completed: None,
        })
    }

    fn tick(&mut self, session: &mut TypingSession, now_ms: u64) {
        let Some(current) = session.current_char() else {
            self.transition(SequencerState::Finishing);
            self.schedule(now_ms, self.cfg.finish_ms, Continuation::Finish);
            return;
        };

        if self.policy.should_mistake(session.in_mistake, &mut self.rng) {
            self.transition(SequencerState::Mistaking);
            session.in_mistake = true;
            let wrong = self.policy.pick_wrong_char(current, &mut self.rng);
            debug!(%wrong, correct = %current, "typo");
            self.type_char(session, wrong);
            let wait = self.cfg.realize_delay.sample(&mut self.rng);
            self.schedule(now_ms, wait, Continuation::RevealMistake);
            return;
        }

        self.transition(SequencerState::Stepping);

        if self.policy.should_backspace_correct(&mut self.rng) && !session.emitted.is_empty() {
            if let Some(restore) = self.backspace(session) {
                let wait = self.cfg.backspace_settle.sample(&mut self.rng);
                self.schedule(now_ms, wait, Continuation::Retype { restore });
                return;
            }
        }

        self.emit_next(session);
        self.schedule_next_tick(now_ms);
    }

    fn type_char(&mut self, session: &mut TypingSession, c: char) {
        self.visualizer.flash(&key_label_for_char(c));
        self.sink.append_char(c);
        session.emitted.push(c);
    }

    fn emit_next(&mut self, session: &mut TypingSession) {
        if let Some(c) = session.current_char() {
            self.type_char(session, c);
            session.cursor_index += 1;
        }
    }

    fn backspace(&mut self, session: &mut TypingSession) -> Option<char> {
        self.visualizer.flash(BACKSPACE_LABEL);
        let removed = session.emitted.pop()?;
        self.sink.remove_last();
        Some(removed)
    }

    fn schedule_next_tick(&mut self, now_ms: u64) {
        let tier = self.speed.get();
        let wait = self.cfg.tiers.delay(tier, &mut self.rng);
        self.schedule(now_ms, wait, Continuation::Tick);
    }

    fn schedule(&mut self, now_ms: u64, wait_ms: u64, next: Continuation) {
        self.pending = Some(Scheduled {
            due_ms: now_ms.saturating_add(wait_ms),
            next,
        });
    }

    fn transition(&mut self, to: SequencerState) {
        if self.state != to {
            debug!(from = ?self.state, to = ?to, "sequencer transition");
            self.state = to;
        }
    }
}
