use crate::combo::{self, Direction};
use crate::difficulty::Policy;
use crate::feedback::FeedbackSink;
use crate::tracker::Tracker;
use crate::TICK_RATE_MS;

/// How long a terminal phase flashes before the engine resets.
pub const ERROR_FLASHING_MS: u64 = 500;

/// Round phase. Input is accepted only while Normal; both terminal phases
/// auto-resolve after the flash delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Normal,
    Success,
    Error,
}

/// One combo element as the presentation layer should draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrowView {
    pub direction: Direction,
    pub hidden: bool,
}

/// Read-only view of the engine, refreshed by the presentation layer each
/// tick. The engine exposes nothing else.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub combo: Vec<ArrowView>,
    pub progress: usize,
    pub phase: Phase,
    pub previous_ms: Option<u64>,
    pub rolling_average_secs: Option<f64>,
    pub high_score_secs: Option<f64>,
    pub policy: Policy,
    pub sightread: bool,
}

/// The game engine: owns the combo, the progress pointer, the phase, and
/// the collaborators. All mutation goes through `on_input`/`on_tick` and
/// the setting switches.
pub struct Game {
    pub combo: Vec<Direction>,
    pub progress: usize,
    pub phase: Phase,
    pub policy: Policy,
    pub sightread: bool,
    pub tracker: Tracker,
    feedback: Box<dyn FeedbackSink>,
    flash_remaining_ms: Option<i64>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("combo", &self.combo)
            .field("progress", &self.progress)
            .field("phase", &self.phase)
            .field("policy", &self.policy)
            .field("sightread", &self.sightread)
            .field("flash_remaining_ms", &self.flash_remaining_ms)
            .finish()
    }
}

impl Game {
    pub fn new(
        policy: Policy,
        sightread: bool,
        tracker: Tracker,
        feedback: Box<dyn FeedbackSink>,
    ) -> Self {
        Self {
            combo: combo::generate(&policy),
            progress: 0,
            phase: Phase::Normal,
            policy,
            sightread,
            tracker,
            feedback,
            flash_remaining_ms: None,
        }
    }

    /// The single mutating entry point for decoded player input.
    pub fn on_input(&mut self, direction: Direction) {
        if self.phase != Phase::Normal {
            // Flash guard: queued input during the delay must not leak into
            // the next round.
            return;
        }

        let Some(&expected) = self.combo.get(self.progress) else {
            return;
        };

        self.feedback.click();

        if direction != expected {
            self.phase = Phase::Error;
            self.feedback.failure();
            self.tracker.finish_round(false);
            self.schedule_flash();
            return;
        }

        if self.progress == 0 {
            // The scoring clock starts at the first correct input, not at
            // reset time.
            self.tracker.begin_round();
        }

        if self.progress + 1 == self.combo.len() {
            self.phase = Phase::Success;
            self.feedback.success();
            self.tracker.finish_round(true);
            self.schedule_flash();
        } else {
            self.progress += 1;
        }
    }

    /// Advance the flash countdown. Exactly one reset fires per terminal
    /// phase, once the delay has elapsed.
    pub fn on_tick(&mut self) {
        if let Some(remaining) = self.flash_remaining_ms {
            let remaining = remaining - TICK_RATE_MS as i64;
            if remaining <= 0 {
                self.reset();
            } else {
                self.flash_remaining_ms = Some(remaining);
            }
        }
    }

    /// Abort a scheduled reset. The shipped runtime never calls this; it
    /// exists so an embedder can tear the engine down mid-flash without a
    /// callback firing against stale state. Returns whether a reset was
    /// pending.
    pub fn cancel_pending_reset(&mut self) -> bool {
        self.flash_remaining_ms.take().is_some()
    }

    pub fn is_flash_pending(&self) -> bool {
        self.flash_remaining_ms.is_some()
    }

    /// Switch difficulty. A no-op unless the label changes; otherwise the
    /// in-flight round is discarded and the stats rekeyed.
    pub fn set_policy(&mut self, policy: Policy) {
        if policy.label == self.policy.label {
            return;
        }
        self.policy = policy;
        self.flash_remaining_ms = None;
        self.tracker.rekey(self.policy.label, self.sightread);
        self.reset();
    }

    /// Toggle sightread mode. Changes the persistence key, so the round and
    /// window are invalidated just like a difficulty switch.
    pub fn set_sightread(&mut self, sightread: bool) {
        if sightread == self.sightread {
            return;
        }
        self.sightread = sightread;
        self.flash_remaining_ms = None;
        self.tracker.rekey(self.policy.label, self.sightread);
        self.reset();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.feedback.set_muted(muted);
    }

    pub fn snapshot(&self) -> Snapshot {
        let conceal = self.sightread && self.phase == Phase::Normal && self.progress == 0;
        let combo = self
            .combo
            .iter()
            .enumerate()
            .map(|(idx, &direction)| ArrowView {
                direction,
                hidden: conceal && idx > 0,
            })
            .collect();

        Snapshot {
            combo,
            progress: self.progress,
            phase: self.phase,
            previous_ms: self.tracker.previous_ms(),
            rolling_average_secs: self.tracker.rolling_average_secs(),
            high_score_secs: self.tracker.high_score_secs(),
            policy: self.policy,
            sightread: self.sightread,
        }
    }

    fn schedule_flash(&mut self) {
        self.flash_remaining_ms = Some(ERROR_FLASHING_MS as i64);
    }

    fn reset(&mut self) {
        self.combo = combo::generate(&self.policy);
        self.progress = 0;
        self.phase = Phase::Normal;
        self.flash_remaining_ms = None;
    }
}
