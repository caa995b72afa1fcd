use std::io::{self, Write};

/// Feedback cue emitted by the engine. The engine never depends on a cue
/// actually reaching the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Click,
    Failure,
    Success,
}

/// Sink for feedback cues (the original app's click/failure/success sounds).
pub trait FeedbackSink {
    fn click(&mut self) {}
    fn failure(&mut self) {}
    fn success(&mut self) {}
    fn set_muted(&mut self, _muted: bool) {}
}

/// Sink that drops every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {}

/// Terminal-bell sink. The terminal offers a single cue, so clicks stay
/// silent and only round outcomes ring.
#[derive(Debug, Default)]
pub struct BellFeedback {
    muted: bool,
}

impl BellFeedback {
    pub fn new(muted: bool) -> Self {
        Self { muted }
    }

    fn ring(&self) {
        if self.muted {
            return;
        }
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

impl FeedbackSink for BellFeedback {
    fn failure(&mut self) {
        self.ring();
    }

    fn success(&mut self) {
        self.ring();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}

/// Test sink that records every cue in order.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub cues: Vec<Cue>,
}

impl FeedbackSink for RecordingFeedback {
    fn click(&mut self) {
        self.cues.push(Cue::Click);
    }

    fn failure(&mut self) {
        self.cues.push(Cue::Failure);
    }

    fn success(&mut self) {
        self.cues.push(Cue::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingFeedback::default();
        sink.click();
        sink.click();
        sink.failure();
        sink.success();
        assert_eq!(
            sink.cues,
            vec![Cue::Click, Cue::Click, Cue::Failure, Cue::Success]
        );
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullFeedback;
        sink.click();
        sink.failure();
        sink.success();
        sink.set_muted(true);
    }

    #[test]
    fn test_bell_mute_toggle() {
        let mut bell = BellFeedback::new(true);
        bell.set_muted(false);
        bell.set_muted(true);
        // muted bell must stay silent without erroring
        bell.failure();
        bell.success();
    }
}
