use crate::store::{RoundRecord, ScoreStore};
use crate::util::mean;
use chrono::Local;
use std::collections::VecDeque;
use std::time::SystemTime;

/// Number of recent round times the scored average considers.
pub const MAX_TIMES_TO_CONSIDER: usize = 5;

/// Stored values at or above this many seconds are a malformed sentinel and
/// treated as absent on load.
const CORRUPT_SCORE_FLOOR: f64 = 1000.0;

/// Fixed-capacity FIFO of recent successful round times, in milliseconds.
#[derive(Debug, Default, Clone)]
pub struct RollingWindow {
    times_ms: VecDeque<u64>,
}

impl RollingWindow {
    pub fn push(&mut self, elapsed_ms: u64) {
        self.times_ms.push_back(elapsed_ms);
        if self.times_ms.len() > MAX_TIMES_TO_CONSIDER {
            self.times_ms.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.times_ms.len() == MAX_TIMES_TO_CONSIDER
    }

    pub fn clear(&mut self) {
        self.times_ms.clear();
    }

    pub fn average_ms(&self) -> Option<f64> {
        let samples: Vec<f64> = self.times_ms.iter().map(|&ms| ms as f64).collect();
        mean(&samples)
    }

    pub fn times_ms(&self) -> impl Iterator<Item = u64> + '_ {
        self.times_ms.iter().copied()
    }
}

/// Measures each round from the first correct input to completion and keeps
/// the best full-window average per (difficulty, sightread) key.
pub struct Tracker {
    pub window: RollingWindow,
    pub round_started_at: Option<SystemTime>,
    pub previous_ms: Option<u64>,
    high_score_secs: Option<f64>,
    key: String,
    label: String,
    sightread: bool,
    store: Box<dyn ScoreStore>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("window", &self.window)
            .field("round_started_at", &self.round_started_at)
            .field("previous_ms", &self.previous_ms)
            .field("high_score_secs", &self.high_score_secs)
            .field("key", &self.key)
            .finish()
    }
}

impl Tracker {
    pub fn new(store: Box<dyn ScoreStore>, label: &str, sightread: bool) -> Self {
        let mut tracker = Self {
            window: RollingWindow::default(),
            round_started_at: None,
            previous_ms: None,
            high_score_secs: None,
            key: storage_key(label, sightread),
            label: label.to_string(),
            sightread,
            store,
        };
        tracker.high_score_secs = tracker.load_high_score();
        tracker
    }

    /// Stamp the round start. Called when progress first becomes 1, so idle
    /// time before the player begins is excluded.
    pub fn begin_round(&mut self) {
        if self.round_started_at.is_none() {
            self.round_started_at = Some(SystemTime::now());
        }
    }

    /// Close out the round. A successful round appends its elapsed time to
    /// the window and may improve the stored best; a failed round records
    /// nothing and leaves the previous-time readout alone.
    pub fn finish_round(&mut self, success: bool) {
        let started_at = self.round_started_at.take();

        if !success {
            return;
        }

        let elapsed_ms = match started_at {
            Some(started) => time_diff_ms(started, SystemTime::now()),
            None => return,
        };

        self.window.push(elapsed_ms);
        self.previous_ms = Some(elapsed_ms);

        self.store.log_round(&RoundRecord {
            difficulty: self.label.clone(),
            sightread: self.sightread,
            elapsed_ms,
            recorded_at: Local::now(),
        });

        self.propose_high_score();
    }

    /// Switch to a new (difficulty, sightread) key: the in-flight stats are
    /// discarded and the stored best for the new key is loaded.
    pub fn rekey(&mut self, label: &str, sightread: bool) {
        self.key = storage_key(label, sightread);
        self.label = label.to_string();
        self.sightread = sightread;
        self.window.clear();
        self.round_started_at = None;
        self.previous_ms = None;
        self.high_score_secs = self.load_high_score();
    }

    pub fn previous_ms(&self) -> Option<u64> {
        self.previous_ms
    }

    /// Average of the current window contents, in seconds.
    pub fn rolling_average_secs(&self) -> Option<f64> {
        self.window.average_ms().map(|ms| ms / 1000.0)
    }

    pub fn high_score_secs(&self) -> Option<f64> {
        self.high_score_secs
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Only a full window qualifies; the stored best improves on a strictly
    /// lower average.
    fn propose_high_score(&mut self) {
        if !self.window.is_full() {
            return;
        }

        let average_secs = match self.window.average_ms() {
            Some(ms) => ms / 1000.0,
            None => return,
        };

        let improved = match self.high_score_secs {
            Some(best) => average_secs < best,
            None => true,
        };

        if improved {
            self.high_score_secs = Some(average_secs);
            self.store.set(&self.key, &average_secs.to_string());
        }
    }

    fn load_high_score(&self) -> Option<f64> {
        self.store
            .get(&self.key)
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|secs| *secs < CORRUPT_SCORE_FLOOR)
    }
}

/// Persistence key for a (difficulty label, sightread) pair. The window
/// capacity is baked into the key so stored values never alias across a
/// capacity change.
pub fn storage_key(label: &str, sightread: bool) -> String {
    let mut key = format!("{}-{}", label, MAX_TIMES_TO_CONSIDER);
    if sightread {
        key.push_str("-sightread");
    }
    key
}

pub fn time_diff_ms(start: SystemTime, end: SystemTime) -> u64 {
    end.duration_since(start).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryScoreStore;
    use std::time::Duration;

    fn tracker_with_memory(label: &str, sightread: bool) -> Tracker {
        Tracker::new(Box::new(MemoryScoreStore::default()), label, sightread)
    }

    fn finish_with_elapsed(tracker: &mut Tracker, elapsed_ms: u64) {
        tracker.round_started_at = Some(SystemTime::now() - Duration::from_millis(elapsed_ms));
        tracker.finish_round(true);
    }

    #[test]
    fn test_storage_key_format() {
        assert_eq!(storage_key("Easy", false), "Easy-5");
        assert_eq!(storage_key("Easy", true), "Easy-5-sightread");
        assert_eq!(storage_key("Hard", true), "Hard-5-sightread");
    }

    #[test]
    fn test_window_fifo_eviction() {
        let mut window = RollingWindow::default();
        for ms in [100, 200, 300, 400, 500] {
            window.push(ms);
        }
        assert!(window.is_full());

        window.push(600);
        assert_eq!(window.len(), MAX_TIMES_TO_CONSIDER);
        let times: Vec<u64> = window.times_ms().collect();
        assert_eq!(times, vec![200, 300, 400, 500, 600]);
    }

    #[test]
    fn test_window_average() {
        let mut window = RollingWindow::default();
        assert_eq!(window.average_ms(), None);

        window.push(1000);
        window.push(2000);
        assert_eq!(window.average_ms(), Some(1500.0));
    }

    #[test]
    fn test_begin_round_is_idempotent_within_round() {
        let mut tracker = tracker_with_memory("Easy", false);
        tracker.begin_round();
        let first = tracker.round_started_at;
        std::thread::sleep(Duration::from_millis(5));
        tracker.begin_round();
        assert_eq!(tracker.round_started_at, first);
    }

    #[test]
    fn test_failed_round_records_nothing() {
        let mut tracker = tracker_with_memory("Easy", false);
        finish_with_elapsed(&mut tracker, 800);
        let recorded = tracker.previous_ms().unwrap();
        assert!((800..900).contains(&recorded));

        tracker.begin_round();
        tracker.finish_round(false);

        assert_eq!(tracker.window.len(), 1);
        // previous-time readout survives a failure
        assert_eq!(tracker.previous_ms(), Some(recorded));
        assert_eq!(tracker.round_started_at, None);
    }

    #[test]
    fn test_success_without_begin_is_a_noop() {
        let mut tracker = tracker_with_memory("Easy", false);
        tracker.finish_round(true);
        assert!(tracker.window.is_empty());
        assert_eq!(tracker.previous_ms(), None);
    }

    #[test]
    fn test_high_score_requires_full_window() {
        let mut tracker = tracker_with_memory("Easy", false);
        for _ in 0..4 {
            finish_with_elapsed(&mut tracker, 1000);
        }
        assert_eq!(tracker.high_score_secs(), None);

        finish_with_elapsed(&mut tracker, 1000);
        let best = tracker.high_score_secs().unwrap();
        assert!((1.0..1.1).contains(&best), "expected ~1.0s, got {}", best);
    }

    #[test]
    fn test_high_score_only_improves() {
        let mut store = MemoryScoreStore::default();
        store.set("Easy-5", "0.9");
        let mut tracker = Tracker::new(Box::new(store), "Easy", false);
        assert_eq!(tracker.high_score_secs(), Some(0.9));

        for _ in 0..5 {
            finish_with_elapsed(&mut tracker, 1000);
        }
        // ~1.0s average does not beat a stored 0.9s
        assert_eq!(tracker.high_score_secs(), Some(0.9));
    }

    #[test]
    fn test_high_score_beats_slower_stored_value() {
        let mut store = MemoryScoreStore::default();
        store.set("Easy-5", "1.2");
        let mut tracker = Tracker::new(Box::new(store), "Easy", false);

        for _ in 0..5 {
            finish_with_elapsed(&mut tracker, 1000);
        }
        let best = tracker.high_score_secs().unwrap();
        assert!(best < 1.2);
        assert!((1.0..1.1).contains(&best), "expected ~1.0s, got {}", best);
    }

    #[test]
    fn test_corrupt_stored_value_treated_as_absent() {
        let mut store = MemoryScoreStore::default();
        store.set("Easy-5", "100000");
        let tracker = Tracker::new(Box::new(store), "Easy", false);
        assert_eq!(tracker.high_score_secs(), None);
    }

    #[test]
    fn test_unparsable_stored_value_treated_as_absent() {
        let mut store = MemoryScoreStore::default();
        store.set("Easy-5", "not a number");
        let tracker = Tracker::new(Box::new(store), "Easy", false);
        assert_eq!(tracker.high_score_secs(), None);
    }

    #[test]
    fn test_rekey_clears_window_and_reloads() {
        let mut store = MemoryScoreStore::default();
        store.set("Hard-5", "4.2");
        let mut tracker = Tracker::new(Box::new(store), "Easy", false);

        finish_with_elapsed(&mut tracker, 700);
        assert_eq!(tracker.window.len(), 1);

        tracker.rekey("Hard", false);
        assert!(tracker.window.is_empty());
        assert_eq!(tracker.previous_ms(), None);
        assert_eq!(tracker.storage_key(), "Hard-5");
        assert_eq!(tracker.high_score_secs(), Some(4.2));
    }

    #[test]
    fn test_sightread_uses_separate_key() {
        let mut store = MemoryScoreStore::default();
        store.set("Easy-5", "1.0");
        store.set("Easy-5-sightread", "2.0");

        let mut tracker = Tracker::new(Box::new(store), "Easy", false);
        assert_eq!(tracker.high_score_secs(), Some(1.0));

        tracker.rekey("Easy", true);
        assert_eq!(tracker.high_score_secs(), Some(2.0));
    }

    #[test]
    fn test_round_log_receives_successes_only() {
        use crate::store::{RoundRecord, ScoreStore};
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct SharedStore(Rc<RefCell<crate::store::MemoryScoreStore>>);

        impl ScoreStore for SharedStore {
            fn get(&self, key: &str) -> Option<String> {
                self.0.borrow().get(key)
            }
            fn set(&mut self, key: &str, value: &str) {
                self.0.borrow_mut().set(key, value)
            }
            fn log_round(&mut self, record: &RoundRecord) {
                self.0.borrow_mut().log_round(record)
            }
        }

        let shared = Rc::new(RefCell::new(MemoryScoreStore::default()));
        let mut tracker = Tracker::new(
            Box::new(SharedStore(Rc::clone(&shared))),
            "Medium",
            true,
        );

        finish_with_elapsed(&mut tracker, 1200);
        tracker.begin_round();
        tracker.finish_round(false);
        finish_with_elapsed(&mut tracker, 900);

        let store = shared.borrow();
        assert_eq!(store.rounds.len(), 2);
        assert!((1200..1300).contains(&store.rounds[0].elapsed_ms));
        assert!((900..1000).contains(&store.rounds[1].elapsed_ms));
        assert!(store
            .rounds
            .iter()
            .all(|r| r.difficulty == "Medium" && r.sightread));
    }

    #[test]
    fn test_time_diff_ms() {
        let start = SystemTime::now();
        std::thread::sleep(Duration::from_millis(10));
        let end = SystemTime::now();

        let diff = time_diff_ms(start, end);
        assert!(diff >= 10);
        assert!(diff < 100);
    }
}
