use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::TICK_RATE_MS;

/// Unified event type consumed by the game loop
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, tick)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source: one thread forwards crossterm key/resize events,
/// a second pushes a Tick every TICK_RATE_MS. Both feed a single channel, so
/// the consumer sees a serialized stream and the flash countdown keeps its
/// cadence even while keys flood in.
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();

        let tick_tx = tx.clone();
        thread::spawn(move || loop {
            if tick_tx.send(GameEvent::Tick).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(TICK_RATE_MS));
        });

        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(GameEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(GameEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source fed from a plain channel
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the game loop one event at a time, synthesizing a Tick when the
/// source stays quiet for a tick interval.
pub struct Runner<E: EventSource> {
    source: E,
    tick_interval: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(source: E, tick_interval: Duration) -> Self {
        Self {
            source,
            tick_interval,
        }
    }

    pub fn step(&self) -> GameEvent {
        match self.source.recv_timeout(self.tick_interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                GameEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let source = TestEventSource::new(rx);
        let runner = Runner::new(source, Duration::from_millis(1));

        assert_matches!(runner.step(), GameEvent::Tick);
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Resize).unwrap();
        let source = TestEventSource::new(rx);
        let runner = Runner::new(source, Duration::from_millis(10));

        assert_matches!(runner.step(), GameEvent::Resize);
    }

    #[test]
    fn step_returns_tick_when_channel_closes() {
        let (tx, rx) = mpsc::channel::<GameEvent>();
        drop(tx);
        let source = TestEventSource::new(rx);
        let runner = Runner::new(source, Duration::from_millis(1));

        assert_matches!(runner.step(), GameEvent::Tick);
    }
}
