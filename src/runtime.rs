//! Event plumbing for the entry loop. Keyboard input and the wall clock are
//! folded into one stream so the loop body stays a single match.

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// One turn of the entry loop: a keystroke, a terminal resize, or the
/// timeout that advances the status-bar clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where loop events come from. Production reads the terminal; tests feed a
/// plain channel.
pub trait LapEventSource: Send + 'static {
    /// Blocks up to `timeout` for the next event.
    fn recv_timeout(&self, timeout: Duration) -> Result<LapEvent, RecvTimeoutError>;
}

/// Forwards crossterm events from a background thread.
pub struct CrosstermEventSource {
    rx: Receiver<LapEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(LapEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(LapEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LapEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<LapEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Controls how often an idle loop wakes up.
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Wakes at a fixed interval. The clock only shows seconds, so anything
/// under a second keeps it honest.
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-backed source for driving the loop headlessly in tests.
pub struct TestEventSource {
    rx: Receiver<LapEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<LapEvent>) -> Self {
        Self { rx }
    }
}

impl LapEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<LapEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Couples a source with a ticker and hands the loop one event per step.
pub struct Runner<E: LapEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: LapEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// A quiet or closed source degrades to ticks, so the clock keeps moving.
    pub fn step(&self) -> LapEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => LapEvent::Tick,
        }
    }
}
