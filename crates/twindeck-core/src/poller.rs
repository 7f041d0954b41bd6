//! Position poller - republishes deck clocks to the presentation layer
//!
//! Runs on its own low-priority thread at a fixed period (500ms by default)
//! and sends one [`PositionUpdate`] per deck per tick. Updates are plain
//! values; the presentation side never holds a reference into engine state.
//!
//! ```text
//! ┌─────────────┐  DeckAtomics   ┌────────────────┐  PositionUpdate  ┌──────────┐
//! │ Audio Thread│ ─────────────► │ position-poller│ ───────────────► │    UI    │
//! └─────────────┘   (relaxed)    │  (tick timer)  │    (by value)    └──────────┘
//!                                └────────────────┘
//! ```
//!
//! Missed ticks are skipped, not caught up, and an update that finds the
//! outgoing channel full is dropped.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::engine::{DeckView, PlaybackSnapshot};
use crate::types::DeckId;

/// Default poll period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Updates buffered per deck before new ones are dropped
const UPDATES_PER_DECK: usize = 4;

/// One deck's clock at one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub deck: DeckId,
    /// Position as a fraction of the length (0 when empty)
    pub relative: f64,
    pub snapshot: PlaybackSnapshot,
}

/// Reads every deck's clock on a fixed period
pub struct PositionPoller {
    decks: Vec<(DeckId, Arc<DeckView>)>,
    period: Duration,
}

impl PositionPoller {
    pub fn new(decks: Vec<(DeckId, Arc<DeckView>)>, period: Duration) -> Self {
        Self { decks, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Read every deck once
    pub fn poll(&self) -> Vec<PositionUpdate> {
        self.decks
            .iter()
            .map(|(deck, view)| {
                let snapshot = view.snapshot();
                PositionUpdate {
                    deck: *deck,
                    relative: snapshot.relative(),
                    snapshot,
                }
            })
            .collect()
    }

    /// Start polling on a background thread
    pub fn spawn(self) -> std::io::Result<PollerHandle> {
        let capacity = (self.decks.len() * UPDATES_PER_DECK).max(1);
        let (update_tx, update_rx) = channel::bounded(capacity);
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let thread = thread::Builder::new()
            .name("position-poller".into())
            .spawn(move || self.run(update_tx, shutdown_rx))?;

        Ok(PollerHandle {
            updates: update_rx,
            shutdown_tx,
            thread: Some(thread),
        })
    }

    fn run(self, update_tx: Sender<PositionUpdate>, shutdown_rx: Receiver<()>) {
        log::info!("Position poller started ({}ms)", self.period.as_millis());
        let ticker = channel::tick(self.period);

        loop {
            crossbeam::select! {
                recv(ticker) -> _ => {
                    for update in self.poll() {
                        match update_tx.try_send(update) {
                            Ok(()) | Err(TrySendError::Full(_)) => {}
                            Err(TrySendError::Disconnected(_)) => {
                                log::info!("Position update receiver dropped, stopping poller");
                                return;
                            }
                        }
                    }
                }
                recv(shutdown_rx) -> _ => break,
            }
        }

        log::info!("Position poller stopped");
    }
}

/// Handle to a running poller thread
///
/// Dropping the handle stops the thread.
pub struct PollerHandle {
    updates: Receiver<PositionUpdate>,
    shutdown_tx: Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Receiver of position updates, usable in `crossbeam::select!`
    pub fn updates(&self) -> &Receiver<PositionUpdate> {
        &self.updates
    }

    /// Stop the poller and wait for its thread
    pub fn shutdown(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
