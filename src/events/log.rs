//! Simple stdout event printer for debugging and demos.
//!
//! Enabled via the `logging` feature. [`LogWriter::attach`] subscribes to a
//! [`Bus`] and prints each event in a human-readable line format:
//!
//! ```text
//! [spawned] slot=0
//! [failed] slot=1 reason="connection refused"
//! [aborted]
//! [retry] attempt=1 remaining=2 reason="connection refused"
//! [closed]
//! ```
//!
//! Not intended for production use — subscribe to the bus directly for
//! structured logging or metrics.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::bus::Bus;
use super::event::{Event, EventKind};

/// Stdout event printer (demo/reference only).
pub struct LogWriter;

impl LogWriter {
    /// Subscribes to the bus and prints events until the bus is dropped.
    pub fn attach(bus: &Bus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => Self::write(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn write(ev: &Event) {
        match ev.kind {
            EventKind::TaskSpawned => {
                println!("[spawned] slot={:?}", ev.slot);
            }
            EventKind::SupervisorSpawned => {
                println!("[supervisor-spawned]");
            }
            EventKind::TaskStopped => {
                println!("[stopped] slot={:?}", ev.slot);
            }
            EventKind::TaskFailed => {
                println!("[failed] slot={:?} reason={:?}", ev.slot, ev.reason);
            }
            EventKind::TaskOptedOut => {
                println!("[opted-out] slot={:?}", ev.slot);
            }
            EventKind::GroupAborted => {
                println!("[aborted]");
            }
            EventKind::GenerationClosed => {
                println!("[closed]");
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] attempt={:?} remaining={:?} reason={:?}",
                    ev.attempt, ev.remaining, ev.reason
                );
            }
        }
    }
}
