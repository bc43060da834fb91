//! Debounced input
//!
//! Raw values are visible immediately; the settled value feeding the filter
//! stage only changes after a quiet period. The last settled value wins.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Quiet period used for search input
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(160);

pub struct Debouncer<T> {
    raw_tx: watch::Sender<T>,
    settled_rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Must be called within a tokio runtime
    pub fn new(initial: T, quiet: Duration) -> Self {
        let (raw_tx, mut raw_rx) = watch::channel(initial.clone());
        let (settled_tx, settled_rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while raw_rx.changed().await.is_ok() {
                // Every new raw value restarts the quiet period
                loop {
                    tokio::select! {
                        changed = raw_rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(quiet) => break,
                    }
                }

                let value = raw_rx.borrow_and_update().clone();
                settled_tx.send_if_modified(|current| {
                    if *current == value {
                        false
                    } else {
                        *current = value;
                        true
                    }
                });
            }
        });

        Self {
            raw_tx,
            settled_rx,
            task,
        }
    }

    /// Record a raw input value
    pub fn publish(&self, value: T) {
        self.raw_tx.send_replace(value);
    }

    pub fn raw(&self) -> T {
        self.raw_tx.borrow().clone()
    }

    pub fn settled(&self) -> T {
        self.settled_rx.borrow().clone()
    }

    /// Receiver notified whenever the settled value changes
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled_rx.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
