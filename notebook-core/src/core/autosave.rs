//! Debounced background saving of editor snapshots.
//!
//! [`Autosaver::schedule`] hands the worker the latest snapshot. The worker
//! writes it once no newer snapshot has arrived for the debounce gap, on every
//! periodic tick while it differs from what was last saved, on
//! [`Autosaver::flush`], and on drop. Older snapshots are never written once a
//! newer generation has been scheduled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::{AppConfig, Result};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveOptions {
    /// Idle gap after the last scheduled snapshot before it is written.
    pub debounce: Duration,
    /// Periodic save interval; `None` disables it.
    pub interval: Option<Duration>,
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            interval: None,
        }
    }
}

impl AutosaveOptions {
    /// Debounce default plus the configured `autoSaveInterval` (0 disables it).
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: (config.auto_save_interval > 0)
                .then(|| Duration::from_millis(config.auto_save_interval)),
            ..Self::default()
        }
    }
}

enum Command<T> {
    Schedule(u64, T),
    Flush(Sender<()>),
    Shutdown,
}

pub struct Autosaver<T> {
    tx: Sender<Command<T>>,
    next_generation: AtomicU64,
    saved_generation: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl<T> Autosaver<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Starts the worker. `initial` counts as already saved.
    pub fn spawn<F>(initial: T, options: AutosaveOptions, save: F) -> std::io::Result<Self>
    where
        F: FnMut(&T) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Command<T>>();
        let saved_generation = Arc::new(AtomicU64::new(0));
        let mut worker = Worker {
            latest: initial.clone(),
            latest_generation: 0,
            saved: initial,
            saved_generation: Arc::clone(&saved_generation),
            save,
        };

        let thread = std::thread::Builder::new()
            .name("autosave".to_string())
            .spawn(move || {
                let mut deadline: Option<Instant> = None;
                let mut next_tick = options.interval.map(|i| Instant::now() + i);
                loop {
                    let wake = match (deadline, next_tick) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                    let received = match wake {
                        Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match received {
                        Ok(Command::Schedule(generation, value)) => {
                            if generation > worker.latest_generation {
                                worker.latest = value;
                                worker.latest_generation = generation;
                                deadline = Some(Instant::now() + options.debounce);
                            }
                        }
                        Ok(Command::Flush(ack)) => {
                            worker.write();
                            deadline = None;
                            let _ = ack.send(());
                        }
                        Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            worker.write();
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let now = Instant::now();
                    if deadline.is_some_and(|d| d <= now) {
                        worker.write();
                        deadline = None;
                    }
                    if let (Some(tick), Some(interval)) = (next_tick, options.interval) {
                        if tick <= now {
                            worker.write();
                            next_tick = Some(now + interval);
                        }
                    }
                }
            })?;

        Ok(Self {
            tx,
            next_generation: AtomicU64::new(0),
            saved_generation,
            thread: Some(thread),
        })
    }

    /// Queues `value` as the newest snapshot and returns its generation.
    pub fn schedule(&self, value: T) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(Command::Schedule(generation, value)).is_err() {
            log::warn!("Autosave worker stopped, snapshot {generation} dropped");
        }
        generation
    }

    /// Writes the newest snapshot now and waits for the worker to finish.
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv().is_ok()
    }

    /// Generation of the most recent snapshot that reached storage.
    pub fn last_saved_generation(&self) -> u64 {
        self.saved_generation.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Autosaver<T> {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Worker<T, F> {
    latest: T,
    latest_generation: u64,
    saved: T,
    saved_generation: Arc<AtomicU64>,
    save: F,
}

impl<T, F> Worker<T, F>
where
    T: Clone + PartialEq,
    F: FnMut(&T) -> Result<()>,
{
    fn write(&mut self) {
        if self.latest_generation <= self.saved_generation.load(Ordering::SeqCst) {
            return;
        }
        if self.latest != self.saved {
            if let Err(e) = (self.save)(&self.latest) {
                log::error!("Autosave failed: {e}");
                return;
            }
            self.saved = self.latest.clone();
        }
        self.saved_generation
            .store(self.latest_generation, Ordering::SeqCst);
    }
}
