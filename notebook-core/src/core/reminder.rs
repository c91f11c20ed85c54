//! Background reminder timers.
//!
//! A [`ReminderWorker`] owns one thread and at most one pending timer per
//! note. It is driven by fire-and-forget [`ReminderMessage`]s sent through a
//! [`ReminderHandle`], and calls a [`Notifier`] when a timer fires.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;

/// Title of every reminder notification.
pub const REMINDER_TITLE: &str = "Note reminder";

/// Commands accepted by the reminder worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderMessage {
    /// Schedules (or reschedules) a reminder for `note_id` at `time`
    /// (epoch milliseconds). Times in the past are ignored.
    Set {
        note_id: String,
        title: String,
        time: i64,
    },
    /// Cancels any pending reminder for `note_id`.
    Clear { note_id: String },
}

/// Receives fired reminders.
pub trait Notifier: Send + Sync {
    fn notify(&self, note_id: &str, title: &str, body: &str);
}

/// Default notifier: writes the reminder to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, note_id: &str, title: &str, body: &str) {
        log::info!("{title}: {body} (note {note_id})");
    }
}

enum Command {
    Message(ReminderMessage),
    Shutdown,
}

/// Cheap, cloneable sender for [`ReminderMessage`]s.
#[derive(Clone)]
pub struct ReminderHandle {
    tx: Sender<Command>,
}

impl ReminderHandle {
    /// Posts `message`; a stopped worker drops it silently.
    pub fn post(&self, message: ReminderMessage) {
        if self.tx.send(Command::Message(message)).is_err() {
            log::debug!("Reminder worker stopped, message dropped");
        }
    }

    pub fn set(&self, note_id: &str, title: &str, time: i64) {
        self.post(ReminderMessage::Set {
            note_id: note_id.to_string(),
            title: title.to_string(),
            time,
        });
    }

    pub fn clear(&self, note_id: &str) {
        self.post(ReminderMessage::Clear {
            note_id: note_id.to_string(),
        });
    }
}

struct Pending {
    title: String,
    time: i64,
}

/// The worker thread. Stops and joins on drop.
pub struct ReminderWorker {
    handle: ReminderHandle,
    thread: Option<JoinHandle<()>>,
}

impl ReminderWorker {
    pub fn spawn(notifier: Arc<dyn Notifier>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let thread = std::thread::Builder::new()
            .name("reminder-worker".to_string())
            .spawn(move || {
                let mut pending: HashMap<String, Pending> = HashMap::new();
                loop {
                    let next_due = pending.values().map(|p| p.time).min();
                    let received = match next_due {
                        Some(due) => {
                            let wait = (due - Utc::now().timestamp_millis()).max(0) as u64;
                            rx.recv_timeout(Duration::from_millis(wait))
                        }
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match received {
                        Ok(Command::Message(message)) => apply(&mut pending, message),
                        Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    fire_due(&mut pending, notifier.as_ref());
                }
            })?;

        Ok(Self {
            handle: ReminderHandle { tx },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> ReminderHandle {
        self.handle.clone()
    }
}

impl Drop for ReminderWorker {
    fn drop(&mut self) {
        let _ = self.handle.tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn apply(pending: &mut HashMap<String, Pending>, message: ReminderMessage) {
    match message {
        ReminderMessage::Set {
            note_id,
            title,
            time,
        } => {
            pending.remove(&note_id);
            if time > Utc::now().timestamp_millis() {
                pending.insert(note_id, Pending { title, time });
            }
        }
        ReminderMessage::Clear { note_id } => {
            pending.remove(&note_id);
        }
    }
}

fn fire_due(pending: &mut HashMap<String, Pending>, notifier: &dyn Notifier) {
    let now = Utc::now().timestamp_millis();
    let due: Vec<String> = pending
        .iter()
        .filter(|(_, p)| p.time <= now)
        .map(|(id, _)| id.clone())
        .collect();
    for note_id in due {
        if let Some(reminder) = pending.remove(&note_id) {
            let body = format!("Reminder: {}", reminder.title);
            notifier.notify(&note_id, REMINDER_TITLE, &body);
        }
    }
}
