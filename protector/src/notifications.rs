use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info};

const MAX_RETAINED_NOTIFICATIONS: usize = 100;
const DEFAULT_TTL_MS: i64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing message, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

struct NotificationLog {
    next_id: u64,
    entries: VecDeque<Notification>,
}

/// Collects notifications and mirrors each one into the log.
#[derive(Clone)]
pub struct Notifier {
    log: Arc<Mutex<NotificationLog>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_TTL_MS))
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            log: Arc::new(Mutex::new(NotificationLog {
                next_id: 1,
                entries: VecDeque::new(),
            })),
            ttl,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(NotificationLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(NotificationLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.push(NotificationLevel::Error, message);
    }

    fn push(&self, level: NotificationLevel, message: String) {
        let mut log = self.lock();
        let id = log.next_id;
        log.next_id += 1;

        log.entries.push_back(Notification {
            id,
            level,
            message,
            created_at: Utc::now(),
        });
        while log.entries.len() > MAX_RETAINED_NOTIFICATIONS {
            log.entries.pop_front();
        }
    }

    /// Id of the most recent notification, 0 if there is none yet.
    pub fn last_id(&self) -> u64 {
        self.lock().next_id - 1
    }

    /// Notifications raised after `id`, expired or not.
    pub fn since(&self, id: u64) -> Vec<Notification> {
        self.lock()
            .entries
            .iter()
            .filter(|notification| notification.id > id)
            .cloned()
            .collect()
    }

    /// Notifications still within their display lifetime.
    pub fn active(&self) -> Vec<Notification> {
        let cutoff = Utc::now() - self.ttl;
        let mut log = self.lock();
        log.entries.retain(|notification| notification.created_at > cutoff);
        log.entries.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotificationLog> {
        // A panic while holding the lock cannot leave the log inconsistent
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
