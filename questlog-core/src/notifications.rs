//! Ephemeral, self-expiring notification feed.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Achievement,
    LevelUp,
    QuestComplete,
    Reminder,
    Streak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl NotificationEvent {
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(NOTIFICATION_TTL_MS)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Newest-first queue of notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    entries: Vec<NotificationEvent>,
    next_id: u64,
}

impl NotificationFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notification to the front of the feed and return its id.
    pub fn push(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        self.push_with_icon(kind, title, message, None, now)
    }

    pub fn push_with_icon(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        icon: Option<&str>,
        now: DateTime<Utc>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            0,
            NotificationEvent {
                id,
                kind,
                title: title.into(),
                message: message.into(),
                icon: icon.map(str::to_string),
                created_at: now,
                is_read: false,
            },
        );
        id
    }

    /// Drop every notification whose window has elapsed.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| !n.is_expired(now));
        before - self.entries.len()
    }

    pub fn mark_read(&mut self, id: u64) -> bool {
        self.entries
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| n.is_read = true)
            .is_some()
    }

    /// Notifications still visible at `now`, newest first.
    pub fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = &NotificationEvent> {
        self.entries.iter().filter(move |n| !n.is_expired(now))
    }

    #[must_use]
    pub fn entries(&self) -> &[NotificationEvent] {
        &self.entries
    }

    #[must_use]
    pub fn count_kind(&self, kind: NotificationKind) -> usize {
        self.entries.iter().filter(|n| n.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        std::mem::take(&mut self.entries)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
