//! Persistence strategy: remote rows for signed-in users, the guest bucket otherwise.
//!
//! Callers mutate the in-memory quest log first and report the change here
//! afterwards. Store failures never roll the change back; they only set a
//! short-lived banner message.
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::collab::{CollabError, GuestStore, RemoteStore, UserIdentity};
use crate::quest::{QuestLog, QuestRecord};

/// How long a persistence error stays on screen.
pub const ERROR_TTL_MS: i64 = 5_000;

/// One transient, self-clearing error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBanner {
    message: Option<(String, DateTime<Utc>)>,
}

impl ErrorBanner {
    pub fn set(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.message = Some((message.into(), now));
    }

    /// The message, if it was set less than [`ERROR_TTL_MS`] ago.
    #[must_use]
    pub fn current(&self, now: DateTime<Utc>) -> Option<&str> {
        self.message.as_ref().and_then(|(message, set_at)| {
            (now < *set_at + Duration::milliseconds(ERROR_TTL_MS)).then_some(message.as_str())
        })
    }

    pub fn clear(&mut self) {
        self.message = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Load,
    Create,
    Update,
    Delete,
}

impl SyncOp {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load tasks",
            Self::Create => "Failed to create task",
            Self::Update => "Failed to update task",
            Self::Delete => "Failed to delete task",
        }
    }
}

/// Where a change for the current identity goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget<'a> {
    Remote { user_id: &'a str },
    Guest,
}

impl<'a> SyncTarget<'a> {
    #[must_use]
    pub fn for_user(user: Option<&'a UserIdentity>) -> Self {
        user.map_or(Self::Guest, |u| Self::Remote {
            user_id: u.id.as_str(),
        })
    }
}

/// Owns both stores and the error banner.
#[derive(Debug, Clone, Default)]
pub struct TaskSync<R, G> {
    remote: R,
    guest: G,
    banner: ErrorBanner,
}

impl<R: RemoteStore, G: GuestStore> TaskSync<R, G> {
    pub const fn new(remote: R, guest: G) -> Self {
        Self {
            remote,
            guest,
            banner: ErrorBanner { message: None },
        }
    }

    /// Replace the log with the store's contents.
    ///
    /// Guest reads cannot fail; a remote failure leaves the log untouched and
    /// returns false.
    pub fn load(
        &mut self,
        target: SyncTarget<'_>,
        log: &mut QuestLog,
        now: DateTime<Utc>,
    ) -> bool {
        match target {
            SyncTarget::Guest => {
                log.replace_all(self.guest.get_all());
                debug!("loaded {} quests from guest bucket", log.len());
                true
            }
            SyncTarget::Remote { user_id } => match self.remote.list(user_id) {
                Ok(rows) => {
                    debug!("loaded {} quests for {user_id}", rows.len());
                    log.replace_all(rows);
                    true
                }
                Err(err) => {
                    self.report(SyncOp::Load, &err, now);
                    false
                }
            },
        }
    }

    pub fn created(
        &mut self,
        target: SyncTarget<'_>,
        record: &QuestRecord,
        now: DateTime<Utc>,
    ) -> bool {
        let result = match target {
            SyncTarget::Remote { user_id } => self.remote.insert(user_id, record),
            SyncTarget::Guest => self.guest.save(record),
        };
        self.settle(SyncOp::Create, result, now)
    }

    pub fn updated(
        &mut self,
        target: SyncTarget<'_>,
        record: &QuestRecord,
        now: DateTime<Utc>,
    ) -> bool {
        let result = match target {
            SyncTarget::Remote { .. } => self.remote.update(record),
            SyncTarget::Guest => self.guest.update(record),
        };
        self.settle(SyncOp::Update, result, now)
    }

    pub fn deleted(&mut self, target: SyncTarget<'_>, id: &str, now: DateTime<Utc>) -> bool {
        let result = match target {
            SyncTarget::Remote { .. } => self.remote.delete(id),
            SyncTarget::Guest => self.guest.delete(id),
        };
        self.settle(SyncOp::Delete, result, now)
    }

    fn settle(
        &mut self,
        op: SyncOp,
        result: Result<(), CollabError>,
        now: DateTime<Utc>,
    ) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.report(op, &err, now);
                false
            }
        }
    }

    fn report(&mut self, op: SyncOp, err: &CollabError, now: DateTime<Utc>) {
        let text = err.to_string();
        let message = if text.is_empty() {
            op.fallback_message().to_string()
        } else {
            text
        };
        warn!("{op:?} failed: {message}");
        self.banner.set(message, now);
    }

    #[must_use]
    pub fn error(&self, now: DateTime<Utc>) -> Option<&str> {
        self.banner.current(now)
    }

    pub fn set_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.banner.set(message, now);
    }

    pub fn clear_error(&mut self) {
        self.banner.clear();
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub const fn guest(&self) -> &G {
        &self.guest
    }

    pub const fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{MemoryGuestStore, MemoryRemoteStore};
    use crate::quest::{Difficulty, QuestRecord};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 8, 0, 0).unwrap()
    }

    fn record(id: &str) -> QuestRecord {
        QuestRecord {
            id: id.to_string(),
            title: format!("quest {id}"),
            description: String::new(),
            difficulty: Difficulty::Hard,
            xp_reward: 40,
            coin_reward: 4,
            due_date: t0(),
            is_completed: false,
            completed_at: None,
            is_recurring: false,
            recurring_pattern: None,
            tags: Vec::new(),
            priority: crate::quest::Priority::High,
            estimated_time: 30,
            category: String::new(),
            player_id: "1".to_string(),
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u-9".to_string(),
            email: "u@example.com".to_string(),
            name: None,
            created_at: t0(),
        }
    }

    #[test]
    fn banner_clears_itself_after_ttl() {
        let mut banner = ErrorBanner::default();
        banner.set("boom", t0());
        assert_eq!(banner.current(t0() + Duration::seconds(4)), Some("boom"));
        assert_eq!(banner.current(t0() + Duration::seconds(5)), None);
    }

    #[test]
    fn target_follows_identity() {
        let who = user();
        assert_eq!(SyncTarget::for_user(None), SyncTarget::Guest);
        assert_eq!(
            SyncTarget::for_user(Some(&who)),
            SyncTarget::Remote { user_id: "u-9" }
        );
    }

    #[test]
    fn guest_changes_land_in_bucket() {
        let mut sync = TaskSync::new(MemoryRemoteStore::new(), MemoryGuestStore::new());
        assert!(sync.created(SyncTarget::Guest, &record("a"), t0()));
        assert_eq!(sync.guest().get_all().len(), 1);
        assert_eq!(sync.remote().row_count(), 0);

        let mut log = QuestLog::new();
        assert!(sync.load(SyncTarget::Guest, &mut log, t0()));
        assert_eq!(log.len(), 1);

        assert!(sync.deleted(SyncTarget::Guest, "a", t0()));
        assert!(sync.guest().get_all().is_empty());
    }

    #[test]
    fn remote_failure_sets_banner_and_keeps_log() {
        let who = user();
        let target = SyncTarget::for_user(Some(&who));
        let mut sync = TaskSync::new(MemoryRemoteStore::new(), MemoryGuestStore::new());
        let mut log = QuestLog::from_records(vec![record("kept")]);

        sync.remote_mut().fail_with("permission denied");
        assert!(!sync.load(target, &mut log, t0()));
        assert_eq!(log.len(), 1);
        assert_eq!(sync.error(t0()), Some("permission denied"));

        sync.remote_mut().fail_with("");
        assert!(!sync.updated(target, &record("kept"), t0()));
        assert_eq!(sync.error(t0()), Some("Failed to update task"));
        sync.clear_error();
        assert_eq!(sync.error(t0()), None);
    }

    #[test]
    fn unreadable_guest_bucket_loads_empty() {
        let mut guest = MemoryGuestStore::with_records(vec![record("x")]);
        guest.corrupt();
        let mut sync = TaskSync::new(MemoryRemoteStore::new(), guest);
        let mut log = QuestLog::from_records(vec![record("stale")]);
        assert!(sync.load(SyncTarget::Guest, &mut log, t0()));
        assert!(log.is_empty());
        assert_eq!(sync.error(t0()), None);
    }
}
