//! Collaborators the core consumes: identity, remote rows, and the guest bucket.
//!
//! Platform front ends provide real implementations; the in-memory ones here
//! back the tests and the terminal client.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::quest::QuestRecord;

/// Name of the single local bucket used in guest mode.
pub const GUEST_BUCKET: &str = "guest_tasks";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollabError {
    /// Backend failure carrying its own human-readable message.
    #[error("{0}")]
    Backend(String),
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("Task not found")]
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Session management. The core only asks whether someone is signed in.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<&UserIdentity>;

    /// # Errors
    ///
    /// Returns an error when the credentials are rejected.
    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserIdentity, CollabError>;

    /// Register and sign in; `now` stamps the new identity's creation time.
    ///
    /// # Errors
    ///
    /// Returns an error when the account cannot be created.
    fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserIdentity, CollabError>;

    /// # Errors
    ///
    /// Returns an error when the backend refuses to end the session.
    fn sign_out(&mut self) -> Result<(), CollabError>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Row store keyed by record id and owning user.
pub trait RemoteStore {
    /// Rows owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend query fails.
    fn list(&self, user_id: &str) -> Result<Vec<QuestRecord>, CollabError>;

    /// # Errors
    ///
    /// Returns an error when the insert is rejected.
    fn insert(&mut self, user_id: &str, record: &QuestRecord) -> Result<(), CollabError>;

    /// # Errors
    ///
    /// Returns an error when the update is rejected.
    fn update(&mut self, record: &QuestRecord) -> Result<(), CollabError>;

    /// # Errors
    ///
    /// Returns an error when the delete is rejected.
    fn delete(&mut self, id: &str) -> Result<(), CollabError>;
}

/// Local bucket used when nobody is signed in.
///
/// Reads never fail: an unreadable bucket is an empty one.
pub trait GuestStore {
    fn get_all(&self) -> Vec<QuestRecord>;

    /// Prepend a record.
    ///
    /// # Errors
    ///
    /// Returns an error when the bucket cannot be written.
    fn save(&mut self, record: &QuestRecord) -> Result<(), CollabError>;

    /// Replace a record by id; unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the bucket cannot be written.
    fn update(&mut self, record: &QuestRecord) -> Result<(), CollabError>;

    /// # Errors
    ///
    /// Returns an error when the bucket cannot be written.
    fn delete(&mut self, id: &str) -> Result<(), CollabError>;
}

/// Identity provider backed by an in-memory account list.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentity {
    accounts: HashMap<String, (String, UserIdentity)>,
    current: Option<UserIdentity>,
}

impl MemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, email: &str, password: &str, created_at: DateTime<Utc>) -> Self {
        let user = self.make_user(email, created_at);
        self.accounts
            .insert(email.to_string(), (password.to_string(), user));
        self
    }

    fn make_user(&self, email: &str, created_at: DateTime<Utc>) -> UserIdentity {
        UserIdentity {
            id: format!("user-{}", self.accounts.len() + 1),
            email: email.to_string(),
            name: None,
            created_at,
        }
    }
}

impl IdentityProvider for MemoryIdentity {
    fn current_user(&self) -> Option<&UserIdentity> {
        self.current.as_ref()
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserIdentity, CollabError> {
        match self.accounts.get(email) {
            Some((stored, user)) if stored == password => {
                self.current = Some(user.clone());
                Ok(user.clone())
            }
            _ => Err(CollabError::InvalidCredentials),
        }
    }

    fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<UserIdentity, CollabError> {
        if self.accounts.contains_key(email) {
            return Err(CollabError::AlreadyRegistered);
        }
        let user = self.make_user(email, now);
        self.accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        self.current = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&mut self) -> Result<(), CollabError> {
        self.current = None;
        Ok(())
    }
}

/// Remote store double; can be switched into a failing mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    rows: Vec<(String, QuestRecord)>,
    failure: Option<String>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `message`.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn recover(&mut self) {
        self.failure = None;
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn check(&self) -> Result<(), CollabError> {
        match &self.failure {
            Some(message) => Err(CollabError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn list(&self, user_id: &str) -> Result<Vec<QuestRecord>, CollabError> {
        self.check()?;
        let mut rows: Vec<QuestRecord> = self
            .rows
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, record)| record.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn insert(&mut self, user_id: &str, record: &QuestRecord) -> Result<(), CollabError> {
        self.check()?;
        self.rows.push((user_id.to_string(), record.clone()));
        Ok(())
    }

    fn update(&mut self, record: &QuestRecord) -> Result<(), CollabError> {
        self.check()?;
        let (_, row) = self
            .rows
            .iter_mut()
            .find(|(_, row)| row.id == record.id)
            .ok_or(CollabError::NotFound)?;
        *row = record.clone();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), CollabError> {
        self.check()?;
        self.rows.retain(|(_, row)| row.id != id);
        Ok(())
    }
}

/// Guest bucket double.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuestStore {
    bucket: Vec<QuestRecord>,
    unreadable: bool,
    write_failure: Option<String>,
}

impl MemoryGuestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(bucket: Vec<QuestRecord>) -> Self {
        Self {
            bucket,
            ..Self::default()
        }
    }

    /// Simulate a corrupted bucket: reads come back empty.
    pub fn corrupt(&mut self) {
        self.unreadable = true;
    }

    pub fn fail_writes(&mut self, message: impl Into<String>) {
        self.write_failure = Some(message.into());
    }

    fn check_write(&self) -> Result<(), CollabError> {
        match &self.write_failure {
            Some(message) => Err(CollabError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl GuestStore for MemoryGuestStore {
    fn get_all(&self) -> Vec<QuestRecord> {
        if self.unreadable {
            return Vec::new();
        }
        self.bucket.clone()
    }

    fn save(&mut self, record: &QuestRecord) -> Result<(), CollabError> {
        self.check_write()?;
        self.bucket.insert(0, record.clone());
        Ok(())
    }

    fn update(&mut self, record: &QuestRecord) -> Result<(), CollabError> {
        self.check_write()?;
        if let Some(slot) = self.bucket.iter_mut().find(|r| r.id == record.id) {
            *slot = record.clone();
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), CollabError> {
        self.check_write()?;
        self.bucket.retain(|r| r.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{Difficulty, QuestRecord};
    use chrono::{Duration, TimeZone};

    fn record(id: &str, minutes: i64) -> QuestRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes);
        QuestRecord {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            xp_reward: 10,
            coin_reward: 1,
            due_date: at,
            is_completed: false,
            completed_at: None,
            is_recurring: false,
            recurring_pattern: None,
            tags: Vec::new(),
            priority: crate::quest::Priority::Low,
            estimated_time: 0,
            category: String::new(),
            player_id: "1".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn identity_sign_in_flow() {
        let created = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let mut identity = MemoryIdentity::new().with_account("a@b.c", "pw", created);
        assert!(!identity.is_authenticated());
        assert_eq!(
            identity.sign_in("a@b.c", "nope"),
            Err(CollabError::InvalidCredentials)
        );
        let user = identity.sign_in("a@b.c", "pw").unwrap();
        assert_eq!(identity.current_user(), Some(&user));
        assert_eq!(
            identity.sign_up("a@b.c", "pw", created),
            Err(CollabError::AlreadyRegistered)
        );
        identity.sign_out().unwrap();
        assert!(identity.current_user().is_none());
        assert_eq!(user.created_at, created);
        let joined = created + Duration::days(3);
        let fresh = identity.sign_up("new@b.c", "pw2", joined).unwrap();
        assert_eq!(fresh.id, "user-2");
        assert_eq!(fresh.created_at, joined);
        assert!(identity.is_authenticated());
    }

    #[test]
    fn remote_lists_newest_first_per_owner() {
        let mut remote = MemoryRemoteStore::new();
        remote.insert("u1", &record("old", 0)).unwrap();
        remote.insert("u1", &record("new", 30)).unwrap();
        remote.insert("u2", &record("theirs", 10)).unwrap();
        let ids: Vec<_> = remote
            .list("u1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }

    #[test]
    fn remote_failure_mode_surfaces_message() {
        let mut remote = MemoryRemoteStore::new();
        remote.fail_with("connection reset");
        let err = remote.insert("u1", &record("x", 0)).unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        remote.recover();
        assert_eq!(
            remote.update(&record("missing", 0)),
            Err(CollabError::NotFound)
        );
    }

    #[test]
    fn guest_bucket_prepends_and_swallows_read_errors() {
        let mut guest = MemoryGuestStore::new();
        guest.save(&record("a", 0)).unwrap();
        guest.save(&record("b", 1)).unwrap();
        assert_eq!(guest.get_all()[0].id, "b");

        let mut changed = record("a", 0);
        changed.title = "renamed".to_string();
        guest.update(&changed).unwrap();
        guest.update(&record("ghost", 0)).unwrap();
        assert_eq!(guest.get_all().len(), 2);
        assert_eq!(guest.get_all()[1].title, "renamed");

        guest.delete("b").unwrap();
        assert_eq!(guest.get_all().len(), 1);

        guest.corrupt();
        assert!(guest.get_all().is_empty());
    }
}
