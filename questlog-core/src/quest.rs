//! Quest records and their lifecycle: create, complete, update, delete.
use chrono::{DateTime, Utc};
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::achievements::{AchievementId, CompletionCounts, check_achievements};
use crate::clock::Clock;
use crate::ledger::{GrantOutcome, RewardLedger};
use crate::notifications::NotificationKind;
use crate::player::{DEFAULT_PLAYER_ID, PlayerAggregate};

/// Messages shown when a quest is completed; one is picked at random.
pub const CELEBRATION_MESSAGES: [&str; 5] = [
    "Outstanding! You crushed that quest! 💪",
    "Victory is yours! The realm rejoices! 🎉",
    "Quest completed! Your legend grows! ⭐",
    "Brilliant work! The productivity gods smile upon you! 😄",
    "Mission accomplished! Time to level up! 🚀",
];

pub const QUEST_PREFIXES: [&str; 15] = [
    "Epic", "Legendary", "Mighty", "Super", "Ultra", "Mega", "Divine", "Sacred", "Ancient",
    "Mystical", "Heroic", "Noble", "Grand", "Supreme", "Ultimate",
];

pub const QUEST_SUFFIXES: [&str; 10] = [
    "of Productivity",
    "of Excellence",
    "of Achievement",
    "of Victory",
    "of Glory",
    "of Triumph",
    "of Success",
    "of Mastery",
    "of Greatness",
    "of Legend",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Epic,
    Legendary,
}

impl Difficulty {
    pub const ALL: [Self; 5] = [
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Epic,
        Self::Legendary,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub kind: RecurrenceKind,
    pub interval: u32,
    /// 0-6, Sunday first
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    pub day_of_month: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub xp_reward: u64,
    pub coin_reward: u64,
    pub due_date: DateTime<Utc>,
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_pattern: Option<RecurringPattern>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Minutes
    #[serde(default)]
    pub estimated_time: u32,
    #[serde(default)]
    pub category: String,
    pub player_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuestRecord {
    /// Completion before the due date earns the early bonus.
    #[must_use]
    pub fn is_early(&self, at: DateTime<Utc>) -> bool {
        self.due_date > at
    }

    /// XP paid for completing at `at`: 1.2x rounded down when early.
    #[must_use]
    pub fn xp_for_completion_at(&self, at: DateTime<Utc>) -> u64 {
        if self.is_early(at) {
            early_bonus(self.xp_reward)
        } else {
            self.xp_reward
        }
    }
}

/// `floor(xp * 1.2)` in integer arithmetic.
#[must_use]
pub const fn early_bonus(xp: u64) -> u64 {
    xp.saturating_add(xp / 5)
}

/// Fields supplied by the player when creating a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub xp_reward: u64,
    pub coin_reward: u64,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_pattern: Option<RecurringPattern>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_time: u32,
    #[serde(default)]
    pub category: String,
}

impl QuestDraft {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        difficulty: Difficulty,
        xp_reward: u64,
        coin_reward: u64,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            difficulty,
            xp_reward,
            coin_reward,
            due_date,
            is_recurring: false,
            recurring_pattern: None,
            tags: Vec::new(),
            priority: Priority::default(),
            estimated_time: 0,
            category: String::new(),
        }
    }
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub xp_reward: Option<u64>,
    pub coin_reward: Option<u64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub estimated_time: Option<u32>,
    pub category: Option<String>,
}

impl QuestPatch {
    fn apply(self, quest: &mut QuestRecord) {
        if let Some(v) = self.title {
            quest.title = v;
        }
        if let Some(v) = self.description {
            quest.description = v;
        }
        if let Some(v) = self.difficulty {
            quest.difficulty = v;
        }
        if let Some(v) = self.xp_reward {
            quest.xp_reward = v;
        }
        if let Some(v) = self.coin_reward {
            quest.coin_reward = v;
        }
        if let Some(v) = self.due_date {
            quest.due_date = v;
        }
        if let Some(v) = self.tags {
            quest.tags = v;
        }
        if let Some(v) = self.priority {
            quest.priority = v;
        }
        if let Some(v) = self.estimated_time {
            quest.estimated_time = v;
        }
        if let Some(v) = self.category {
            quest.category = v;
        }
    }
}

/// Everything a successful completion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub quest_id: String,
    pub completed_at: DateTime<Utc>,
    pub early: bool,
    pub xp_gained: u64,
    pub coins_gained: u64,
    /// `None` when no player was loaded to receive the XP
    pub xp_grant: Option<GrantOutcome>,
    pub achievements: Vec<AchievementId>,
    pub celebration: &'static str,
}

/// The player's quest collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    quests: Vec<QuestRecord>,
}

impl QuestLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(quests: Vec<QuestRecord>) -> Self {
        Self { quests }
    }

    pub fn replace_all(&mut self, quests: Vec<QuestRecord>) {
        self.quests = quests;
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&QuestRecord> {
        self.quests.iter().find(|q| q.id == id)
    }

    #[must_use]
    pub fn quests(&self) -> &[QuestRecord] {
        &self.quests
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    /// Stamp identity and timestamps onto a draft and append it.
    pub fn create_quest<R: Rng + ?Sized>(
        &mut self,
        draft: QuestDraft,
        player: Option<&PlayerAggregate>,
        ledger: &mut RewardLedger<'_>,
        rng: &mut R,
    ) -> &QuestRecord {
        let now = ledger.now();
        let quest = QuestRecord {
            id: new_record_id(rng),
            title: draft.title,
            description: draft.description,
            difficulty: draft.difficulty,
            xp_reward: draft.xp_reward,
            coin_reward: draft.coin_reward,
            due_date: draft.due_date,
            is_completed: false,
            completed_at: None,
            is_recurring: draft.is_recurring,
            recurring_pattern: draft.recurring_pattern,
            tags: draft.tags,
            priority: draft.priority,
            estimated_time: draft.estimated_time,
            category: draft.category,
            player_id: player.map_or_else(|| DEFAULT_PLAYER_ID.to_string(), |p| p.id.clone()),
            created_at: now,
            updated_at: now,
        };
        debug!("created quest {} ({})", quest.id, quest.title);
        ledger.feed().push(
            NotificationKind::QuestComplete,
            "New Quest Created! 📝",
            format!("\"{}\" has been added to your quest log!", quest.title),
            now,
        );
        self.quests.push(quest);
        &self.quests[self.quests.len() - 1]
    }

    /// Complete a pending quest and pay out its rewards.
    ///
    /// Unknown or already completed quests are left alone and yield `None`.
    /// `lifetime_before` is the player's completion count before this one;
    /// milestones match against it, not against what the log still holds.
    pub fn complete_quest<C: Clock + ?Sized, R: Rng + ?Sized>(
        &mut self,
        id: &str,
        mut player: Option<&mut PlayerAggregate>,
        ledger: &mut RewardLedger<'_>,
        lifetime_before: usize,
        clock: &C,
        rng: &mut R,
    ) -> Option<CompletionReport> {
        let now = ledger.now();
        let quest = self
            .quests
            .iter_mut()
            .find(|q| q.id == id && !q.is_completed)?;
        quest.is_completed = true;
        quest.completed_at = Some(now);

        let early = quest.is_early(now);
        let xp_gained = quest.xp_for_completion_at(now);
        let coins_gained = quest.coin_reward;
        let title = quest.title.clone();

        let xp_grant = ledger.grant_experience(
            player.as_deref_mut(),
            xp_gained,
            &format!("Completed: {title}"),
        );
        ledger.grant_currency(
            player.as_deref_mut(),
            coins_gained,
            &format!("Quest reward: {title}"),
        );

        let counts = CompletionCounts {
            lifetime: lifetime_before.saturating_add(1),
            today: self.completed_on(clock, clock.calendar_day(now)).count(),
        };
        let achievements = check_achievements(counts, ledger.feed(), now);

        let celebration = CELEBRATION_MESSAGES
            .choose(rng)
            .copied()
            .unwrap_or(CELEBRATION_MESSAGES[0]);
        ledger.feed().push_with_icon(
            NotificationKind::QuestComplete,
            "Quest Complete! 🏆",
            celebration,
            None,
            now,
        );

        Some(CompletionReport {
            quest_id: id.to_string(),
            completed_at: now,
            early,
            xp_gained,
            coins_gained,
            xp_grant,
            achievements,
            celebration,
        })
    }

    /// Remove a quest; returns the removed record if it existed.
    pub fn delete_quest(&mut self, id: &str) -> Option<QuestRecord> {
        let index = self.quests.iter().position(|q| q.id == id)?;
        Some(self.quests.remove(index))
    }

    /// Apply a patch and refresh `updated_at`.
    pub fn update_quest(
        &mut self,
        id: &str,
        patch: QuestPatch,
        now: DateTime<Utc>,
    ) -> Option<&QuestRecord> {
        let quest = self.quests.iter_mut().find(|q| q.id == id)?;
        patch.apply(quest);
        quest.updated_at = now;
        Some(quest)
    }

    pub fn completed(&self) -> impl Iterator<Item = &QuestRecord> {
        self.quests.iter().filter(|q| q.is_completed)
    }

    pub fn pending(&self) -> impl Iterator<Item = &QuestRecord> {
        self.quests.iter().filter(|q| !q.is_completed)
    }

    /// Quests due on the clock's current calendar day.
    pub fn todays_quests<'s, C: Clock + ?Sized>(
        &'s self,
        clock: &'s C,
    ) -> impl Iterator<Item = &'s QuestRecord> + 's {
        let today = clock.today();
        self.quests
            .iter()
            .filter(move |q| clock.calendar_day(q.due_date) == today)
    }

    /// Pending quests whose due date has passed.
    pub fn overdue_quests(&self, now: DateTime<Utc>) -> impl Iterator<Item = &QuestRecord> {
        self.quests
            .iter()
            .filter(move |q| !q.is_completed && q.due_date < now)
    }

    #[must_use]
    pub fn has_overdue(&self, now: DateTime<Utc>) -> bool {
        self.overdue_quests(now).next().is_some()
    }

    /// Quests completed on `day` as the clock sees calendar days.
    pub fn completed_on<'s, C: Clock + ?Sized>(
        &'s self,
        clock: &'s C,
        day: chrono::NaiveDate,
    ) -> impl Iterator<Item = &'s QuestRecord> + 's {
        self.quests.iter().filter(move |q| {
            q.is_completed
                && q
                    .completed_at
                    .is_some_and(|at| clock.calendar_day(at) == day)
        })
    }

    #[must_use]
    pub fn by_difficulty(&self) -> BTreeMap<Difficulty, Vec<&QuestRecord>> {
        let mut grouped: BTreeMap<Difficulty, Vec<&QuestRecord>> =
            Difficulty::ALL.iter().map(|d| (*d, Vec::new())).collect();
        for quest in &self.quests {
            grouped.entry(quest.difficulty).or_default().push(quest);
        }
        grouped
    }
}

/// Dress up a plain title, e.g. "Mighty Laundry of Glory".
pub fn fun_quest_title<R: Rng + ?Sized>(original: &str, rng: &mut R) -> String {
    let prefix = QUEST_PREFIXES.choose(rng).copied().unwrap_or("Epic");
    let suffix = QUEST_SUFFIXES
        .choose(rng)
        .copied()
        .unwrap_or("of Productivity");
    format!("{prefix} {original} {suffix}")
}

/// Random 64-bit hex identifier for new records.
pub fn new_record_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:016x}", rng.next_u64())
}

/// The starter quest offered to a brand-new profile.
#[must_use]
pub fn example_quest_draft(now: DateTime<Utc>) -> QuestDraft {
    QuestDraft {
        description: "Write comprehensive docs for the new feature".to_string(),
        tags: vec!["work".to_string(), "documentation".to_string()],
        priority: Priority::High,
        estimated_time: 120,
        category: "Work".to_string(),
        ..QuestDraft::new(
            "Complete project documentation",
            Difficulty::Medium,
            50,
            25,
            now,
        )
    }
}
