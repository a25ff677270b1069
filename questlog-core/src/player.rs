//! Player profile and lifetime statistics.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::levels::LevelTable;

pub const DEFAULT_PLAYER_ID: &str = "1";
pub const DEFAULT_USERNAME: &str = "QuestMaster";
pub const DEFAULT_AVATAR: &str = "🎮";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAggregate {
    pub id: String,
    pub username: String,
    pub level: u32,
    /// XP earned since the profile was created; kept alongside `total_xp`
    pub current_xp: u64,
    pub total_xp: u64,
    pub coins: u64,
    pub title: String,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

fn default_avatar() -> String {
    DEFAULT_AVATAR.to_string()
}

impl PlayerAggregate {
    /// A brand-new level-one profile.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        table: &LevelTable,
        now: DateTime<Utc>,
    ) -> Self {
        let first = table.first();
        Self {
            id: id.into(),
            username: username.into(),
            level: first.level,
            current_xp: 0,
            total_xp: 0,
            coins: 0,
            title: first.title.clone(),
            avatar: default_avatar(),
            created_at: now,
            last_active: now,
        }
    }

    /// The default guest profile.
    #[must_use]
    pub fn guest(table: &LevelTable, now: DateTime<Utc>) -> Self {
        Self::new(DEFAULT_PLAYER_ID, DEFAULT_USERNAME, table, now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub quests_completed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Minutes
    pub total_time_spent: u32,
    pub average_quest_time: f64,
    pub productivity_score: u32,
    #[serde(default)]
    pub category_stats: BTreeMap<String, u32>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            quests_completed: 0,
            current_streak: 0,
            longest_streak: 0,
            total_time_spent: 0,
            average_quest_time: 0.0,
            productivity_score: 100,
            category_stats: BTreeMap::new(),
        }
    }
}

/// Partial update for [`PlayerStats`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsPatch {
    pub quests_completed: Option<u32>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub total_time_spent: Option<u32>,
    pub average_quest_time: Option<f64>,
    pub productivity_score: Option<u32>,
    pub category_stats: Option<BTreeMap<String, u32>>,
}

impl PlayerStats {
    pub fn update(&mut self, patch: StatsPatch) {
        if let Some(v) = patch.quests_completed {
            self.quests_completed = v;
        }
        if let Some(v) = patch.current_streak {
            self.current_streak = v;
        }
        if let Some(v) = patch.longest_streak {
            self.longest_streak = v;
        }
        if let Some(v) = patch.total_time_spent {
            self.total_time_spent = v;
        }
        if let Some(v) = patch.average_quest_time {
            self.average_quest_time = v;
        }
        if let Some(v) = patch.productivity_score {
            self.productivity_score = v;
        }
        if let Some(v) = patch.category_stats {
            self.category_stats = v;
        }
    }

    /// Count a completion in the lifetime and per-category tallies.
    pub fn record_completion(&mut self, category: &str) {
        self.quests_completed = self.quests_completed.saturating_add(1);
        if !category.is_empty() {
            *self.category_stats.entry(category.to_string()).or_insert(0) += 1;
        }
    }

    #[must_use]
    pub fn is_new_player(&self, player: &PlayerAggregate) -> bool {
        player.level == 1 && self.quests_completed == 0
    }
}
