//! Level table: the ordered thresholds that turn lifetime XP into a rank.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::OnceLock;
use thiserror::Error;

/// A single rung on the level ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub level: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Lifetime XP needed to reach this level
    pub xp_required: u64,
    /// Coins granted once when the level is reached
    #[serde(default)]
    pub reward_coins: u64,
    #[serde(default)]
    pub unlocked_features: SmallVec<[String; 2]>,
}

impl LevelDefinition {
    fn builtin(
        level: u32,
        title: &str,
        xp_required: u64,
        description: &str,
        reward_coins: u64,
        feature: &str,
    ) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.to_string(),
            xp_required,
            reward_coins,
            unlocked_features: smallvec![feature.to_string()],
        }
    }
}

/// Problems detected while validating a level table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelTableError {
    #[error("level table is empty")]
    Empty,
    #[error("first level must require 0 XP (got {0})")]
    FirstThresholdNotZero(u64),
    #[error("level {level} requires {xp} XP, not above the previous threshold {previous}")]
    NonIncreasingThreshold { level: u32, xp: u64, previous: u64 },
    #[error("level {level} does not follow level {previous}")]
    NonIncreasingLevel { level: u32, previous: u32 },
    #[error("level table JSON is invalid: {0}")]
    Parse(String),
}

/// Ordered, validated list of level definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelTable(Vec<LevelDefinition>);

impl LevelTable {
    /// Build a table, checking ordering invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, does not start at 0 XP, or its
    /// levels and thresholds are not strictly increasing.
    pub fn new(levels: Vec<LevelDefinition>) -> Result<Self, LevelTableError> {
        let first = levels.first().ok_or(LevelTableError::Empty)?;
        if first.xp_required != 0 {
            return Err(LevelTableError::FirstThresholdNotZero(first.xp_required));
        }
        for pair in levels.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.level <= prev.level {
                return Err(LevelTableError::NonIncreasingLevel {
                    level: next.level,
                    previous: prev.level,
                });
            }
            if next.xp_required <= prev.xp_required {
                return Err(LevelTableError::NonIncreasingThreshold {
                    level: next.level,
                    xp: next.xp_required,
                    previous: prev.xp_required,
                });
            }
        }
        Ok(Self(levels))
    }

    /// Parse a table from a JSON array of level definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the table fails validation.
    pub fn from_json(json: &str) -> Result<Self, LevelTableError> {
        let levels: Vec<LevelDefinition> =
            serde_json::from_str(json).map_err(|e| LevelTableError::Parse(e.to_string()))?;
        Self::new(levels)
    }

    /// The built-in ten level ladder.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static TABLE: OnceLock<LevelTable> = OnceLock::new();
        TABLE.get_or_init(|| Self(builtin_levels()))
    }

    #[must_use]
    pub fn get(&self, level: u32) -> Option<&LevelDefinition> {
        self.0.iter().find(|def| def.level == level)
    }

    /// The entry directly above `level`, if any.
    #[must_use]
    pub fn next_after(&self, level: u32) -> Option<&LevelDefinition> {
        self.0.iter().find(|def| def.level > level)
    }

    #[must_use]
    pub fn first(&self) -> &LevelDefinition {
        &self.0[0]
    }

    #[must_use]
    pub fn last(&self) -> &LevelDefinition {
        &self.0[self.0.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a validated table has at least one level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl<'de> Deserialize<'de> for LevelTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let levels = Vec::<LevelDefinition>::deserialize(deserializer)?;
        Self::new(levels).map_err(serde::de::Error::custom)
    }
}

fn builtin_levels() -> Vec<LevelDefinition> {
    vec![
        LevelDefinition::builtin(
            1,
            "Procrastination Padawan",
            0,
            "Welcome to your quest!",
            0,
            "Basic scheduling",
        ),
        LevelDefinition::builtin(
            2,
            "Task Trainee",
            100,
            "Getting the hang of it!",
            50,
            "Quest categories",
        ),
        LevelDefinition::builtin(
            3,
            "Schedule Squire",
            300,
            "Building good habits!",
            100,
            "Recurring quests",
        ),
        LevelDefinition::builtin(
            4,
            "Productivity Paladin",
            600,
            "Becoming a true warrior!",
            150,
            "Advanced stats",
        ),
        LevelDefinition::builtin(
            5,
            "Time Management Mage",
            1000,
            "Mastering the arcane arts!",
            200,
            "Custom themes",
        ),
        LevelDefinition::builtin(
            6,
            "Efficiency Enchanter",
            1500,
            "Wielding powerful productivity spells!",
            300,
            "Team quests",
        ),
        LevelDefinition::builtin(
            7,
            "Deadline Dragon Slayer",
            2100,
            "No deadline is too fearsome!",
            400,
            "Priority automation",
        ),
        LevelDefinition::builtin(
            8,
            "Calendar Crusader",
            2800,
            "Defending the realm from chaos!",
            500,
            "AI suggestions",
        ),
        LevelDefinition::builtin(
            9,
            "Scheduling Sorcerer Supreme",
            3600,
            "Master of time and space!",
            750,
            "Ultimate customization",
        ),
        LevelDefinition::builtin(
            10,
            "Legendary Productivity Overlord",
            4500,
            "You have achieved the impossible!",
            1000,
            "All features unlocked",
        ),
    ]
}
