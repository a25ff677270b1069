//! Threshold achievements evaluated after every quest completion.
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::notifications::{NotificationFeed, NotificationKind};

pub const ACHIEVEMENT_ICON: &str = "🏆";

/// Completions on one calendar day needed for the daily badge.
pub const DAILY_TARGET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementId {
    FirstBlood,
    QuestNovice,
    TaskTerminator,
    ProductivityProdigy,
    QuestOverlord,
    DailyDestroyer,
}

impl AchievementId {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FirstBlood => "First Blood! 🗡️",
            Self::QuestNovice => "Quest Novice! 🎯",
            Self::TaskTerminator => "Task Terminator! 🤖",
            Self::ProductivityProdigy => "Productivity Prodigy! 🧠",
            Self::QuestOverlord => "Quest Overlord! 👑",
            Self::DailyDestroyer => "Daily Destroyer! 🔥",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FirstBlood => "You completed your first quest!",
            Self::QuestNovice => "Five quests conquered!",
            Self::TaskTerminator => "Ten quests eliminated!",
            Self::ProductivityProdigy => "Twenty-five quests mastered!",
            Self::QuestOverlord => "Fifty quests dominated!",
            Self::DailyDestroyer => "Three quests completed today!",
        }
    }
}

/// Lifetime completion counts that unlock a milestone, matched exactly.
pub const MILESTONES: [(usize, AchievementId); 5] = [
    (1, AchievementId::FirstBlood),
    (5, AchievementId::QuestNovice),
    (10, AchievementId::TaskTerminator),
    (25, AchievementId::ProductivityProdigy),
    (50, AchievementId::QuestOverlord),
];

/// Counts the checker looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionCounts {
    pub lifetime: usize,
    pub today: usize,
}

/// Which achievements the counts satisfy, without emitting anything.
#[must_use]
pub fn evaluate(counts: CompletionCounts) -> Vec<AchievementId> {
    let mut hits: Vec<AchievementId> = MILESTONES
        .iter()
        .filter(|(target, _)| *target == counts.lifetime)
        .map(|(_, id)| *id)
        .collect();
    if counts.today >= DAILY_TARGET {
        hits.push(AchievementId::DailyDestroyer);
    }
    hits
}

/// Evaluate and push one notification per hit.
///
/// Unlocks are not remembered between calls, so a daily badge fires again on
/// every completion past the third that day.
pub fn check_achievements(
    counts: CompletionCounts,
    feed: &mut NotificationFeed,
    now: DateTime<Utc>,
) -> Vec<AchievementId> {
    let hits = evaluate(counts);
    for id in &hits {
        info!("achievement unlocked: {id:?}");
        feed.push_with_icon(
            NotificationKind::Achievement,
            id.title(),
            id.message(),
            Some(ACHIEVEMENT_ICON),
            now,
        );
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lifetime(n: usize) -> CompletionCounts {
        CompletionCounts {
            lifetime: n,
            today: 0,
        }
    }

    #[test]
    fn milestones_fire_only_at_exact_counts() {
        for (target, id) in MILESTONES {
            assert_eq!(evaluate(lifetime(target)), vec![id]);
            assert!(evaluate(lifetime(target + 1)).is_empty());
            if target > 1 {
                assert!(evaluate(lifetime(target - 1)).is_empty());
            }
        }
        assert!(evaluate(lifetime(0)).is_empty());
        assert!(evaluate(lifetime(51)).is_empty());
    }

    #[test]
    fn daily_badge_can_join_a_milestone() {
        let hits = evaluate(CompletionCounts {
            lifetime: 5,
            today: 3,
        });
        assert_eq!(
            hits,
            vec![AchievementId::QuestNovice, AchievementId::DailyDestroyer]
        );
        assert!(
            evaluate(CompletionCounts {
                lifetime: 7,
                today: 2
            })
            .is_empty()
        );
    }

    #[test]
    fn check_emits_one_notification_per_hit() {
        let now = Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap();
        let mut feed = NotificationFeed::new();
        let hits = check_achievements(
            CompletionCounts {
                lifetime: 1,
                today: 4,
            },
            &mut feed,
            now,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(feed.count_kind(NotificationKind::Achievement), 2);
        assert!(
            feed.entries()
                .iter()
                .all(|n| n.icon.as_deref() == Some(ACHIEVEMENT_ICON))
        );
    }
}
