//! Reward ledger: applies XP and coin grants to the player and handles level-ups.
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::levels::LevelTable;
use crate::notifications::{NotificationFeed, NotificationKind};
use crate::player::PlayerAggregate;
use crate::progression::level_for_total_xp;

/// What a single grant changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantOutcome {
    pub amount: u64,
    pub level_before: u32,
    pub level_after: u32,
}

impl GrantOutcome {
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Borrowed view of everything a grant touches besides the player.
pub struct RewardLedger<'a> {
    table: &'a LevelTable,
    feed: &'a mut NotificationFeed,
    now: DateTime<Utc>,
}

impl<'a> RewardLedger<'a> {
    pub fn new(table: &'a LevelTable, feed: &'a mut NotificationFeed, now: DateTime<Utc>) -> Self {
        Self { table, feed, now }
    }

    /// Instant every grant made through this ledger is stamped with.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub const fn table(&self) -> &LevelTable {
        self.table
    }

    pub fn feed(&mut self) -> &mut NotificationFeed {
        &mut *self.feed
    }

    /// Add experience; level-ups jump straight to the highest qualifying level.
    ///
    /// Returns `None` without touching anything when no player is loaded.
    pub fn grant_experience(
        &mut self,
        player: Option<&mut PlayerAggregate>,
        amount: u64,
        reason: &str,
    ) -> Option<GrantOutcome> {
        let player = player?;
        let level_before = player.level;
        player.current_xp = player.current_xp.saturating_add(amount);
        player.total_xp = player.total_xp.saturating_add(amount);
        player.last_active = self.now;
        debug!(
            "granted {amount} XP to {} ({reason}); total {}",
            player.id, player.total_xp
        );

        let new_level = level_for_total_xp(self.table, player.total_xp);
        if new_level > level_before {
            self.apply_level_up(player, new_level);
        }

        self.feed.push(
            NotificationKind::QuestComplete,
            format!("+{amount} XP!"),
            reason,
            self.now,
        );

        Some(GrantOutcome {
            amount,
            level_before,
            level_after: player.level,
        })
    }

    /// Add coins. Same no-player guard as [`Self::grant_experience`].
    pub fn grant_currency(
        &mut self,
        player: Option<&mut PlayerAggregate>,
        amount: u64,
        reason: &str,
    ) -> Option<GrantOutcome> {
        let player = player?;
        player.coins = player.coins.saturating_add(amount);
        player.last_active = self.now;
        debug!("granted {amount} coins to {} ({reason})", player.id);
        self.feed.push(
            NotificationKind::QuestComplete,
            format!("+{amount} coins! 💰"),
            reason,
            self.now,
        );
        Some(GrantOutcome {
            amount,
            level_before: player.level,
            level_after: player.level,
        })
    }

    /// Move the player to `new_level`, paying that level's coin reward.
    ///
    /// Returns false when the level is missing from the table; the level
    /// number is still recorded in that case.
    pub fn apply_level_up(&mut self, player: &mut PlayerAggregate, new_level: u32) -> bool {
        player.level = new_level;
        let Some(def) = self.table.get(new_level) else {
            return false;
        };
        player.title.clone_from(&def.title);
        player.coins = player.coins.saturating_add(def.reward_coins);
        info!(
            "{} reached level {new_level} ({}), +{} coins",
            player.id, def.title, def.reward_coins
        );
        self.feed.push(
            NotificationKind::LevelUp,
            "LEVEL UP! 🎉",
            format!("Welcome to level {new_level}: {}!", def.title),
            self.now,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn small_table() -> LevelTable {
        LevelTable::from_json(
            r#"[
                {"level": 1, "title": "One", "xp_required": 0},
                {"level": 2, "title": "Two", "xp_required": 100, "reward_coins": 10},
                {"level": 3, "title": "Three", "xp_required": 300, "reward_coins": 30}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn grant_is_additive() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut player = PlayerAggregate::guest(&table, now());
        let mut ledger = RewardLedger::new(&table, &mut feed, now());
        for amount in [0, 1, 17, 99, 250] {
            let before = player.total_xp;
            ledger.grant_experience(Some(&mut player), amount, "test");
            assert_eq!(player.total_xp, before + amount);
            assert_eq!(player.current_xp, player.total_xp);
        }
    }

    #[test]
    fn single_threshold_crossing_emits_one_level_up() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut player = PlayerAggregate::guest(&table, now());
        let outcome = RewardLedger::new(&table, &mut feed, now())
            .grant_experience(Some(&mut player), 250, "work")
            .unwrap();
        assert!(outcome.leveled_up());
        assert_eq!(player.level, 2);
        assert_eq!(player.total_xp, 250);
        assert_eq!(player.title, "Two");
        assert_eq!(player.coins, 10);
        assert_eq!(feed.count_kind(NotificationKind::LevelUp), 1);
    }

    #[test]
    fn multi_threshold_crossing_jumps_directly() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut player = PlayerAggregate::guest(&table, now());
        let outcome = RewardLedger::new(&table, &mut feed, now())
            .grant_experience(Some(&mut player), 350, "marathon")
            .unwrap();
        assert_eq!((outcome.level_before, outcome.level_after), (1, 3));
        assert_eq!(player.level, 3);
        assert_eq!(player.title, "Three");
        // Only the reached level pays out.
        assert_eq!(player.coins, 30);
        assert_eq!(feed.count_kind(NotificationKind::LevelUp), 1);
        let level_up = feed
            .entries()
            .iter()
            .find(|n| n.kind == NotificationKind::LevelUp)
            .unwrap();
        assert_eq!(level_up.message, "Welcome to level 3: Three!");
    }

    #[test]
    fn grants_without_player_are_noops() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut ledger = RewardLedger::new(&table, &mut feed, now());
        assert!(ledger.grant_experience(None, 50, "nobody").is_none());
        assert!(ledger.grant_currency(None, 50, "nobody").is_none());
        assert!(feed.is_empty());
    }

    #[test]
    fn currency_grant_notifies() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut player = PlayerAggregate::guest(&table, now());
        RewardLedger::new(&table, &mut feed, now()).grant_currency(
            Some(&mut player),
            25,
            "Quest reward: dishes",
        );
        assert_eq!(player.coins, 25);
        assert_eq!(feed.entries()[0].title, "+25 coins! 💰");
        assert_eq!(feed.entries()[0].message, "Quest reward: dishes");
    }

    #[test]
    fn level_up_to_unknown_level_skips_rewards() {
        let table = small_table();
        let mut feed = NotificationFeed::new();
        let mut player = PlayerAggregate::guest(&table, now());
        let applied = RewardLedger::new(&table, &mut feed, now()).apply_level_up(&mut player, 9);
        assert!(!applied);
        assert_eq!(player.level, 9);
        assert_eq!(player.title, "One");
        assert!(feed.is_empty());
    }
}
