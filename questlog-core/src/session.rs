//! Composition root: one owned session wiring every component together.
use chrono::{DateTime, Utc};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::clock::Clock;
use crate::collab::{CollabError, GuestStore, IdentityProvider, RemoteStore};
use crate::ledger::RewardLedger;
use crate::levels::LevelTable;
use crate::notifications::{NotificationEvent, NotificationFeed};
use crate::player::{PlayerAggregate, PlayerStats, StatsPatch};
use crate::progression;
use crate::quest::{
    CompletionReport, QuestDraft, QuestLog, QuestPatch, QuestRecord, example_quest_draft,
    fun_quest_title,
};
use crate::routes::{Route, guard};
use crate::sync::{SyncTarget, TaskSync};

/// Everything one player's session needs, owned in one place.
pub struct QuestSession<I, R, G, C> {
    levels: LevelTable,
    player: Option<PlayerAggregate>,
    stats: PlayerStats,
    quests: QuestLog,
    feed: NotificationFeed,
    identity: I,
    sync: TaskSync<R, G>,
    clock: C,
    rng: ChaCha20Rng,
}

impl<I, R, G, C> QuestSession<I, R, G, C>
where
    I: IdentityProvider,
    R: RemoteStore,
    G: GuestStore,
    C: Clock,
{
    pub fn new(levels: LevelTable, identity: I, remote: R, guest: G, clock: C, seed: u64) -> Self {
        Self {
            levels,
            player: None,
            stats: PlayerStats::default(),
            quests: QuestLog::new(),
            feed: NotificationFeed::new(),
            identity,
            sync: TaskSync::new(remote, guest),
            clock,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Load the player profile, creating one on first use.
    pub fn load_player(&mut self) -> &PlayerAggregate {
        let now = self.clock.now();
        let levels = &self.levels;
        let identity = &self.identity;
        let player = self.player.get_or_insert_with(|| match identity.current_user() {
            Some(user) => {
                let name = user.name.clone().unwrap_or_else(|| user.email.clone());
                PlayerAggregate::new(user.id.clone(), name, levels, now)
            }
            None => PlayerAggregate::guest(levels, now),
        });
        player.last_active = now;
        player
    }

    /// Install a previously saved profile and stats.
    pub fn restore_player(&mut self, player: PlayerAggregate, stats: PlayerStats) {
        self.player = Some(player);
        self.stats = stats;
    }

    /// Pull quests from whichever store matches the current identity.
    pub fn load_quests(&mut self) -> bool {
        let now = self.clock.now();
        let target = SyncTarget::for_user(self.identity.current_user());
        debug!("loading quests via {target:?}");
        self.sync.load(target, &mut self.quests, now)
    }

    /// Add the starter quest when the log is empty. Returns true if added.
    pub fn seed_example_quests(&mut self) -> bool {
        if !self.quests.is_empty() {
            return false;
        }
        let draft = example_quest_draft(self.clock.now());
        self.create_quest(draft);
        true
    }

    pub fn create_quest(&mut self, draft: QuestDraft) -> QuestRecord {
        let now = self.clock.now();
        let mut ledger = RewardLedger::new(&self.levels, &mut self.feed, now);
        let record = self
            .quests
            .create_quest(draft, self.player.as_ref(), &mut ledger, &mut self.rng)
            .clone();
        let target = SyncTarget::for_user(self.identity.current_user());
        self.sync.created(target, &record, now);
        record
    }

    /// Complete a quest, pay out, check achievements, then persist.
    pub fn complete_quest(&mut self, id: &str) -> Option<CompletionReport> {
        let now = self.clock.now();
        let lifetime_before = usize::try_from(self.stats.quests_completed).unwrap_or(usize::MAX);
        let mut ledger = RewardLedger::new(&self.levels, &mut self.feed, now);
        let report = self.quests.complete_quest(
            id,
            self.player.as_mut(),
            &mut ledger,
            lifetime_before,
            &self.clock,
            &mut self.rng,
        )?;
        let record = self.quests.get(id)?.clone();
        self.stats.record_completion(&record.category);
        let target = SyncTarget::for_user(self.identity.current_user());
        self.sync.updated(target, &record, now);
        Some(report)
    }

    pub fn update_quest(&mut self, id: &str, patch: QuestPatch) -> bool {
        let now = self.clock.now();
        let Some(record) = self.quests.update_quest(id, patch, now).cloned() else {
            return false;
        };
        let target = SyncTarget::for_user(self.identity.current_user());
        self.sync.updated(target, &record, now);
        true
    }

    pub fn delete_quest(&mut self, id: &str) -> bool {
        let now = self.clock.now();
        if self.quests.delete_quest(id).is_none() {
            return false;
        }
        let target = SyncTarget::for_user(self.identity.current_user());
        self.sync.deleted(target, id, now);
        true
    }

    /// Sign in and switch to the user's remote quests.
    ///
    /// # Errors
    ///
    /// Returns the identity error after showing it in the error banner.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<(), CollabError> {
        let now = self.clock.now();
        match self.identity.sign_in(email, password) {
            Ok(user) => {
                debug!("signed in as {}", user.id);
                self.load_quests();
                Ok(())
            }
            Err(err) => {
                self.sync.set_error(err.to_string(), now);
                Err(err)
            }
        }
    }

    /// Create an account, sign in, and switch to its remote quests.
    ///
    /// # Errors
    ///
    /// Returns the identity error after showing it in the error banner.
    pub fn sign_up(&mut self, email: &str, password: &str) -> Result<(), CollabError> {
        let now = self.clock.now();
        match self.identity.sign_up(email, password, now) {
            Ok(_) => {
                self.load_quests();
                Ok(())
            }
            Err(err) => {
                self.sync.set_error(err.to_string(), now);
                Err(err)
            }
        }
    }

    /// Sign out and fall back to the guest bucket. Failures only show a banner.
    pub fn sign_out(&mut self) {
        let now = self.clock.now();
        if let Err(err) = self.identity.sign_out() {
            self.sync.set_error(err.to_string(), now);
            return;
        }
        self.load_quests();
    }

    /// Expire old notifications. Returns how many were dropped.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        self.feed.prune(now)
    }

    pub fn update_stats(&mut self, patch: StatsPatch) {
        self.stats.update(patch);
    }

    pub fn fun_title(&mut self, original: &str) -> String {
        fun_quest_title(original, &mut self.rng)
    }

    /// Where navigating to `route` lands given the current identity.
    #[must_use]
    pub fn navigate(&self, route: Route) -> Route {
        guard(route, self.is_authenticated())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }

    #[must_use]
    pub fn current_level(&self) -> u32 {
        self.player.as_ref().map_or(1, |p| p.level)
    }

    #[must_use]
    pub fn current_xp(&self) -> u64 {
        self.player.as_ref().map_or(0, |p| p.current_xp)
    }

    #[must_use]
    pub fn current_title(&self) -> &str {
        progression::title_for_level(&self.levels, self.current_level())
    }

    #[must_use]
    pub fn xp_to_next_level(&self) -> u64 {
        self.player.as_ref().map_or(0, |p| {
            progression::xp_remaining_to_next_level(&self.levels, p.total_xp)
        })
    }

    /// Percentage toward the next level; 0 with no player loaded.
    #[must_use]
    pub fn xp_progress(&self) -> f64 {
        self.player
            .as_ref()
            .map_or(0.0, |p| progression::progress_percent(&self.levels, p.total_xp))
    }

    #[must_use]
    pub fn is_new_player(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|p| self.stats.is_new_player(p))
    }

    #[must_use]
    pub fn active_notifications(&self) -> Vec<&NotificationEvent> {
        self.feed.active(self.clock.now()).collect()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.sync.error(self.clock.now())
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub const fn player(&self) -> Option<&PlayerAggregate> {
        self.player.as_ref()
    }

    #[must_use]
    pub const fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    #[must_use]
    pub const fn quests(&self) -> &QuestLog {
        &self.quests
    }

    #[must_use]
    pub const fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub const fn feed_mut(&mut self) -> &mut NotificationFeed {
        &mut self.feed
    }

    #[must_use]
    pub const fn levels(&self) -> &LevelTable {
        &self.levels
    }

    #[must_use]
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn sync(&self) -> &TaskSync<R, G> {
        &self.sync
    }

    pub const fn sync_mut(&mut self) -> &mut TaskSync<R, G> {
        &mut self.sync
    }

    #[must_use]
    pub fn current_target(&self) -> SyncTarget<'_> {
        SyncTarget::for_user(self.identity.current_user())
    }
}
