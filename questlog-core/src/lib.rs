//! Questlog Core
//!
//! Platform-agnostic reward logic for the Questlog quest tracker: level
//! thresholds, XP and coin grants, quest completion payouts, achievements and
//! the notification feed. Identity, remote persistence and the guest bucket are
//! consumed through traits so front ends can plug in their own backends.

pub mod achievements;
pub mod clock;
pub mod collab;
pub mod ledger;
pub mod levels;
pub mod notifications;
pub mod player;
pub mod progression;
pub mod quest;
pub mod routes;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use achievements::{AchievementId, CompletionCounts, MILESTONES, check_achievements};
pub use clock::{Clock, FixedClock, SystemClock};
pub use collab::{
    CollabError, GUEST_BUCKET, GuestStore, IdentityProvider, MemoryGuestStore, MemoryIdentity,
    MemoryRemoteStore, RemoteStore, UserIdentity,
};
pub use ledger::{GrantOutcome, RewardLedger};
pub use levels::{LevelDefinition, LevelTable, LevelTableError};
pub use notifications::{NotificationEvent, NotificationFeed, NotificationKind};
pub use player::{PlayerAggregate, PlayerStats, StatsPatch};
pub use progression::{
    level_for_total_xp, progress_fraction, progress_percent, title_for_level,
    xp_remaining_to_next_level,
};
pub use quest::{
    CELEBRATION_MESSAGES, CompletionReport, Difficulty, Priority, QuestDraft, QuestLog,
    QuestPatch, QuestRecord, fun_quest_title,
};
pub use routes::{Route, guard};
pub use session::QuestSession;
pub use sync::{ErrorBanner, SyncTarget, TaskSync};

/// Session wired to the in-memory collaborators.
pub type MemorySession<C> = QuestSession<MemoryIdentity, MemoryRemoteStore, MemoryGuestStore, C>;

/// Build a guest-mode session over in-memory stores.
#[must_use]
pub fn memory_session<C: Clock>(levels: LevelTable, clock: C, seed: u64) -> MemorySession<C> {
    QuestSession::new(
        levels,
        MemoryIdentity::new(),
        MemoryRemoteStore::new(),
        MemoryGuestStore::new(),
        clock,
        seed,
    )
}
