use chrono::{DateTime, Duration, TimeZone, Utc};
use questlog_core::{
    AchievementId, Difficulty, FixedClock, LevelTable, MILESTONES, MemorySession,
    NotificationKind, QuestDraft, RewardLedger, memory_session,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 10, 0, 0).unwrap()
}

fn three_levels() -> LevelTable {
    LevelTable::from_json(
        r#"[
            {"level": 1, "title": "Novice", "xp_required": 0},
            {"level": 2, "title": "Adept", "xp_required": 100, "reward_coins": 50},
            {"level": 3, "title": "Master", "xp_required": 300, "reward_coins": 100}
        ]"#,
    )
    .unwrap()
}

fn session(levels: LevelTable) -> MemorySession<FixedClock> {
    let mut session = memory_session(levels, FixedClock::at(start()), 2024);
    session.load_player();
    session
}

fn add_quest(session: &mut MemorySession<FixedClock>, xp: u64, due: DateTime<Utc>) -> String {
    session
        .create_quest(QuestDraft::new("Task", Difficulty::Medium, xp, 0, due))
        .id
}

#[test]
fn completing_a_250_xp_quest_reaches_level_two_once() {
    let mut session = session(three_levels());
    let id = add_quest(&mut session, 250, start() - Duration::hours(1));
    let report = session.complete_quest(&id).unwrap();

    let player = session.player().unwrap();
    assert_eq!(player.level, 2);
    assert_eq!(player.total_xp, 250);
    assert_eq!(player.title, "Adept");
    assert_eq!(player.coins, 50);
    assert!(report.xp_grant.unwrap().leveled_up());
    assert_eq!(session.feed().count_kind(NotificationKind::LevelUp), 1);
}

#[test]
fn crossing_two_thresholds_jumps_to_level_three() {
    let mut session = session(three_levels());
    let id = add_quest(&mut session, 350, start() - Duration::hours(1));
    session.complete_quest(&id).unwrap();

    let player = session.player().unwrap();
    assert_eq!(player.level, 3);
    assert_eq!(player.title, "Master");
    assert_eq!(session.feed().count_kind(NotificationKind::LevelUp), 1);
    assert!((session.xp_progress() - 100.0).abs() < f64::EPSILON);
    assert_eq!(session.xp_to_next_level(), 0);
}

#[test]
fn early_and_late_completion_rewards() {
    let mut session = session(LevelTable::default());
    let tomorrow = add_quest(&mut session, 47, start() + Duration::days(1));
    let yesterday = add_quest(&mut session, 47, start() - Duration::days(1));

    let early = session.complete_quest(&tomorrow).unwrap();
    assert_eq!(early.xp_gained, 56);
    let late = session.complete_quest(&yesterday).unwrap();
    assert_eq!(late.xp_gained, 47);
    assert_eq!(session.player().unwrap().total_xp, 103);
}

#[test]
fn repeated_completion_changes_nothing() {
    let mut session = session(LevelTable::default());
    let id = add_quest(&mut session, 80, start() + Duration::days(1));
    session.complete_quest(&id).unwrap();
    let player = session.player().cloned();
    let completed_at = session.quests().get(&id).unwrap().completed_at;
    let feed_len = session.feed().len();

    session.clock().advance(Duration::minutes(10));
    assert!(session.complete_quest(&id).is_none());
    assert_eq!(session.player().cloned(), player);
    assert_eq!(session.quests().get(&id).unwrap().completed_at, completed_at);
    assert_eq!(session.feed().len(), feed_len);
    assert_eq!(session.stats().quests_completed, 1);
}

#[test]
fn milestone_achievements_fire_exactly_at_their_counts() {
    let mut session = session(LevelTable::default());
    let mut fired: Vec<(usize, AchievementId)> = Vec::new();
    for n in 1..=52 {
        // One completion per day keeps the daily badge out of the picture.
        session.clock().advance(Duration::days(1));
        let due = session.now() + Duration::hours(1);
        let id = add_quest(&mut session, 1, due);
        let report = session.complete_quest(&id).unwrap();
        fired.extend(report.achievements.into_iter().map(|a| (n, a)));
    }
    let expected: Vec<(usize, AchievementId)> = MILESTONES.to_vec();
    assert_eq!(fired, expected);
}

#[test]
fn daily_badge_repeats_after_the_third_completion() {
    let mut session = session(LevelTable::default());
    let mut daily = 0;
    for _ in 0..5 {
        let id = add_quest(&mut session, 1, start());
        let report = session.complete_quest(&id).unwrap();
        daily += report
            .achievements
            .iter()
            .filter(|a| **a == AchievementId::DailyDestroyer)
            .count();
    }
    assert_eq!(daily, 3);
}

#[test]
fn xp_grants_are_additive_through_the_ledger() {
    let levels = LevelTable::default();
    let mut session = session(levels.clone());
    let mut player = session.player().cloned().unwrap();
    let mut total = 0;
    for amount in [5_u64, 0, 95, 200, 1_000, 4_000] {
        let mut ledger = RewardLedger::new(&levels, session.feed_mut(), start());
        ledger.grant_experience(Some(&mut player), amount, "bulk");
        total += amount;
        assert_eq!(player.total_xp, total);
        assert!(levels.get(player.level).unwrap().xp_required <= player.total_xp);
    }
    assert_eq!(player.level, 10);
    assert_eq!(player.title, "Legendary Productivity Overlord");
}
