use chrono::{DateTime, Duration, TimeZone, Utc};
use questlog_core::{
    Difficulty, FixedClock, GuestStore, IdentityProvider, LevelTable, MemoryGuestStore, MemoryIdentity,
    MemoryRemoteStore, QuestDraft, QuestPatch, QuestSession, RemoteStore, Route, SyncTarget,
};

type Session = QuestSession<MemoryIdentity, MemoryRemoteStore, MemoryGuestStore, FixedClock>;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 5, 18, 30, 0).unwrap()
}

fn session() -> Session {
    let registered = start() - Duration::days(30);
    QuestSession::new(
        LevelTable::default(),
        MemoryIdentity::new().with_account("hero@example.com", "s3cret", registered),
        MemoryRemoteStore::new(),
        MemoryGuestStore::new(),
        FixedClock::at(start()),
        77,
    )
}

fn draft(title: &str) -> QuestDraft {
    let due = Utc.with_ymd_and_hms(2024, 11, 6, 9, 0, 0).unwrap();
    QuestDraft::new(title, Difficulty::Hard, 60, 10, due)
}

#[test]
fn guest_mode_writes_to_local_bucket() {
    let mut session = session();
    assert_eq!(session.current_target(), SyncTarget::Guest);
    session.create_quest(draft("Sweep"));
    assert_eq!(session.sync().guest().get_all().len(), 1);
    assert_eq!(session.sync().remote().row_count(), 0);
}

#[test]
fn signing_in_switches_to_remote_rows() {
    let mut session = session();
    session.create_quest(draft("Local only"));

    session.sign_in("hero@example.com", "s3cret").unwrap();
    assert!(session.is_authenticated());
    assert!(session.quests().is_empty(), "remote rows replace the guest log");

    let quest = session.create_quest(draft("Synced"));
    let user_id = "user-1";
    assert_eq!(session.sync().remote().list(user_id).unwrap().len(), 1);

    assert!(session.update_quest(
        &quest.id,
        QuestPatch {
            title: Some("Synced and renamed".to_string()),
            ..QuestPatch::default()
        }
    ));
    let rows = session.sync().remote().list(user_id).unwrap();
    assert_eq!(rows[0].title, "Synced and renamed");

    assert!(session.delete_quest(&quest.id));
    assert!(!session.delete_quest(&quest.id));
    assert_eq!(session.sync().remote().row_count(), 0);

    session.sign_out();
    assert!(!session.is_authenticated());
    assert_eq!(session.quests().len(), 1);
    assert_eq!(session.quests().quests()[0].title, "Local only");
}

#[test]
fn bad_credentials_show_a_transient_error() {
    let mut session = session();
    assert!(session.sign_in("hero@example.com", "wrong").is_err());
    assert_eq!(session.error(), Some("Invalid login credentials"));
    session.clock().advance(Duration::seconds(6));
    assert_eq!(session.error(), None);
}

#[test]
fn remote_failure_keeps_the_optimistic_change() {
    let mut session = session();
    session.sign_in("hero@example.com", "s3cret").unwrap();
    session.load_player();
    let quest = session.create_quest(draft("Flaky"));

    session.sync_mut().remote_mut().fail_with("network unreachable");
    let report = session.complete_quest(&quest.id).unwrap();
    assert_eq!(report.xp_gained, 72);
    assert!(session.quests().get(&quest.id).unwrap().is_completed);
    assert_eq!(session.player().unwrap().total_xp, 72);
    assert_eq!(session.error(), Some("network unreachable"));

    let stored = &session.sync().guest().get_all();
    assert!(stored.is_empty(), "signed-in changes never touch the guest bucket");
}

#[test]
fn guest_write_failure_uses_fallback_message() {
    let mut session = session();
    session.sync_mut().guest_mut().fail_writes("");
    let quest = session.create_quest(draft("Unsaved"));
    assert!(session.quests().get(&quest.id).is_some());
    assert_eq!(session.error(), Some("Failed to create task"));
}

#[test]
fn notifications_expire_on_tick() {
    let mut session = session();
    session.load_player();
    let quest = session.create_quest(draft("Ping"));
    session.complete_quest(&quest.id).unwrap();
    assert!(!session.active_notifications().is_empty());

    session.clock().advance(Duration::seconds(5));
    assert!(session.active_notifications().is_empty());
    let dropped = session.tick();
    assert!(dropped > 0);
    assert!(session.feed().is_empty());
}

#[test]
fn navigation_is_gated_on_identity() {
    let mut session = session();
    assert_eq!(session.navigate(Route::Quests), Route::Login);
    assert_eq!(session.navigate(Route::Home), Route::Home);
    session.sign_in("hero@example.com", "s3cret").unwrap();
    assert_eq!(session.navigate(Route::Quests), Route::Quests);
}

#[test]
fn signed_in_profile_uses_identity() {
    let mut session = session();
    session.sign_in("hero@example.com", "s3cret").unwrap();
    let player = session.load_player();
    assert_eq!(player.id, "user-1");
    assert_eq!(player.username, "hero@example.com");
    assert!(session.is_new_player());
    assert!(session.seed_example_quests());
    assert!(!session.seed_example_quests());
}

#[test]
fn sign_up_stamps_the_session_clock() {
    let mut session = session();
    session.clock().advance(Duration::minutes(90));
    session.sign_up("new@example.com", "pw").unwrap();
    let user = session.identity().current_user().unwrap();
    assert_eq!(user.created_at, start() + Duration::minutes(90));

    assert!(session.sign_up("hero@example.com", "again").is_err());
    assert_eq!(session.error(), Some("User already registered"));
}
