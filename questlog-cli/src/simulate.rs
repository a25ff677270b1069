//! Scripted completion runs against an in-memory session with a pinned clock.
use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Duration, TimeZone, Utc};
use colored::Colorize;
use questlog_core::quest::early_bonus;
use questlog_core::{
    AchievementId, CompletionReport, Difficulty, FixedClock, LevelTable, MILESTONES,
    MemorySession, NotificationKind, QuestDraft, level_for_total_xp, memory_session,
};
use serde::Serialize;
use std::time::Instant;

pub const DEFAULT_SIMULATION_SEED: u64 = 1337;

type ScenarioFn = fn(&mut SimRun) -> Result<()>;

pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

pub const SCENARIOS: [Scenario; 4] = [
    Scenario {
        key: "smoke",
        name: "Smoke",
        description: "Create and complete a handful of quests",
        run: smoke,
    },
    Scenario {
        key: "early-bird",
        name: "Early Bird",
        description: "Early completions pay 1.2x XP, late ones the base reward",
        run: early_bird,
    },
    Scenario {
        key: "milestones",
        name: "Milestones",
        description: "Fifty daily completions unlock every milestone exactly once",
        run: milestones,
    },
    Scenario {
        key: "level-jump",
        name: "Level Jump",
        description: "One large grant skips levels with a single level-up",
        run: level_jump,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.key, s.description))
}

pub fn find_scenario(key: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.key == key)
}

/// Split a comma list and replace `all` with every known scenario.
pub fn expand_scenarios(arg: &str) -> Vec<String> {
    let mut keys: Vec<String> = arg
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if keys.iter().any(|k| k == "all") {
        keys.retain(|k| k != "all");
        for scenario in &SCENARIOS {
            if !keys.iter().any(|k| k == scenario.key) {
                keys.push(scenario.key.to_string());
            }
        }
    }
    keys
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub seed: u64,
    pub quests_completed: usize,
    pub final_level: u32,
    pub total_xp: u64,
    pub coins: u64,
    pub level_ups: usize,
    pub achievements: Vec<String>,
    pub failures: Vec<String>,
    pub duration: std::time::Duration,
}

fn sim_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

struct SimRun {
    session: MemorySession<FixedClock>,
    verbose: bool,
    completed: usize,
    achievements: Vec<AchievementId>,
}

impl SimRun {
    fn new(levels: LevelTable, seed: u64, verbose: bool) -> Self {
        let mut session = memory_session(levels, FixedClock::at(sim_start()), seed);
        session.load_player();
        Self {
            session,
            verbose,
            completed: 0,
            achievements: Vec::new(),
        }
    }

    fn add(&mut self, difficulty: Difficulty, xp: u64, coins: u64, due_in: Duration) -> String {
        let due = self.session.now() + due_in;
        let title = self.session.fun_title("Simulated quest");
        self.session
            .create_quest(QuestDraft::new(title, difficulty, xp, coins, due))
            .id
    }

    fn complete(&mut self, id: &str) -> Result<CompletionReport> {
        let report = self
            .session
            .complete_quest(id)
            .with_context(|| format!("quest {id} could not be completed"))?;
        self.completed += 1;
        self.achievements.extend(report.achievements.iter().copied());
        if self.verbose {
            println!(
                "   {} +{} XP, +{} coins{}",
                "✔".green(),
                report.xp_gained,
                report.coins_gained,
                if report.early { " (early)" } else { "" }
            );
        }
        Ok(report)
    }

    fn total_xp(&self) -> u64 {
        self.session.player().map_or(0, |p| p.total_xp)
    }

    fn level_ups(&self) -> usize {
        self.session.feed().count_kind(NotificationKind::LevelUp)
    }
}

pub fn run_scenario(
    scenario: &Scenario,
    levels: &LevelTable,
    seed: u64,
    verbose: bool,
) -> ScenarioResult {
    let started = Instant::now();
    let mut run = SimRun::new(levels.clone(), seed, verbose);
    let failures = match (scenario.run)(&mut run) {
        Ok(()) => Vec::new(),
        Err(err) => vec![format!("{err:#}")],
    };
    let player = run.session.player();
    ScenarioResult {
        scenario_name: scenario.name.to_string(),
        passed: failures.is_empty(),
        seed,
        quests_completed: run.completed,
        final_level: player.map_or(1, |p| p.level),
        total_xp: run.total_xp(),
        coins: player.map_or(0, |p| p.coins),
        level_ups: run.level_ups(),
        achievements: run
            .achievements
            .iter()
            .map(|a| a.title().to_string())
            .collect(),
        failures,
        duration: started.elapsed(),
    }
}

fn smoke(run: &mut SimRun) -> Result<()> {
    let quests = [
        run.add(Difficulty::Easy, 25, 5, Duration::days(1)),
        run.add(Difficulty::Medium, 50, 10, Duration::hours(-1)),
        run.add(Difficulty::Hard, 100, 20, Duration::hours(2)),
    ];
    let mut earned = 0;
    for id in &quests {
        earned += run.complete(id)?.xp_gained;
    }
    let total = run.total_xp();
    ensure!(total == earned, "player holds {total} XP but {earned} was paid out");

    let level = run.session.current_level();
    let expected = level_for_total_xp(run.session.levels(), total);
    ensure!(level == expected, "level {level} does not match {expected} for {total} XP");

    ensure!(
        run.session.complete_quest(&quests[0]).is_none(),
        "a completed quest paid out twice"
    );
    ensure!(run.total_xp() == total, "repeat completion changed XP");
    ensure!(
        run.session.stats().quests_completed == 3,
        "stats should count three completions"
    );
    ensure!(
        run.achievements.contains(&AchievementId::FirstBlood),
        "first completion should unlock First Blood"
    );
    ensure!(
        run.achievements.contains(&AchievementId::DailyDestroyer),
        "three completions in a day should unlock Daily Destroyer"
    );
    Ok(())
}

fn early_bird(run: &mut SimRun) -> Result<()> {
    let early = run.add(Difficulty::Medium, 47, 0, Duration::days(1));
    let late = run.add(Difficulty::Medium, 47, 0, Duration::days(-1));
    let on_time = run.add(Difficulty::Medium, 47, 0, Duration::zero());

    let report = run.complete(&early)?;
    ensure!(report.early, "quest due tomorrow should count as early");
    ensure!(
        report.xp_gained == early_bonus(47),
        "early completion paid {} XP, expected {}",
        report.xp_gained,
        early_bonus(47)
    );

    let report = run.complete(&late)?;
    ensure!(!report.early, "overdue quest counted as early");
    ensure!(report.xp_gained == 47, "late completion paid {} XP", report.xp_gained);

    let report = run.complete(&on_time)?;
    ensure!(!report.early, "quest due right now counted as early");
    ensure!(report.xp_gained == 47, "on-time completion paid {} XP", report.xp_gained);
    Ok(())
}

fn milestones(run: &mut SimRun) -> Result<()> {
    let mut fired: Vec<(usize, AchievementId)> = Vec::new();
    for n in 1..=50_usize {
        run.session.clock().advance(Duration::days(1));
        let id = run.add(Difficulty::Easy, 10, 1, Duration::hours(1));
        let report = run.complete(&id)?;
        fired.extend(report.achievements.into_iter().map(|a| (n, a)));
    }
    let expected = MILESTONES.to_vec();
    ensure!(
        fired == expected,
        "milestones fired as {fired:?}, expected {expected:?}"
    );
    Ok(())
}

fn level_jump(run: &mut SimRun) -> Result<()> {
    let levels = run.session.levels().clone();
    let first = levels.first().clone();
    let target = levels.iter().nth(2).unwrap_or_else(|| levels.last()).clone();

    let id = run.add(Difficulty::Legendary, target.xp_required, 0, Duration::hours(-1));
    let report = run.complete(&id)?;
    let player = run
        .session
        .player()
        .context("simulation player was not loaded")?;

    ensure!(
        player.level == target.level,
        "reached level {}, expected {}",
        player.level,
        target.level
    );
    ensure!(player.title == target.title, "title is {:?}", player.title);

    let expected_ups = usize::from(target.level > first.level);
    ensure!(
        run.level_ups() == expected_ups,
        "{} level-up notifications, expected {expected_ups}",
        run.level_ups()
    );
    let expected_coins = if expected_ups == 1 { target.reward_coins } else { 0 };
    ensure!(
        player.coins == expected_coins,
        "player has {} coins, expected {expected_coins}",
        player.coins
    );
    ensure!(
        report.xp_grant.is_some_and(|g| g.level_before == first.level),
        "grant did not start from the first level"
    );
    Ok(())
}
