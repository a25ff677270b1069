mod reports;
mod simulate;
mod store;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use questlog_core::{
    Clock, Difficulty, LevelTable, MemoryIdentity, MemoryRemoteStore, Priority, QuestDraft,
    QuestLog, QuestPatch, QuestRecord, QuestSession, SystemClock,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use simulate::{DEFAULT_SIMULATION_SEED, expand_scenarios, find_scenario, list_scenarios};
use store::FileGuestStore;

type CliSession = QuestSession<MemoryIdentity, MemoryRemoteStore, FileGuestStore, SystemClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
    Epic,
    Legendary,
}

impl DifficultyArg {
    const fn difficulty(self) -> Difficulty {
        match self {
            Self::Easy => Difficulty::Easy,
            Self::Medium => Difficulty::Medium,
            Self::Hard => Difficulty::Hard,
            Self::Epic => Difficulty::Epic,
            Self::Legendary => Difficulty::Legendary,
        }
    }

    /// XP used when `--xp` is not given.
    const fn default_xp(self) -> u64 {
        match self {
            Self::Easy => 25,
            Self::Medium => 50,
            Self::Hard => 100,
            Self::Epic => 200,
            Self::Legendary => 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityArg {
    const fn priority(self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Medium => Priority::Medium,
            Self::High => Priority::High,
            Self::Critical => Priority::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFilter {
    All,
    Pending,
    Completed,
    Today,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "questlog", version)]
#[command(about = "Turn your to-do list into quests: earn XP, level up, unlock achievements")]
struct Args {
    /// Directory holding the guest quest bucket and player profile
    #[arg(long, global = true, default_value = ".questlog")]
    data_dir: PathBuf,

    /// Custom level table (JSON array of level definitions)
    #[arg(long, global = true)]
    levels: Option<PathBuf>,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Optional path to write output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new quest
    Add(AddArgs),
    /// Show quests
    List {
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },
    /// Complete a quest and collect its rewards
    Complete {
        /// Quest id or a unique prefix of it
        id: String,
    },
    /// Edit fields of an existing quest
    Update(UpdateArgs),
    /// Remove a quest
    Delete {
        /// Quest id or a unique prefix of it
        id: String,
    },
    /// Show level, XP and quest counts
    Status,
    /// Print the level table
    Levels,
    /// Replay scripted completion scenarios and report the results
    Simulate(SimulateArgs),
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    title: String,

    #[arg(long, value_enum, default_value_t = DifficultyArg::Medium)]
    difficulty: DifficultyArg,

    /// XP reward; defaults by difficulty
    #[arg(long)]
    xp: Option<u64>,

    /// Coin reward; defaults to a fifth of the XP
    #[arg(long)]
    coins: Option<u64>,

    /// Due date: RFC 3339, YYYY-MM-DD, or an offset such as +2d, +6h, +30m
    #[arg(long, default_value = "+1d")]
    due: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    category: String,

    #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
    priority: PriorityArg,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Estimated minutes
    #[arg(long, default_value_t = 0)]
    estimate: u32,

    /// Dress the title up with an epic prefix and suffix
    #[arg(long)]
    fun: bool,
}

impl AddArgs {
    fn draft(&self, title: String, now: DateTime<Utc>) -> Result<QuestDraft> {
        let xp = self.xp.unwrap_or_else(|| self.difficulty.default_xp());
        let coins = self.coins.unwrap_or(xp / 5);
        let due = parse_due(&self.due, now)?;
        let mut draft = QuestDraft::new(title, self.difficulty.difficulty(), xp, coins, due);
        draft.description.clone_from(&self.description);
        draft.category.clone_from(&self.category);
        draft.priority = self.priority.priority();
        draft.tags.clone_from(&self.tags);
        draft.estimated_time = self.estimate;
        Ok(draft)
    }
}

#[derive(Debug, clap::Args)]
struct UpdateArgs {
    /// Quest id or a unique prefix of it
    id: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,

    #[arg(long)]
    xp: Option<u64>,

    #[arg(long)]
    coins: Option<u64>,

    #[arg(long)]
    due: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long, value_enum)]
    priority: Option<PriorityArg>,

    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,

    #[arg(long)]
    estimate: Option<u32>,
}

impl UpdateArgs {
    fn patch(&self, now: DateTime<Utc>) -> Result<QuestPatch> {
        let due_date = self
            .due
            .as_deref()
            .map(|due| parse_due(due, now))
            .transpose()?;
        Ok(QuestPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty.map(DifficultyArg::difficulty),
            xp_reward: self.xp,
            coin_reward: self.coins,
            due_date,
            tags: self.tags.clone(),
            priority: self.priority.map(PriorityArg::priority),
            estimated_time: self.estimate,
            category: self.category.clone(),
        })
    }
}

#[derive(Debug, clap::Args)]
struct SimulateArgs {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seed for the simulation's random generator
    #[arg(long, default_value_t = DEFAULT_SIMULATION_SEED)]
    seed: u64,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut output_target = OutputTarget::new(args.output.clone())?;
    let all_passed = run(&args, &mut output_target)?;
    output_target.flush_inner()?;

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Execute one command. Returns false when a simulation scenario failed.
fn run(args: &Args, out: &mut OutputTarget) -> Result<bool> {
    let levels = load_levels(args.levels.as_deref())?;
    match &args.command {
        Command::Levels => write_levels(out, &levels)?,
        Command::Simulate(sim) => return run_simulation(args, sim, &levels, out),
        Command::Add(add) => with_session(args, levels, out, |session, out| {
            let now = session.now();
            let title = if add.fun {
                session.fun_title(&add.title)
            } else {
                add.title.clone()
            };
            let quest = session.create_quest(add.draft(title, now)?);
            writeln!(
                out,
                "{} {} {}",
                "📝 Added".green(),
                short_id(&quest.id).bold(),
                quest.title
            )?;
            Ok(())
        })?,
        Command::List { filter } => {
            with_session(args, levels, out, |session, out| write_quests(out, session, *filter))?;
        }
        Command::Complete { id } => with_session(args, levels, out, |session, out| {
            let id = resolve_id(session.quests(), id)?;
            match session.complete_quest(&id) {
                Some(report) => {
                    let bonus = if report.early { " (early bonus!)" } else { "" };
                    writeln!(
                        out,
                        "{} {} +{} XP{bonus}, +{} coins",
                        "✅ Completed".green(),
                        short_id(&id).bold(),
                        report.xp_gained,
                        report.coins_gained
                    )?;
                }
                None => writeln!(out, "Quest {} is already completed", short_id(&id))?,
            }
            Ok(())
        })?,
        Command::Update(update) => with_session(args, levels, out, |session, out| {
            let id = resolve_id(session.quests(), &update.id)?;
            let patch = update.patch(session.now())?;
            if session.update_quest(&id, patch) {
                writeln!(out, "{} {}", "✏️  Updated".green(), short_id(&id).bold())?;
            }
            Ok(())
        })?,
        Command::Delete { id } => with_session(args, levels, out, |session, out| {
            let id = resolve_id(session.quests(), id)?;
            if session.delete_quest(&id) {
                writeln!(out, "{} {}", "🗑️  Deleted".green(), short_id(&id).bold())?;
            }
            Ok(())
        })?,
        Command::Status => with_session(args, levels, out, write_status)?,
    }
    Ok(true)
}

fn load_levels(path: Option<&Path>) -> Result<LevelTable> {
    let Some(path) = path else {
        return Ok(LevelTable::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    LevelTable::from_json(&text)
        .with_context(|| format!("invalid level table in {}", path.display()))
}

fn clock_seed() -> u64 {
    u64::try_from(SystemClock.now().timestamp_micros()).unwrap_or_default()
}

/// Open the guest-mode session, run `action`, then echo feedback and save the profile.
fn with_session<F>(
    args: &Args,
    levels: LevelTable,
    out: &mut OutputTarget,
    action: F,
) -> Result<()>
where
    F: FnOnce(&mut CliSession, &mut OutputTarget) -> Result<()>,
{
    let mut session = open_session(&args.data_dir, levels)?;
    action(&mut session, out)?;
    write_feedback(out, &session)?;
    if let Some(player) = session.player() {
        store::save_profile(&args.data_dir, player, session.stats())?;
    }
    Ok(())
}

fn open_session(data_dir: &Path, levels: LevelTable) -> Result<CliSession> {
    let mut session = QuestSession::new(
        levels,
        MemoryIdentity::new(),
        MemoryRemoteStore::new(),
        FileGuestStore::new(data_dir),
        SystemClock,
        clock_seed(),
    );
    session.load_quests();
    let returning = match store::load_profile(data_dir)? {
        Some(profile) => {
            session.restore_player(profile.player, profile.stats);
            true
        }
        None => false,
    };
    session.load_player();
    if !returning && session.seed_example_quests() {
        log::info!("seeded the starter quest for a new player");
    }
    Ok(session)
}

/// Accept a full id or an unambiguous prefix.
fn resolve_id(log: &QuestLog, needle: &str) -> Result<String> {
    if log.get(needle).is_some() {
        return Ok(needle.to_string());
    }
    let matches: Vec<&QuestRecord> = log
        .quests()
        .iter()
        .filter(|q| q.id.starts_with(needle))
        .collect();
    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => bail!("no quest matches id {needle}"),
        _ => bail!("id {needle} is ambiguous ({} quests match)", matches.len()),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Parse an absolute date or a `+N{d,h,m}` offset from `now`.
///
/// A bare `YYYY-MM-DD` means the end of that day in local time, the same
/// calendar the system clock uses for "today" and overdue checks.
fn parse_due(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Some(offset) = trimmed.strip_prefix('+') {
        let digits = offset.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let amount: i64 = digits
            .parse()
            .with_context(|| format!("invalid due offset {input}"))?;
        let delta = match &offset[digits.len()..] {
            "d" => Duration::try_days(amount),
            "h" => Duration::try_hours(amount),
            "m" => Duration::try_minutes(amount),
            unit => bail!("unknown due unit {unit:?} in {input}; use d, h or m"),
        };
        return delta
            .and_then(|delta| now.checked_add_signed(delta))
            .with_context(|| format!("due offset {input} is out of range"));
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .with_context(|| format!("unrecognised due date {input}"))?;
    let end_of_day = day
        .and_hms_opt(23, 59, 59)
        .with_context(|| format!("invalid due date {input}"))?;
    Local
        .from_local_datetime(&end_of_day)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .with_context(|| format!("due date {input} does not exist in the local timezone"))
}

fn write_levels(out: &mut dyn Write, levels: &LevelTable) -> Result<()> {
    writeln!(out, "{}", "🏅 Levels".bright_cyan().bold())?;
    for def in levels.iter() {
        writeln!(
            out,
            "  {:>3}  {:<36} {:>7} XP  +{} coins",
            def.level, def.title, def.xp_required, def.reward_coins
        )?;
        if !def.unlocked_features.is_empty() {
            writeln!(out, "       unlocks: {}", def.unlocked_features.join(", "))?;
        }
    }
    Ok(())
}

fn write_quests(out: &mut dyn Write, session: &CliSession, filter: ListFilter) -> Result<()> {
    let now = session.now();
    let log = session.quests();
    let quests: Vec<&QuestRecord> = match filter {
        ListFilter::All => log.quests().iter().collect(),
        ListFilter::Pending => log.pending().collect(),
        ListFilter::Completed => log.completed().collect(),
        ListFilter::Today => log.todays_quests(session.clock()).collect(),
        ListFilter::Overdue => log.overdue_quests(now).collect(),
    };
    if quests.is_empty() {
        writeln!(out, "No quests to show.")?;
        return Ok(());
    }
    for quest in quests {
        let mark = if quest.is_completed { "[x]" } else { "[ ]" };
        let due = quest.due_date.format("%Y-%m-%d %H:%M").to_string();
        let due = if !quest.is_completed && quest.due_date < now {
            due.red()
        } else {
            due.normal()
        };
        writeln!(
            out,
            "{mark} {}  {:<9} {:>4} XP {:>4} coins  due {due}  {}",
            short_id(&quest.id).bold(),
            format!("{:?}", quest.difficulty),
            quest.xp_reward,
            quest.coin_reward,
            quest.title
        )?;
    }
    Ok(())
}

fn write_status(session: &mut CliSession, out: &mut OutputTarget) -> Result<()> {
    let now = session.now();
    let Some(player) = session.player() else {
        writeln!(out, "No player profile loaded.")?;
        return Ok(());
    };
    writeln!(
        out,
        "{} {} · {}",
        player.avatar,
        player.username.bold(),
        session.current_title().bright_yellow()
    )?;
    writeln!(
        out,
        "Level {} · {} XP · {} coins",
        player.level, player.total_xp, player.coins
    )?;
    writeln!(
        out,
        "Progress: {:.1}% ({} XP to next level)",
        session.xp_progress(),
        session.xp_to_next_level()
    )?;
    let log = session.quests();
    writeln!(
        out,
        "Quests: {} total, {} completed, {} pending, {} overdue",
        log.len(),
        log.completed().count(),
        log.pending().count(),
        log.overdue_quests(now).count()
    )?;
    let today = session.clock().today();
    writeln!(
        out,
        "Completed today: {}",
        log.completed_on(session.clock(), today).count()
    )?;
    if session.is_new_player() {
        writeln!(out, "{}", "Welcome, adventurer! Complete a quest to begin.".cyan())?;
    }
    Ok(())
}

/// Echo what the command produced: notifications oldest first, then any sync error.
fn write_feedback(out: &mut dyn Write, session: &CliSession) -> Result<()> {
    for note in session.feed().entries().iter().rev() {
        let icon = note.icon.as_deref().unwrap_or("🔔");
        writeln!(out, "{icon} {}: {}", note.title.bold(), note.message)?;
    }
    if let Some(error) = session.error() {
        eprintln!("{} {}", "⚠️ ".yellow(), error.yellow());
    }
    Ok(())
}

fn run_simulation(
    args: &Args,
    sim: &SimulateArgs,
    levels: &LevelTable,
    out: &mut OutputTarget,
) -> Result<bool> {
    if sim.list_scenarios {
        writeln!(out, "Available scenarios:")?;
        for (key, description) in list_scenarios() {
            writeln!(out, "  {key:15} - {description}")?;
        }
        return Ok(true);
    }

    if sim.report == ReportFormat::Console {
        announce_banner();
    }
    let start_time = Instant::now();
    let mut results = Vec::new();
    for key in expand_scenarios(&sim.scenarios) {
        let Some(scenario) = find_scenario(&key) else {
            eprintln!("⚠️  Unknown scenario: {}", key.yellow());
            continue;
        };
        if args.verbose {
            println!("{} {}", "▶".bright_blue(), scenario.name.bold());
        }
        results.push(simulate::run_scenario(scenario, levels, sim.seed, args.verbose));
    }

    match sim.report {
        ReportFormat::Json => reports::generate_json_report(out, &results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(out, "# Questlog Simulation Results\n\n_No scenarios executed._")?;
            } else {
                reports::generate_markdown_report(out, &results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(out, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(out, &results, start_time.elapsed())?;
            }
        }
    }
    Ok(results.iter().all(|r| r.passed))
}

fn announce_banner() {
    println!("{}", "🎮 Questlog Simulator".bright_cyan().bold());
    println!("{}", "=====================".cyan());
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
