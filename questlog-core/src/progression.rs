//! Pure lookups from lifetime XP to level, title and progress.
use crate::levels::{LevelDefinition, LevelTable};

/// Title shown when a level number is missing from the table.
pub const FALLBACK_TITLE: &str = "Newbie Scheduler";

/// Highest definition whose threshold is met by `total_xp`.
#[must_use]
pub fn definition_for_total_xp(table: &LevelTable, total_xp: u64) -> &LevelDefinition {
    let mut current = table.first();
    for def in table.iter() {
        if total_xp >= def.xp_required {
            current = def;
        } else {
            break;
        }
    }
    current
}

/// Level reached with `total_xp` lifetime experience.
#[must_use]
pub fn level_for_total_xp(table: &LevelTable, total_xp: u64) -> u32 {
    definition_for_total_xp(table, total_xp).level
}

/// Fraction of the way from the current level threshold to the next one.
///
/// Saturates at 1.0 on the terminal level.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_fraction(table: &LevelTable, total_xp: u64) -> f64 {
    let current = definition_for_total_xp(table, total_xp);
    let Some(next) = table.next_after(current.level) else {
        return 1.0;
    };
    let span = next.xp_required - current.xp_required;
    let earned = total_xp - current.xp_required;
    (earned as f64 / span as f64).clamp(0.0, 1.0)
}

/// Progress toward the next level as a percentage for display.
#[must_use]
pub fn progress_percent(table: &LevelTable, total_xp: u64) -> f64 {
    progress_fraction(table, total_xp) * 100.0
}

/// XP still needed for the next level, or 0 on the terminal level.
#[must_use]
pub fn xp_remaining_to_next_level(table: &LevelTable, total_xp: u64) -> u64 {
    let current = definition_for_total_xp(table, total_xp);
    table
        .next_after(current.level)
        .map_or(0, |next| next.xp_required.saturating_sub(total_xp))
}

#[must_use]
pub fn title_for_level(table: &LevelTable, level: u32) -> &str {
    table
        .get(level)
        .map_or(FALLBACK_TITLE, |def| def.title.as_str())
}
