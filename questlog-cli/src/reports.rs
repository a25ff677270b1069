use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use crate::simulate::ScenarioResult;

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(passed, total))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
        writeln!(
            out,
            "   Completed: {} quests, level {}, {} XP, {} coins",
            result.quests_completed, result.final_level, result.total_xp, result.coins
        )?;
        writeln!(out, "   Level-ups: {}", result.level_ups)?;
        if !result.achievements.is_empty() {
            writeln!(out, "   Achievements: {}", result.achievements.join(", "))?;
        }
        for failure in &result.failures {
            writeln!(out, "     • {}", failure.red())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Questlog Simulation Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(passed, total))?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(out, "| Scenario | Result | Level | XP | Coins | Level-ups |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "| {} | {status} | {} | {} | {} | {} |",
            result.scenario_name,
            result.final_level,
            result.total_xp,
            result.coins,
            result.level_ups
        )?;
    }

    let failing: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();
    if !failing.is_empty() {
        writeln!(out, "\n## Failures\n")?;
        for result in failing {
            for failure in &result.failures {
                writeln!(out, "- **{}**: {failure}", result.scenario_name)?;
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            passed,
            seed: 7,
            quests_completed: 3,
            final_level: 2,
            total_xp: 190,
            coins: 85,
            level_ups: 1,
            achievements: vec!["First Blood! 🗡️".to_string()],
            failures: if passed {
                Vec::new()
            } else {
                vec!["level 1 does not match 2".to_string()]
            },
            duration: Duration::from_millis(3),
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_report_lists_each_scenario() {
        colored::control::set_override(false);
        let text = render(|out| {
            generate_console_report(out, &[result(true), result(false)], Duration::ZERO)
        });
        assert!(text.contains("Total scenarios: 2"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("Achievements: First Blood"));
        assert!(text.contains("level 1 does not match 2"));
    }

    #[test]
    fn json_report_is_an_array_of_results() {
        let text = render(|out| generate_json_report(out, &[result(true)]));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["scenario_name"], "Smoke");
        assert_eq!(parsed[0]["total_xp"], 190);
    }

    #[test]
    fn markdown_report_has_table_and_failures() {
        let text = render(|out| generate_markdown_report(out, &[result(false)]));
        assert!(text.starts_with("# Questlog Simulation Results"));
        assert!(text.contains("| Smoke | ❌ | 2 | 190 | 85 | 1 |"));
        assert!(text.contains("## Failures"));
    }

    #[test]
    fn empty_results_do_not_divide_by_zero() {
        assert!(success_rate(0, 0).abs() < f64::EPSILON);
    }
}
