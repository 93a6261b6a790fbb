//! Operator reports and their plain-text rendering.

use serde::Serialize;

use highlander_core::HealthAudit;
use highlander_types::ImmortalSnapshot;

/// Result of pause-and-check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Whether every worker parked before the snapshot was taken.
    pub settled: bool,
    /// Invariant computation over the snapshot.
    pub audit: HealthAudit,
    /// Per-immortal entries, omitted for large populations.
    pub immortals: Option<Vec<ImmortalSnapshot>>,
}

/// Result of remove-dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveDeadReport {
    /// Whether every worker parked before removal.
    pub settled: bool,
    /// Population size before removal.
    pub population_before: usize,
    /// Immortals removed.
    pub removed: usize,
    /// Population size after removal.
    pub population_after: usize,
    /// Immortals alive after removal; `None` when their health could not
    /// be read within the report timeout.
    pub still_alive: Option<usize>,
}

const RULE: &str = "--------------------------------";
const DOUBLE_RULE: &str = "================================";

/// Join rendered lines into a newline-terminated frame.
fn frame(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render a check report as the operator text frame.
pub fn render_check(report: &CheckReport) -> String {
    let audit = &report.audit;
    let mut lines = Vec::new();

    match &report.immortals {
        Some(entries) => {
            lines.extend(
                entries
                    .iter()
                    .map(|entry| format!("{:<14} : {:>5}", entry.name, entry.health)),
            );
        }
        None => lines.push(format!(
            "(Showing summary for {} immortals)",
            audit.population_size
        )),
    }

    let status = if audit.is_ok() { "OK" } else { "VIOLATED" };
    lines.extend([
        DOUBLE_RULE.to_owned(),
        format!("Population size  : {}", audit.population_size),
        format!(
            "Immortals alive  : {} / {}",
            audit.alive, audit.population_size
        ),
        format!("Negative health  : {}", audit.negative_health),
        RULE.to_owned(),
        format!("Total Fights     : {}", audit.total_fights),
        format!("Current Health   : {}", audit.current_total),
        RULE.to_owned(),
        format!("Initial Total    : {}", audit.initial_total),
        format!("Expected Health  : {}", audit.expected_total),
        format!("Difference       : {}", audit.difference),
        RULE.to_owned(),
        format!("Invariant Status : {status}"),
    ]);

    if !audit.is_ok() {
        lines.push(format!(
            "WARNING: Difference ({}) exceeds tolerance ({})",
            audit.difference.saturating_abs(),
            audit.tolerance
        ));
        lines.push("Check for race conditions in the fight protocol.".to_owned());
    }
    if audit.negative_health > 0 {
        lines.push(format!(
            "WARNING: {} immortals with negative health!",
            audit.negative_health
        ));
    }
    lines.extend(
        audit
            .overshoots
            .iter()
            .map(|o| format!("WARNING: {} overshot to {}", o.name, o.health)),
    );
    if !report.settled {
        lines.push(
            "WARNING: workers did not settle; figures may be a torn read or a lock cycle"
                .to_owned(),
        );
    }
    frame(&lines)
}

/// Render a remove-dead report.
pub fn render_remove_dead(report: &RemoveDeadReport) -> String {
    let still_alive = report
        .still_alive
        .map_or_else(|| "unavailable (health locks busy)".to_owned(), |n| n.to_string());
    let mut lines = vec![
        "=== Dead Immortals Removed ===".to_owned(),
        format!("Population before: {}", report.population_before),
        format!("Removed (dead):    {}", report.removed),
        format!("Population after:  {}", report.population_after),
        format!("Still alive:       {still_alive}"),
        "==============================".to_owned(),
        "Note: Simulation is paused. Resume to continue.".to_owned(),
    ];
    if !report.settled {
        lines.push("WARNING: workers did not settle before removal".to_owned());
    }
    frame(&lines)
}
