use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::WorldRecord;
use crate::errors::{ExportIoSnafu, Result};
use crate::lap::LapRow;
use crate::laptime;
use crate::stats::StatsSnapshot;

/// Everything that goes into one pace report.
#[derive(Debug, Clone, Copy)]
pub struct PaceReport<'a> {
    pub circuit_name: &'a str,
    pub group_name: &'a str,
    pub date_text: &'a str,
    pub time_text: &'a str,
    pub weather: &'a str,
    pub rows: &'a [LapRow],
    pub world_record: Option<&'a WorldRecord>,
}

/// Renders the report as a markdown table: header block, one line per lap
/// row, then the four summary rows. Summary rows leave the Gap cell empty.
pub fn build_pace_markdown(report: &PaceReport) -> String {
    let stats = StatsSnapshot::compute(report.rows);
    let fastest = stats.fastest.map(|f| f.row);

    let mut lines = vec![
        "# Current_Pace".to_string(),
        format!("- Circuit: {}", report.circuit_name),
        format!("- Competition_group: {}", report.group_name),
        format!("- Date: {}", report.date_text),
        format!("- Time: {}", report.time_text),
        format!("- Weather: {}", report.weather),
        String::new(),
        "| Lap | Lap_speed | Sector1 | Sector2 | Sector3 | Gap |".to_string(),
        "| --- | --- | --- | --- | --- | --- |".to_string(),
    ];

    for (idx, row) in report.rows.iter().enumerate() {
        let gap = stats
            .gap_for(row)
            .map(laptime::format_ms)
            .unwrap_or_default();
        lines.push(table_line(
            &format!("Lap{}", idx + 1),
            row.lap_ms,
            row.s1_ms,
            row.s2_ms,
            row.s3_ms,
            &gap,
        ));
    }

    lines.push(table_line(
        "Fastest_Lap",
        fastest.and_then(|r| r.lap_ms),
        fastest.and_then(|r| r.s1_ms),
        fastest.and_then(|r| r.s2_ms),
        fastest.and_then(|r| r.s3_ms),
        "",
    ));

    // Without a full sector set the theoretical best falls back to the
    // fastest lap's own splits.
    match stats.sum_of_best {
        Some(best) => lines.push(table_line(
            "Sum of Best",
            Some(best.lap_ms),
            Some(best.s1_ms),
            Some(best.s2_ms),
            Some(best.s3_ms),
            "",
        )),
        None => lines.push(table_line(
            "Sum of Best",
            fastest.and_then(|r| r.lap_ms),
            fastest.and_then(|r| r.s1_ms),
            fastest.and_then(|r| r.s2_ms),
            fastest.and_then(|r| r.s3_ms),
            "",
        )),
    }

    lines.push(table_line(
        "Average",
        stats.averages.lap_ms,
        None,
        None,
        None,
        "",
    ));

    let wr = report.world_record;
    lines.push(table_line(
        "World Record",
        wr.map(|w| w.lap_time_ms),
        wr.and_then(|w| w.sector1_ms),
        wr.and_then(|w| w.sector2_ms),
        wr.and_then(|w| w.sector3_ms),
        "",
    ));

    lines.join("\n")
}

/// Writes the report under `dir` and returns the full path. The filename
/// carries the circuit, group and a UTC stamp so repeated finishes never
/// collide.
pub fn save_pace_report(dir: &Path, report: &PaceReport, now: DateTime<Utc>) -> Result<PathBuf> {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let filename = format!(
        "current_pace_{}_{}_{}.md",
        safe_component(report.circuit_name),
        safe_component(report.group_name),
        stamp
    );

    fs::create_dir_all(dir).context(ExportIoSnafu)?;
    let path = dir.join(filename);
    fs::write(&path, build_pace_markdown(report)).context(ExportIoSnafu)?;

    Ok(path)
}

fn table_line(
    label: &str,
    lap_ms: Option<u64>,
    s1_ms: Option<u64>,
    s2_ms: Option<u64>,
    s3_ms: Option<u64>,
    gap: &str,
) -> String {
    let cells = [
        label.to_string(),
        laptime::format_opt(lap_ms),
        laptime::format_opt(s1_ms),
        laptime::format_opt(s2_ms),
        laptime::format_opt(s3_ms),
        gap.to_string(),
    ];

    format!("| {} |", cells.iter().join(" | "))
}

// Filename-safe circuit and group names: keep ASCII alphanumerics and
// hyphens, squash everything else into single underscores.
fn safe_component(value: &str) -> String {
    let base = if value.is_empty() { "unknown" } else { value };
    let mut out = String::with_capacity(base.len());

    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    out.trim_matches('_').to_string()
}
