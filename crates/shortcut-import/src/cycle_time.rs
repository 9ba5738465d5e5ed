//! Cycle-time report over a story search.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shortcut_api::ShortcutApi;
use shortcut_core::entity::StorySummary;
use tracing::info;

use crate::error::{ImportError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One finished story with its cycle time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleTimeRow {
    pub id: i64,
    pub name: String,
    pub story_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub cycle_time_days: f64,
    pub app_url: String,
}

impl CycleTimeRow {
    /// `None` unless the story was both started and completed.
    pub fn from_story(story: &StorySummary) -> Option<Self> {
        let (started_at, completed_at) = (story.started_at?, story.completed_at?);
        let seconds = (completed_at - started_at).num_seconds() as f64;
        Some(Self {
            id: story.id,
            name: story.name.clone(),
            story_type: story.story_type.clone(),
            started_at,
            completed_at,
            cycle_time_days: round2(seconds / SECONDS_PER_DAY),
            app_url: story.app_url.clone(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Finished stories in search order.
pub fn collect_cycle_times(stories: &[StorySummary]) -> Vec<CycleTimeRow> {
    stories.iter().filter_map(CycleTimeRow::from_story).collect()
}

/// Aggregate statistics, in days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleTimeSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p85: f64,
}

impl CycleTimeSummary {
    pub fn from_rows(rows: &[CycleTimeRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let mut days: Vec<f64> = rows.iter().map(|r| r.cycle_time_days).collect();
        days.sort_by(f64::total_cmp);
        Self {
            count: days.len(),
            mean: round2(days.iter().sum::<f64>() / days.len() as f64),
            median: round2(percentile(&days, 0.5)),
            p85: round2(percentile(&days, 0.85)),
        }
    }

    /// Message text for the chat notification.
    pub fn message(&self, query: &str) -> String {
        format!(
            "Cycle time for `{}`: {} stories, mean {:.2} days, median {:.2} days, 85th percentile {:.2} days",
            query, self.count, self.mean, self.median, self.p85
        )
    }
}

/// Linear interpolation between closest ranks; `sorted` must be ascending
/// and non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Writes the rows as CSV with a header, even when there are no rows.
pub fn write_csv<W: Write>(rows: &[CycleTimeRow], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    let to_err = |e: csv::Error| ImportError::csv(Path::new("<cycle-time output>"), e);
    writer
        .write_record([
            "id",
            "name",
            "story_type",
            "started_at",
            "completed_at",
            "cycle_time_days",
            "app_url",
        ])
        .map_err(to_err)?;
    for row in rows {
        writer.serialize(row).map_err(to_err)?;
    }
    writer
        .flush()
        .map_err(|e| ImportError::io(Path::new("<cycle-time output>"), e))?;
    Ok(())
}

/// Result of `sc cycle-time`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleTimeReport {
    pub query: String,
    /// Stories matching the query, finished or not.
    pub searched: usize,
    pub summary: CycleTimeSummary,
    pub rows: Vec<CycleTimeRow>,
}

/// Searches `query` and computes cycle times for the finished stories.
pub fn run_cycle_time(api: &dyn ShortcutApi, query: &str) -> Result<CycleTimeReport> {
    info!("Searching stories: {}", query);
    let stories = api.search_stories(query)?;
    let rows = collect_cycle_times(&stories);
    let summary = CycleTimeSummary::from_rows(&rows);
    info!(
        "{} of {} stories finished; mean {:.2}d, median {:.2}d, p85 {:.2}d",
        summary.count,
        stories.len(),
        summary.mean,
        summary.median,
        summary.p85
    );
    Ok(CycleTimeReport {
        query: query.to_string(),
        searched: stories.len(),
        summary,
        rows,
    })
}
