use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::engine::round2;
use crate::github::RepoId;

/// One output row per successfully analyzed repository. Field order is the
/// export column order and is relied on by downstream spreadsheets.
#[derive(Debug, Serialize)]
pub struct MetricRow {
    pub repo: String,
    pub has_documentation: bool,
    pub incentive_mentions: u64,
    pub maintainer_latency_before_h: f64,
    pub maintainer_latency_after_h: f64,
    pub avg_comments_before: f64,
    pub comments_after: f64,
    pub contributors_before: u64,
    pub contributors_after: u64,
    pub closure_rate_30d: f64,
    pub ci_adopted_post_revival: bool,
    pub new_maintainers_post_revival: String,
    pub external_event_mentions: u64,
}

impl MetricRow {
    /// Assembles the export record from the metric outputs. The comment
    /// columns are rounded here; every other value arrives final.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        repo: &RepoId,
        has_documentation: bool,
        incentive_mentions: u64,
        maintainer_latency: (f64, f64),
        comment_activity: (f64, f64),
        contributor_diversity: (u64, u64),
        closure_rate_30d: f64,
        ci_adopted_post_revival: bool,
        new_maintainers_post_revival: &str,
        external_event_mentions: u64,
    ) -> Self {
        Self {
            repo: repo.to_string(),
            has_documentation,
            incentive_mentions,
            maintainer_latency_before_h: maintainer_latency.0,
            maintainer_latency_after_h: maintainer_latency.1,
            avg_comments_before: round2(comment_activity.0),
            comments_after: round2(comment_activity.1),
            contributors_before: contributor_diversity.0,
            contributors_after: contributor_diversity.1,
            closure_rate_30d,
            ci_adopted_post_revival,
            new_maintainers_post_revival: new_maintainers_post_revival.to_string(),
            external_event_mentions,
        }
    }
}

pub fn write_report(path: &Path, rows: &[MetricRow]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_report_to(file, rows)
}

fn write_report_to<W: Write>(writer: W, rows: &[MetricRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
