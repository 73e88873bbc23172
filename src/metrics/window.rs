use chrono::{DateTime, Duration, Utc};

/// The time span events are fetched and partitioned over. Fetches cover
/// `[start, now)`; the boundary splits events into before/after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    /// One year before the death date.
    pub start: DateTime<Utc>,
    /// The revival date. Partitioning is strict: an event stamped exactly
    /// at the boundary counts as "after".
    pub boundary: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn new(death_date: DateTime<Utc>, revival_date: DateTime<Utc>) -> Self {
        Self {
            start: death_date - Duration::days(365),
            boundary: revival_date,
        }
    }
}
