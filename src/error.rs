use thiserror::Error;

/// Row-scoped validation failures. None of these abort the batch; the
/// offending row is logged and skipped.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no owner/name segment found in URL: {0}")]
    InvalidRepoUrl(String),

    #[error("unrecognized timestamp format: {0}")]
    BadTimestamp(String),
}
