use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// A repository identifier parsed out of a dataset URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Extracts the `owner/name` segment following the hosting domain.
    /// Accepts alphanumerics, `-`, `_` and `.` in either segment.
    pub fn from_url(url: &str) -> Result<Self, AnalysisError> {
        let re = Regex::new(r"github\.com/([\w\-.]+)/([\w\-.]+)").unwrap();
        match re.captures(url) {
            Some(caps) => Ok(Self {
                owner: caps[1].to_string(),
                name: caps[2].to_string(),
            }),
            None => Err(AnalysisError::InvalidRepoUrl(url.to_string())),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// An issue as fetched once per repository over the analysis window.
/// The list endpoint counts pull requests as issues; they are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed: bool,
    pub comment_count: u32,
    pub author_login: String,
}

/// A commit in the analysis window. `author_login` is `None` when the
/// commit author cannot be resolved to a platform account; such commits
/// are excluded from diversity counting on both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub date: DateTime<Utc>,
    pub author_login: Option<String>,
}

/// An issue comment, fetched lazily per issue by the latency metric only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub author_login: String,
    pub created_at: DateTime<Utc>,
}

/// Distinguishes a legitimate "not found" outcome from a transport error,
/// which stays in the `Err` channel of the surrounding `Result`.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The sub-fetch operations metric functions perform themselves, behind a
/// seam so tests can run against in-memory fakes. Bulk window fetches are
/// issued by the batch runner directly against the concrete client.
#[async_trait]
pub trait RepoDataSource {
    /// Names of the entries in the repository's root directory.
    async fn root_entries(&self, repo: &RepoId) -> anyhow::Result<Lookup<Vec<String>>>;

    /// Commits touching `path` at or after `since`.
    async fn commits_touching(
        &self,
        repo: &RepoId,
        path: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Lookup<Vec<CommitRecord>>>;

    /// All comments on one issue, in chronological order.
    async fn issue_comments(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> anyhow::Result<Vec<CommentRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_owner_and_name_from_https_url() {
        let id = RepoId::from_url("https://github.com/rails/rails").unwrap();
        assert_eq!(id.owner, "rails");
        assert_eq!(id.name, "rails");
    }

    #[test]
    fn parses_urls_with_trailing_path_segments() {
        let id = RepoId::from_url("https://github.com/foo-bar/baz.js/issues/42").unwrap();
        assert_eq!(id.to_string(), "foo-bar/baz.js");
    }

    #[test]
    fn accepts_underscores_and_dots() {
        let id = RepoId::from_url("http://github.com/my_org/some.repo_name").unwrap();
        assert_eq!(id.owner, "my_org");
        assert_eq!(id.name, "some.repo_name");
    }

    #[test]
    fn rejects_urls_without_repository_path() {
        let err = RepoId::from_url("https://example.com/nothing/here");
        assert!(matches!(err, Err(AnalysisError::InvalidRepoUrl(_))));

        let err = RepoId::from_url("https://github.com/");
        assert!(matches!(err, Err(AnalysisError::InvalidRepoUrl(_))));
    }
}
