use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::models::IssueState;
use octocrab::params::State;
use octocrab::Octocrab;

use super::types::{CommentRecord, CommitRecord, IssueRecord, Lookup, RepoDataSource, RepoId};

/// Adapter over the GitHub REST API exposing only the operations the
/// metrics engine consumes. All calls are awaited sequentially by the
/// caller; pagination is followed to exhaustion for the bulk queries.
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    pub async fn new(token: String) -> Result<Self> {
        let client = Octocrab::builder().personal_token(token).build()?;
        Ok(Self { client })
    }

    /// The owning identity of the repository, used as the maintainer set
    /// for the interaction-latency metric. Falls back to the parsed owner
    /// segment if the API payload omits it.
    pub async fn repo_owner(&self, repo: &RepoId) -> Result<String> {
        let repository = self.client.repos(&repo.owner, &repo.name).get().await?;
        Ok(repository
            .owner
            .map(|o| o.login)
            .unwrap_or_else(|| repo.owner.clone()))
    }

    /// All issues (any state) created or updated since `since`. The issues
    /// endpoint also returns pull requests; they are kept as issue records.
    pub async fn issues_since(
        &self,
        repo: &RepoId,
        since: DateTime<Utc>,
    ) -> Result<Vec<IssueRecord>> {
        let page = self
            .client
            .issues(&repo.owner, &repo.name)
            .list()
            .state(State::All)
            .since(since)
            .per_page(100)
            .send()
            .await?;

        let issues = self.client.all_pages(page).await?;

        Ok(issues
            .into_iter()
            .map(|issue| IssueRecord {
                number: issue.number,
                title: issue.title,
                body: issue.body,
                created_at: issue.created_at,
                closed_at: issue.closed_at,
                closed: matches!(issue.state, IssueState::Closed),
                comment_count: issue.comments,
                author_login: issue.user.login,
            })
            .collect())
    }

    /// All commits on the default branch since `since`.
    pub async fn commits_since(
        &self,
        repo: &RepoId,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>> {
        let page = self
            .client
            .repos(&repo.owner, &repo.name)
            .list_commits()
            .since(since)
            .per_page(100)
            .send()
            .await?;

        let commits = self.client.all_pages(page).await?;
        Ok(commits.into_iter().map(to_commit_record).collect())
    }
}

#[async_trait]
impl RepoDataSource for GitHubClient {
    async fn root_entries(&self, repo: &RepoId) -> Result<Lookup<Vec<String>>> {
        let result = self
            .client
            .repos(&repo.owner, &repo.name)
            .get_content()
            .send()
            .await;

        match result {
            Ok(contents) => Ok(Lookup::Found(
                contents.items.into_iter().map(|item| item.name).collect(),
            )),
            Err(octocrab::Error::GitHub { source, .. }) if source.message.contains("Not Found") => {
                Ok(Lookup::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn commits_touching(
        &self,
        repo: &RepoId,
        path: &str,
        since: DateTime<Utc>,
    ) -> Result<Lookup<Vec<CommitRecord>>> {
        // One page is enough: callers only ask whether any commit exists.
        let result = self
            .client
            .repos(&repo.owner, &repo.name)
            .list_commits()
            .path(path)
            .since(since)
            .per_page(100)
            .send()
            .await;

        match result {
            Ok(page) => Ok(Lookup::Found(
                page.items.into_iter().map(to_commit_record).collect(),
            )),
            Err(octocrab::Error::GitHub { source, .. }) if source.message.contains("Not Found") => {
                Ok(Lookup::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn issue_comments(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<CommentRecord>> {
        let page = self
            .client
            .issues(&repo.owner, &repo.name)
            .list_comments(issue_number)
            .per_page(100)
            .send()
            .await?;

        let comments = self.client.all_pages(page).await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentRecord {
                author_login: comment.user.login,
                created_at: comment.created_at,
            })
            .collect())
    }
}

fn to_commit_record(commit: octocrab::models::repos::RepoCommit) -> CommitRecord {
    CommitRecord {
        sha: commit.sha,
        date: commit
            .commit
            .author
            .as_ref()
            .and_then(|a| a.date)
            .unwrap_or_else(Utc::now),
        author_login: commit.author.as_ref().map(|a| a.login.clone()),
    }
}
