use anyhow::Result;
use tracing::{error, info, warn};

use super::engine;
use super::report::MetricRow;
use super::window::AnalysisWindow;
use crate::dataset::RepositoryInput;
use crate::github::{GitHubClient, RepoId};

/// Drives one sequential pass over the input rows. Each repository moves
/// through parse → window → fetch → metrics → record; a failure in the
/// parse or fetch phase skips that repository only, so the batch always
/// runs to the end. No retries at any phase.
pub struct BatchRunner {
    client: GitHubClient,
}

impl BatchRunner {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Output rows come back in input order and contain exactly the
    /// repositories that completed; skipped ones are only logged.
    pub async fn run(&self, inputs: &[RepositoryInput]) -> Vec<MetricRow> {
        let total = inputs.len();
        let mut rows = Vec::new();

        for (idx, input) in inputs.iter().enumerate() {
            let repo = match RepoId::from_url(&input.url) {
                Ok(repo) => repo,
                Err(e) => {
                    warn!("row {} skipped: {e}", idx + 1);
                    continue;
                }
            };

            info!("analyzing {repo} ({}/{total})", idx + 1);
            let window = AnalysisWindow::new(input.death_date, input.revival_date);

            match self.analyze(&repo, &window).await {
                Ok(row) => rows.push(row),
                Err(e) => error!("critical failure on {repo}, repository skipped: {e:#}"),
            }
        }

        rows
    }

    async fn analyze(&self, repo: &RepoId, window: &AnalysisWindow) -> Result<MetricRow> {
        let owner = self.client.repo_owner(repo).await?;

        info!("fetching events since {}", window.start.date_naive());
        let issues = self.client.issues_since(repo, window.start).await?;
        let commits = self.client.commits_since(repo, window.start).await?;
        info!(
            "found {} issues and {} commits in the window",
            issues.len(),
            commits.len()
        );

        let has_documentation = engine::has_documentation(&self.client, repo).await;
        let ci_adopted = engine::ci_adopted(&self.client, repo, window.boundary).await;
        let incentive_mentions = engine::incentive_mentions(&issues);
        let comment_activity = engine::comment_activity(&issues, window.boundary);
        let contributor_diversity = engine::contributor_diversity(&commits, window.boundary);
        let closure_rate = engine::closure_rate(&issues);
        let external_event_mentions = engine::external_event_mentions(&issues);
        let maintainer_latency =
            engine::maintainer_latency(&self.client, repo, &owner, &issues, window.boundary).await;

        Ok(MetricRow::assemble(
            repo,
            has_documentation,
            incentive_mentions,
            maintainer_latency,
            comment_activity,
            contributor_diversity,
            closure_rate,
            ci_adopted,
            engine::new_maintainers(),
            external_event_mentions,
        ))
    }
}
