//! The nine engagement metrics. Each function is pure over the pre-fetched
//! window collections, except the three that perform their own sub-fetches
//! through [`RepoDataSource`]: documentation presence, CI adoption and
//! maintainer latency. Sub-fetch failures degrade the individual metric and
//! never abort the repository.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::github::{CommitRecord, IssueRecord, Lookup, RepoDataSource, RepoId};

/// Issue-text markers for contribution-drive campaigns.
const INCENTIVE_PATTERN: &str = r"(?i)good first issue|hacktoberfest";

/// Sponsorship / funding / conference terms, including the Portuguese
/// variants that appear in the study corpus.
const EVENT_PATTERN: &str =
    r"(?i)sponsor|sponsorship|funding|conference|patrocínio|financiamento|conferência";

const DOC_FILES: [&str; 3] = ["contributing.md", "code_of_conduct.md", "readme.md"];

const CI_PATHS: [&str; 2] = [".github/workflows", ".travis.yml"];

/// The data source cannot distinguish newly granted maintainers, so this
/// column always carries a fixed sentinel instead of a computed value.
pub const NEW_MAINTAINERS_SENTINEL: &str = "not applicable (API limitation)";

/// Whether the root listing contains any governance file, matched
/// case-insensitively. Any failure, including a missing repository,
/// yields `false`.
pub async fn has_documentation(source: &dyn RepoDataSource, repo: &RepoId) -> bool {
    match source.root_entries(repo).await {
        Ok(Lookup::Found(entries)) => entries.iter().any(|entry| {
            let lower = entry.to_lowercase();
            DOC_FILES.iter().any(|doc| lower == *doc)
        }),
        Ok(Lookup::NotFound) => false,
        Err(e) => {
            debug!("root listing failed for {repo}: {e}");
            false
        }
    }
}

/// Whether any commit touched a CI configuration path at or after the
/// revival boundary. An absent path reads the same as no matching commits;
/// transport errors are logged and degrade to `false`.
pub async fn ci_adopted(
    source: &dyn RepoDataSource,
    repo: &RepoId,
    boundary: DateTime<Utc>,
) -> bool {
    for path in CI_PATHS {
        match source.commits_touching(repo, path, boundary).await {
            Ok(Lookup::Found(commits)) if !commits.is_empty() => return true,
            Ok(_) => {}
            Err(e) => {
                warn!("CI adoption check failed for {repo}: {e}");
                return false;
            }
        }
    }
    false
}

/// Count of issues whose title+body mentions a contribution-drive term.
pub fn incentive_mentions(issues: &[IssueRecord]) -> u64 {
    count_keyword_mentions(issues, INCENTIVE_PATTERN)
}

/// Count of issues whose title+body mentions sponsorship, funding or
/// conference terminology.
pub fn external_event_mentions(issues: &[IssueRecord]) -> u64 {
    count_keyword_mentions(issues, EVENT_PATTERN)
}

fn count_keyword_mentions(issues: &[IssueRecord], pattern: &str) -> u64 {
    let re = Regex::new(pattern).unwrap();
    issues
        .iter()
        .filter(|issue| {
            let text = format!("{} {}", issue.title, issue.body.as_deref().unwrap_or(""));
            re.is_match(&text)
        })
        .count() as u64
}

/// Comment volume on each side of the boundary, partitioned by issue
/// creation time. Before the boundary this is a mean per issue; after it,
/// a plain sum. The asymmetry is intentional and downstream analysis
/// depends on these exact semantics.
pub fn comment_activity(issues: &[IssueRecord], boundary: DateTime<Utc>) -> (f64, f64) {
    let (before, after): (Vec<_>, Vec<_>) =
        issues.iter().partition(|issue| issue.created_at < boundary);

    let mean_before = if before.is_empty() {
        0.0
    } else {
        before.iter().map(|i| f64::from(i.comment_count)).sum::<f64>() / before.len() as f64
    };
    let total_after = after.iter().map(|i| f64::from(i.comment_count)).sum();

    (mean_before, total_after)
}

/// Distinct commit authors on each side of the boundary. Commits whose
/// author cannot be resolved to an account count on neither side.
pub fn contributor_diversity(commits: &[CommitRecord], boundary: DateTime<Utc>) -> (u64, u64) {
    let mut before = HashSet::new();
    let mut after = HashSet::new();

    for commit in commits {
        if let Some(login) = &commit.author_login {
            if commit.date < boundary {
                before.insert(login.as_str());
            } else {
                after.insert(login.as_str());
            }
        }
    }

    (before.len() as u64, after.len() as u64)
}

/// Fraction of closed issues resolved within 30 days of creation, rounded
/// to 3 decimals. Zero when nothing is closed in the window.
pub fn closure_rate(issues: &[IssueRecord]) -> f64 {
    let mut closed = 0u64;
    let mut closed_fast = 0u64;

    for issue in issues {
        if !issue.closed {
            continue;
        }
        closed += 1;
        if let Some(closed_at) = issue.closed_at {
            // Whole elapsed days, so 30 days and change still qualifies.
            if (closed_at - issue.created_at).num_days() <= 30 {
                closed_fast += 1;
            }
        }
    }

    if closed == 0 {
        0.0
    } else {
        round3(closed_fast as f64 / closed as f64)
    }
}

/// Mean hours from issue creation to the first comment by a maintainer,
/// averaged per side of the boundary (by issue creation time) and rounded
/// to 2 decimals. The maintainer set is the repository owner only.
/// Maintainer-authored issues never contribute a sample; an issue whose
/// comments cannot be fetched is excluded and logged.
pub async fn maintainer_latency(
    source: &dyn RepoDataSource,
    repo: &RepoId,
    owner: &str,
    issues: &[IssueRecord],
    boundary: DateTime<Utc>,
) -> (f64, f64) {
    let mut before = Vec::new();
    let mut after = Vec::new();

    for issue in issues {
        if issue.author_login == owner {
            continue;
        }

        let comments = match source.issue_comments(repo, issue.number).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(
                    "could not fetch comments of {repo}#{}, issue excluded: {e}",
                    issue.number
                );
                continue;
            }
        };

        // Only the first maintainer comment counts.
        if let Some(first) = comments.iter().find(|c| c.author_login == owner) {
            let hours = (first.created_at - issue.created_at).num_seconds() as f64 / 3600.0;
            if issue.created_at < boundary {
                before.push(hours);
            } else {
                after.push(hours);
            }
        }
    }

    (round2(mean(&before)), round2(mean(&after)))
}

pub fn new_maintainers() -> &'static str {
    NEW_MAINTAINERS_SENTINEL
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::CommentRecord;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::collections::{HashMap, HashSet};

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn boundary() -> DateTime<Utc> {
        ts(2021, 6, 1)
    }

    fn issue(number: u64, created_at: DateTime<Utc>, comment_count: u32) -> IssueRecord {
        IssueRecord {
            number,
            title: format!("issue {number}"),
            body: None,
            created_at,
            closed_at: None,
            closed: false,
            comment_count,
            author_login: "someone".to_string(),
        }
    }

    fn commit(sha: &str, date: DateTime<Utc>, author: Option<&str>) -> CommitRecord {
        CommitRecord {
            sha: sha.to_string(),
            date,
            author_login: author.map(str::to_string),
        }
    }

    /// In-memory stand-in for the GitHub adapter.
    #[derive(Default)]
    struct FakeSource {
        root: Option<Vec<String>>,
        root_fails: bool,
        ci_commits: HashMap<&'static str, Vec<CommitRecord>>,
        ci_fails: bool,
        comments: HashMap<u64, Vec<CommentRecord>>,
        failing_issues: HashSet<u64>,
    }

    #[async_trait]
    impl RepoDataSource for FakeSource {
        async fn root_entries(&self, _repo: &RepoId) -> anyhow::Result<Lookup<Vec<String>>> {
            if self.root_fails {
                anyhow::bail!("rate limited");
            }
            Ok(match &self.root {
                Some(entries) => Lookup::Found(entries.clone()),
                None => Lookup::NotFound,
            })
        }

        async fn commits_touching(
            &self,
            _repo: &RepoId,
            path: &str,
            _since: DateTime<Utc>,
        ) -> anyhow::Result<Lookup<Vec<CommitRecord>>> {
            if self.ci_fails {
                anyhow::bail!("rate limited");
            }
            Ok(match self.ci_commits.get(path) {
                Some(commits) => Lookup::Found(commits.clone()),
                None => Lookup::NotFound,
            })
        }

        async fn issue_comments(
            &self,
            _repo: &RepoId,
            issue_number: u64,
        ) -> anyhow::Result<Vec<CommentRecord>> {
            if self.failing_issues.contains(&issue_number) {
                anyhow::bail!("comment listing failed");
            }
            Ok(self.comments.get(&issue_number).cloned().unwrap_or_default())
        }
    }

    fn repo() -> RepoId {
        RepoId {
            owner: "octo".to_string(),
            name: "lazarus".to_string(),
        }
    }

    #[test]
    fn comment_activity_means_before_and_sums_after() {
        let issues = vec![
            issue(1, ts(2021, 1, 10), 2),
            issue(2, ts(2021, 2, 10), 4),
            issue(3, ts(2021, 7, 1), 5),
        ];
        let (before, after) = comment_activity(&issues, boundary());
        assert_eq!(before, 3.0);
        assert_eq!(after, 5.0);
    }

    #[test]
    fn comment_activity_is_zero_on_empty_partitions() {
        assert_eq!(comment_activity(&[], boundary()), (0.0, 0.0));
    }

    #[test]
    fn boundary_partition_is_strict() {
        // An issue created exactly at the boundary lands in "after".
        let issues = vec![issue(1, boundary(), 7)];
        let (before, after) = comment_activity(&issues, boundary());
        assert_eq!(before, 0.0);
        assert_eq!(after, 7.0);

        let commits = vec![commit("a", boundary(), Some("alice"))];
        assert_eq!(contributor_diversity(&commits, boundary()), (0, 1));
    }

    #[test]
    fn diversity_skips_unresolvable_authors() {
        let commits = vec![
            commit("a", ts(2021, 1, 1), Some("alice")),
            commit("b", ts(2021, 8, 1), Some("bob")),
            commit("c", ts(2021, 2, 1), None),
        ];
        assert_eq!(contributor_diversity(&commits, boundary()), (1, 1));
    }

    #[test]
    fn diversity_counts_distinct_logins_once() {
        let commits = vec![
            commit("a", ts(2021, 1, 1), Some("alice")),
            commit("b", ts(2021, 1, 2), Some("alice")),
            commit("c", ts(2021, 1, 3), Some("carol")),
        ];
        assert_eq!(contributor_diversity(&commits, boundary()), (2, 0));
    }

    #[test]
    fn closure_rate_is_zero_without_closed_issues() {
        let issues = vec![issue(1, ts(2021, 1, 1), 0)];
        assert_eq!(closure_rate(&issues), 0.0);
        assert_eq!(closure_rate(&[]), 0.0);
    }

    #[test]
    fn closure_rate_rounds_to_three_decimals() {
        let mut issues = Vec::new();
        for n in 0..3u64 {
            let mut i = issue(n, ts(2021, 1, 1), 0);
            i.closed = true;
            // One fast closure, two slow ones.
            i.closed_at = Some(if n == 0 {
                ts(2021, 1, 5)
            } else {
                ts(2021, 5, 1)
            });
            issues.push(i);
        }
        let rate = closure_rate(&issues);
        assert_eq!(rate, 0.333);
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn closure_rate_counts_whole_days_only() {
        // 30 days and 5 hours still truncates to 30 whole days.
        let mut i = issue(1, ts(2021, 1, 1), 0);
        i.closed = true;
        i.closed_at = Some(ts(2021, 1, 31) + Duration::hours(5));
        assert_eq!(closure_rate(&[i]), 1.0);
    }

    #[test]
    fn keyword_metrics_match_case_insensitively() {
        let mut a = issue(1, ts(2021, 1, 1), 0);
        a.title = "Tagged as GOOD FIRST ISSUE".to_string();
        let mut b = issue(2, ts(2021, 1, 2), 0);
        b.body = Some("join us for Hacktoberfest!".to_string());
        let c = issue(3, ts(2021, 1, 3), 0);

        assert_eq!(incentive_mentions(&[a, b, c]), 2);
    }

    #[test]
    fn event_metric_matches_localized_terms() {
        let mut a = issue(1, ts(2021, 1, 1), 0);
        a.body = Some("buscamos patrocínio para a conferência".to_string());
        let mut b = issue(2, ts(2021, 1, 2), 0);
        b.title = "Sponsorship proposal".to_string();
        let c = issue(3, ts(2021, 1, 3), 0);

        assert_eq!(external_event_mentions(&[a, b, c]), 2);
    }

    #[tokio::test]
    async fn documentation_found_in_root_listing() {
        let source = FakeSource {
            root: Some(vec!["src".to_string(), "README.md".to_string()]),
            ..Default::default()
        };
        assert!(has_documentation(&source, &repo()).await);
    }

    #[tokio::test]
    async fn documentation_absent_or_unreachable_is_false() {
        let source = FakeSource {
            root: Some(vec!["src".to_string(), "Cargo.toml".to_string()]),
            ..Default::default()
        };
        assert!(!has_documentation(&source, &repo()).await);

        let not_found = FakeSource::default();
        assert!(!has_documentation(&not_found, &repo()).await);

        let failing = FakeSource {
            root_fails: true,
            ..Default::default()
        };
        assert!(!has_documentation(&failing, &repo()).await);
    }

    #[tokio::test]
    async fn ci_adoption_requires_a_post_boundary_commit() {
        let mut with_commit = FakeSource::default();
        with_commit.ci_commits.insert(
            ".github/workflows",
            vec![commit("a", ts(2021, 7, 1), Some("alice"))],
        );
        assert!(ci_adopted(&with_commit, &repo(), boundary()).await);

        // Both paths absent reads as not adopted.
        let absent = FakeSource::default();
        assert!(!ci_adopted(&absent, &repo(), boundary()).await);

        // Paths exist but nothing touched them after the boundary.
        let mut untouched = FakeSource::default();
        untouched.ci_commits.insert(".github/workflows", vec![]);
        untouched.ci_commits.insert(".travis.yml", vec![]);
        assert!(!ci_adopted(&untouched, &repo(), boundary()).await);

        let failing = FakeSource {
            ci_fails: true,
            ..Default::default()
        };
        assert!(!ci_adopted(&failing, &repo(), boundary()).await);
    }

    fn comment(author: &str, created_at: DateTime<Utc>) -> CommentRecord {
        CommentRecord {
            author_login: author.to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn latency_averages_first_owner_comment_per_side() {
        let mut source = FakeSource::default();
        // Before the boundary: answered after 2h, then again at 10h.
        source.comments.insert(
            1,
            vec![
                comment("octo", ts(2021, 1, 1) + Duration::hours(2)),
                comment("octo", ts(2021, 1, 1) + Duration::hours(10)),
            ],
        );
        // After the boundary: a non-owner comment first, owner at 5h.
        source.comments.insert(
            2,
            vec![
                comment("drive-by", ts(2021, 7, 1) + Duration::hours(1)),
                comment("octo", ts(2021, 7, 1) + Duration::hours(5)),
            ],
        );

        let issues = vec![issue(1, ts(2021, 1, 1), 0), issue(2, ts(2021, 7, 1), 0)];
        let (before, after) =
            maintainer_latency(&source, &repo(), "octo", &issues, boundary()).await;
        assert_eq!(before, 2.0);
        assert_eq!(after, 5.0);
    }

    #[tokio::test]
    async fn latency_excludes_owner_authored_issues() {
        let mut source = FakeSource::default();
        source
            .comments
            .insert(1, vec![comment("octo", ts(2021, 1, 2))]);

        let mut owned = issue(1, ts(2021, 1, 1), 0);
        owned.author_login = "octo".to_string();

        let (before, after) =
            maintainer_latency(&source, &repo(), "octo", &[owned], boundary()).await;
        assert_eq!((before, after), (0.0, 0.0));
    }

    #[tokio::test]
    async fn latency_skips_issues_whose_comments_fail_to_fetch() {
        let mut source = FakeSource::default();
        source.failing_issues.insert(1);
        source.comments.insert(
            2,
            vec![comment("octo", ts(2021, 1, 2) + Duration::minutes(90))],
        );

        let issues = vec![issue(1, ts(2021, 1, 1), 0), issue(2, ts(2021, 1, 2), 0)];
        let (before, after) =
            maintainer_latency(&source, &repo(), "octo", &issues, boundary()).await;
        assert_eq!(before, 1.5);
        assert_eq!(after, 0.0);
    }

    #[tokio::test]
    async fn latency_ignores_issues_never_answered_by_owner() {
        let mut source = FakeSource::default();
        source
            .comments
            .insert(1, vec![comment("passerby", ts(2021, 1, 2))]);

        let issues = vec![issue(1, ts(2021, 1, 1), 0)];
        let result = maintainer_latency(&source, &repo(), "octo", &issues, boundary()).await;
        assert_eq!(result, (0.0, 0.0));
    }

    #[test]
    fn new_maintainers_is_a_fixed_sentinel() {
        assert_eq!(new_maintainers(), NEW_MAINTAINERS_SENTINEL);
    }
}
