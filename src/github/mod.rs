pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{CommentRecord, CommitRecord, IssueRecord, Lookup, RepoDataSource, RepoId};
