pub mod git;

#[cfg(test)]
pub mod fake;
#[cfg(test)]
pub mod fixture;

pub use git::GitRepository;

use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} is not a git repository")]
    NotARepo(String),

    #[error("git {command} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("git produced non UTF-8 output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// A commit identifier, kept exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitHash(String);

impl CommitHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch(String);

impl Branch {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of a local repository.
pub trait RepositoryQuery {
    /// Resolve a revision expression; `None` when the repository does not know it.
    fn resolve(&self, reference: &str) -> Result<Option<CommitHash>, RepoError>;

    /// Local branches.
    fn branches(&self) -> Result<Vec<Branch>, RepoError>;

    /// The checked out branch, `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<Branch>, RepoError>;

    /// All values of a configuration key (empty if unset).
    fn config(&self, key: &str) -> Result<Vec<String>, RepoError>;

    /// No staged, unstaged or untracked changes.
    fn is_clean(&self) -> Result<bool, RepoError>;

    /// The fetch URL of `remote`.
    fn pull_path(&self, remote: &str) -> Result<Option<String>, RepoError>;

    /// The configured committer name.
    fn username(&self) -> Result<Option<String>, RepoError>;
}

/// Operations that change the repository or its working copy.
pub trait RepositoryMutation {
    /// Create `name` pointing at `commit` without checking it out.
    fn branch(&self, commit: &CommitHash, name: &str) -> Result<Branch, RepoError>;

    fn checkout(&self, branch: &Branch) -> Result<(), RepoError>;

    /// Check out `commit` with a detached HEAD.
    fn detach(&self, commit: &CommitHash) -> Result<(), RepoError>;

    /// Reset the index and tracked files to HEAD. Untracked files stay.
    fn discard_changes(&self) -> Result<(), RepoError>;

    /// Apply `patch` to the working copy and index. With `allow_partial`,
    /// hunks that do not apply are left as rejects instead of failing.
    fn apply(&self, patch: &Path, allow_partial: bool) -> Result<(), RepoError>;

    /// Commit the index. An empty `author_name` keeps the configured identity.
    fn commit(&self, message: &str, author_name: &str, author_email: &str)
        -> Result<CommitHash, RepoError>;

    fn delete_branch(&self, branch: &Branch) -> Result<(), RepoError>;
}
