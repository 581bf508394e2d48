use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::repo::{CommitHash, RepoError, RepositoryQuery};
use crate::webrev::WebrevMetadata;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not resolve reference '{0}'")]
    UnresolvableReference(String),

    #[error("webrev applies to branch '{0}', but this repository has no such branch")]
    UnknownBranch(String),

    #[error("found no information indicating where to apply this webrev; use --ref to specify a ref explicitly")]
    NoResolutionPath,

    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// Which piece of evidence picked the target commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOrigin {
    Override,
    CompareAgainstRevision,
    Branch,
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Override => write!(f, "--ref"),
            TargetOrigin::CompareAgainstRevision => write!(f, "compare-against revision"),
            TargetOrigin::Branch => write!(f, "webrev branch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub commit: CommitHash,
    pub origin: TargetOrigin,
}

/// Pick the commit a webrev should be applied on top of.
///
/// In order: an explicit `override_ref`, the exact revision the webrev was
/// compared against, then the webrev's branch if it exists locally.
#[instrument(skip(metadata, repo), fields(source = %metadata.source_uri))]
pub fn resolve<R>(
    metadata: &WebrevMetadata,
    override_ref: Option<&str>,
    repo: &R,
) -> Result<ResolvedTarget, ResolveError>
where
    R: RepositoryQuery + ?Sized,
{
    if let Some(reference) = override_ref {
        let commit = resolve_ref(repo, reference)?;
        debug!(%commit, "using explicit ref");
        return Ok(ResolvedTarget {
            commit,
            origin: TargetOrigin::Override,
        });
    }

    if let Some(revision) = &metadata.compare_against_revision {
        debug!(%revision, "using compare-against revision");
        return Ok(ResolvedTarget {
            commit: CommitHash::new(revision.as_str()),
            origin: TargetOrigin::CompareAgainstRevision,
        });
    }

    if let Some(onto) = &metadata.branch {
        let known = repo.branches()?.iter().any(|b| b.name() == onto);
        if !known {
            return Err(ResolveError::UnknownBranch(onto.clone()));
        }
        let commit = resolve_ref(repo, onto)?;
        debug!(branch = %onto, %commit, "using webrev branch");
        return Ok(ResolvedTarget {
            commit,
            origin: TargetOrigin::Branch,
        });
    }

    Err(ResolveError::NoResolutionPath)
}

/// Resolve `reference`, turning "unknown" into an error.
pub fn resolve_ref<R>(repo: &R, reference: &str) -> Result<CommitHash, ResolveError>
where
    R: RepositoryQuery + ?Sized,
{
    repo.resolve(reference)?
        .ok_or_else(|| ResolveError::UnresolvableReference(reference.to_string()))
}
