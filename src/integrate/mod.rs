pub mod generate;

pub use generate::{generate, GenerateOptions, GeneratePlan, WebrevGenerator};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::repo::{Branch, CommitHash, RepoError, RepositoryMutation, RepositoryQuery};
use crate::resolve::{self, ResolveError, ResolvedTarget};
use crate::webrev::{self, PatchFile, WebrevClient, WebrevError, WebrevMetadata};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Webrev(#[from] WebrevError),

    #[error("Could not find patch file in webrev {0}")]
    PatchNotFound(Url),

    #[error("Repository is not clean; commit or stash your changes first")]
    DirtyWorkingCopy,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error(transparent)]
    Generate(#[from] generate::GenerateError),
}

/// Result of `apply`.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub metadata: WebrevMetadata,
    pub patch_uri: Url,
}

/// Result of `fetch`.
#[derive(Debug)]
pub struct FetchOutcome {
    pub metadata: WebrevMetadata,
    pub target: ResolvedTarget,
    pub branch: Branch,
    pub commit: CommitHash,
}

#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    /// Webrev location exactly as given by the user; also the commit message
    pub location: &'a str,
    /// Name of the branch to create
    pub branch: &'a str,
    /// Explicit ref to apply onto, beating anything in the webrev
    pub override_ref: Option<&'a str>,
}

/// Download the webrev's metadata without touching the repository.
#[instrument(skip(client))]
pub async fn show(
    client: &dyn WebrevClient,
    location: &str,
) -> Result<WebrevMetadata, IntegrationError> {
    Ok(webrev::fetch_metadata(client, location).await?)
}

/// Apply the webrev's patch to the current checkout. No branch or commit is
/// created.
#[instrument(skip(client, repo))]
pub async fn apply<R>(
    client: &dyn WebrevClient,
    repo: &R,
    location: &str,
) -> Result<ApplyOutcome, IntegrationError>
where
    R: RepositoryMutation + ?Sized,
{
    let (metadata, patch_uri, patch) = download(client, location).await?;

    info!(patch = %patch_uri, "applying patch to working copy");
    repo.apply(patch.path(), false)?;

    Ok(ApplyOutcome {
        metadata,
        patch_uri,
    })
}

/// Materialize the webrev as a commit on a new branch.
///
/// Everything up to and including target resolution runs before the
/// repository is touched. If a later step fails, the patch is discarded, the
/// previous branch (or detached commit) is checked out again and the new
/// branch deleted, best-effort.
#[instrument(skip(client, repo, request), fields(location = request.location, branch = request.branch))]
pub async fn fetch<R>(
    client: &dyn WebrevClient,
    repo: &R,
    request: &FetchRequest<'_>,
) -> Result<FetchOutcome, IntegrationError>
where
    R: RepositoryQuery + RepositoryMutation + ?Sized,
{
    if !repo.is_clean()? {
        return Err(IntegrationError::DirtyWorkingCopy);
    }

    let (metadata, _patch_uri, patch) = download(client, request.location).await?;

    let target = resolve::resolve(&metadata, request.override_ref, repo)?;
    info!(commit = %target.commit, origin = %target.origin, "resolved target commit");

    let previous = Previous::record(repo)?;
    let branch = repo.branch(&target.commit, request.branch)?;
    let author = metadata.author.as_deref().unwrap_or("");

    match commit_patch(repo, &branch, &patch, request.location, author) {
        Ok(commit) => {
            info!(%branch, %commit, "webrev committed");
            Ok(FetchOutcome {
                metadata,
                target,
                branch,
                commit,
            })
        }
        Err(err) => {
            roll_back(repo, &previous, &branch);
            Err(err.into())
        }
    }
}

async fn download(
    client: &dyn WebrevClient,
    location: &str,
) -> Result<(WebrevMetadata, Url, PatchFile), IntegrationError> {
    let metadata = webrev::fetch_metadata(client, location).await?;
    let patch_uri = metadata
        .patch_uri
        .clone()
        .ok_or_else(|| IntegrationError::PatchNotFound(metadata.source_uri.clone()))?;

    debug!(patch = %patch_uri, "downloading patch");
    let patch = client.fetch_patch(&patch_uri).await?;
    Ok((metadata, patch_uri, patch))
}

fn commit_patch<R>(
    repo: &R,
    branch: &Branch,
    patch: &PatchFile,
    message: &str,
    author: &str,
) -> Result<CommitHash, RepoError>
where
    R: RepositoryMutation + ?Sized,
{
    repo.checkout(branch)?;
    repo.apply(patch.path(), false)?;
    repo.commit(message, author, "")
}

/// Where HEAD pointed before `fetch` created its branch.
enum Previous {
    Branch(Branch),
    Detached(CommitHash),
}

impl Previous {
    fn record<R>(repo: &R) -> Result<Self, IntegrationError>
    where
        R: RepositoryQuery + ?Sized,
    {
        if let Some(branch) = repo.current_branch()? {
            return Ok(Previous::Branch(branch));
        }
        let head = repo
            .resolve("HEAD")?
            .ok_or_else(|| ResolveError::UnresolvableReference("HEAD".to_string()))?;
        Ok(Previous::Detached(head))
    }
}

/// Undo a half-finished fetch. The patch is discarded before HEAD moves back,
/// so nothing it staged follows onto the previous checkout.
fn roll_back<R>(repo: &R, previous: &Previous, created: &Branch)
where
    R: RepositoryMutation + ?Sized,
{
    if let Err(e) = repo.discard_changes() {
        warn!(branch = %created, error = %e, "could not discard patch changes");
        return;
    }
    let restored = match previous {
        Previous::Branch(branch) => repo.checkout(branch),
        Previous::Detached(commit) => repo.detach(commit),
    };
    if let Err(e) = restored {
        warn!(branch = %created, error = %e, "could not restore previous checkout");
        return;
    }
    if let Err(e) = repo.delete_branch(created) {
        warn!(branch = %created, error = %e, "could not delete branch");
    }
}
