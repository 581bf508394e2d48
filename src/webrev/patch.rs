use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

use super::RetrievalError;

/// A downloaded patch in a temporary file.
///
/// The file is removed when the handle is dropped unless [`PatchFile::keep`]
/// was called.
#[derive(Debug)]
pub struct PatchFile {
    path: TempPath,
}

impl PatchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the file past the lifetime of this handle.
    pub fn keep(self) -> Result<PathBuf, std::io::Error> {
        self.path.keep().map_err(|e| e.error)
    }
}

/// Stream a successful response body into a fresh `patch*.patch` file.
///
/// The caller is expected to have checked the response status already.
pub(super) async fn write_body(
    mut response: reqwest::Response,
) -> Result<PatchFile, RetrievalError> {
    let mut file = tempfile::Builder::new()
        .prefix("patch")
        .suffix(".patch")
        .tempfile()?;

    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
        written += chunk.len();
    }
    file.flush()?;
    debug!(path = %file.path().display(), bytes = written, "patch written");

    Ok(PatchFile {
        path: file.into_temp_path(),
    })
}

#[cfg(test)]
pub(crate) fn from_temp_path(path: TempPath) -> PatchFile {
    PatchFile { path }
}
