use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

use super::{Branch, CommitHash, RepoError, RepositoryMutation, RepositoryQuery};

/// A git working copy, driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Find the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, RepoError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .arg("rev-parse")
            .arg("--show-toplevel")
            .output()?;

        if !output.status.success() {
            return Err(RepoError::NotARepo(path.display().to_string()));
        }

        let root = String::from_utf8(output.stdout)?.trim().to_string();
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.current_dir(&self.root);
        command
    }

    fn run(&self, args: &[&str]) -> Result<Output, RepoError> {
        debug!(?args, "running git");
        Ok(self.git().args(args).output()?)
    }

    /// Run git and return its trimmed stdout, failing on a non-zero exit.
    fn run_checked(&self, args: &[&str]) -> Result<String, RepoError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

/// Describe a failed git run by its stderr, else its stdout, else its exit
/// status.
fn command_failed(args: &[&str], output: &Output) -> RepoError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let detail = if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        output.status.to_string()
    };
    RepoError::CommandFailed {
        command: args.first().copied().unwrap_or_default().to_string(),
        detail,
    }
}

impl RepositoryQuery for GitRepository {
    fn resolve(&self, reference: &str) -> Result<Option<CommitHash>, RepoError> {
        // Keep user-supplied refs from being read as options.
        if reference.is_empty() || reference.starts_with('-') {
            return Ok(None);
        }

        let spec = format!("{}^{{commit}}", reference);
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }

        let hash = String::from_utf8(output.stdout)?.trim().to_string();
        Ok(Some(CommitHash::new(hash)))
    }

    fn branches(&self) -> Result<Vec<Branch>, RepoError> {
        let stdout = self.run_checked(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])?;
        Ok(stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(Branch::new)
            .collect())
    }

    fn current_branch(&self) -> Result<Option<Branch>, RepoError> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8(output.stdout)?.trim().to_string();
        Ok((!name.is_empty()).then(|| Branch::new(name)))
    }

    fn config(&self, key: &str) -> Result<Vec<String>, RepoError> {
        let args = ["config", "--get-all", key];
        let output = self.run(&args)?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8(output.stdout)?
                .lines()
                .map(str::to_string)
                .collect()),
            // exit code 1 means the key is not set
            Some(1) => Ok(Vec::new()),
            _ => Err(command_failed(&args, &output)),
        }
    }

    fn is_clean(&self) -> Result<bool, RepoError> {
        let stdout = self.run_checked(&["status", "--porcelain"])?;
        Ok(stdout.is_empty())
    }

    fn pull_path(&self, remote: &str) -> Result<Option<String>, RepoError> {
        let key = format!("remote.{}.url", remote);
        Ok(self.config(&key)?.into_iter().next())
    }

    fn username(&self) -> Result<Option<String>, RepoError> {
        Ok(self.config("user.name")?.into_iter().next())
    }
}

impl RepositoryMutation for GitRepository {
    fn branch(&self, commit: &CommitHash, name: &str) -> Result<Branch, RepoError> {
        self.run_checked(&["branch", name, commit.as_str()])?;
        Ok(Branch::new(name))
    }

    fn checkout(&self, branch: &Branch) -> Result<(), RepoError> {
        self.run_checked(&["checkout", "--quiet", branch.name()])?;
        Ok(())
    }

    fn detach(&self, commit: &CommitHash) -> Result<(), RepoError> {
        self.run_checked(&["checkout", "--quiet", "--detach", commit.as_str()])?;
        Ok(())
    }

    fn discard_changes(&self) -> Result<(), RepoError> {
        self.run_checked(&["reset", "--hard", "--quiet"])?;
        Ok(())
    }

    fn apply(&self, patch: &Path, allow_partial: bool) -> Result<(), RepoError> {
        let patch = patch.to_string_lossy();
        let mut args = vec!["apply", "--index"];
        if allow_partial {
            args.push("--reject");
        }
        args.push(&patch);
        self.run_checked(&args)?;
        Ok(())
    }

    fn commit(
        &self,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<CommitHash, RepoError> {
        let args = ["commit", "--quiet", "--message", message];
        let mut command = self.git();
        command.args(args);
        if !author_name.is_empty() {
            command.env("GIT_AUTHOR_NAME", author_name);
        }
        if !author_email.is_empty() {
            command.env("GIT_AUTHOR_EMAIL", author_email);
        }

        debug!(author = author_name, "committing");
        let output = command.output()?;
        if !output.status.success() {
            return Err(command_failed(&args, &output));
        }

        let head = self.run_checked(&["rev-parse", "HEAD"])?;
        Ok(CommitHash::new(head))
    }

    fn delete_branch(&self, branch: &Branch) -> Result<(), RepoError> {
        self.run_checked(&["branch", "-D", branch.name()])?;
        Ok(())
    }
}
