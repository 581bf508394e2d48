//! In-memory repository for exercising the resolver and the orchestrator
//! without a real git checkout.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use super::{Branch, CommitHash, RepoError, RepositoryMutation, RepositoryQuery};

/// A mutation observed by [`FakeRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Branch { commit: String, name: String },
    Checkout(String),
    Detach(String),
    DiscardChanges,
    Apply { patch_exists: bool, allow_partial: bool },
    Commit { message: String, author: String },
    DeleteBranch(String),
}

#[derive(Debug, Default)]
pub struct FakeRepository {
    /// ref -> commit
    pub refs: HashMap<String, String>,
    pub branches: RefCell<Vec<String>>,
    pub current: RefCell<Option<String>>,
    pub config: HashMap<String, Vec<String>>,
    pub clean: bool,
    pub remotes: HashMap<String, String>,
    pub user_name: Option<String>,
    pub fail_apply: bool,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeRepository {
    /// A clean repository on `main` at commit `c0ffee`.
    pub fn new() -> Self {
        let mut refs = HashMap::new();
        refs.insert("HEAD".to_string(), "c0ffee".to_string());
        refs.insert("main".to_string(), "c0ffee".to_string());
        Self {
            refs,
            branches: RefCell::new(vec!["main".to_string()]),
            current: RefCell::new(Some("main".to_string())),
            clean: true,
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, name: &str, commit: &str) -> Self {
        self.refs.insert(name.to_string(), commit.to_string());
        self.branches.borrow_mut().push(name.to_string());
        self
    }

    pub fn with_ref(mut self, name: &str, commit: &str) -> Self {
        self.refs.insert(name.to_string(), commit.to_string());
        self
    }

    pub fn with_config(mut self, key: &str, values: &[&str]) -> Self {
        self.config
            .insert(key.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn has_mutations(&self) -> bool {
        !self.calls.borrow().is_empty()
    }
}

impl RepositoryQuery for FakeRepository {
    fn resolve(&self, reference: &str) -> Result<Option<CommitHash>, RepoError> {
        Ok(self.refs.get(reference).map(CommitHash::new))
    }

    fn branches(&self) -> Result<Vec<Branch>, RepoError> {
        Ok(self.branches.borrow().iter().map(Branch::new).collect())
    }

    fn current_branch(&self) -> Result<Option<Branch>, RepoError> {
        Ok(self.current.borrow().as_ref().map(Branch::new))
    }

    fn config(&self, key: &str) -> Result<Vec<String>, RepoError> {
        Ok(self.config.get(key).cloned().unwrap_or_default())
    }

    fn is_clean(&self) -> Result<bool, RepoError> {
        Ok(self.clean)
    }

    fn pull_path(&self, remote: &str) -> Result<Option<String>, RepoError> {
        Ok(self.remotes.get(remote).cloned())
    }

    fn username(&self) -> Result<Option<String>, RepoError> {
        Ok(self.user_name.clone())
    }
}

impl RepositoryMutation for FakeRepository {
    fn branch(&self, commit: &CommitHash, name: &str) -> Result<Branch, RepoError> {
        self.calls.borrow_mut().push(Call::Branch {
            commit: commit.to_string(),
            name: name.to_string(),
        });
        self.branches.borrow_mut().push(name.to_string());
        Ok(Branch::new(name))
    }

    fn checkout(&self, branch: &Branch) -> Result<(), RepoError> {
        self.calls
            .borrow_mut()
            .push(Call::Checkout(branch.name().to_string()));
        *self.current.borrow_mut() = Some(branch.name().to_string());
        Ok(())
    }

    fn detach(&self, commit: &CommitHash) -> Result<(), RepoError> {
        self.calls
            .borrow_mut()
            .push(Call::Detach(commit.to_string()));
        *self.current.borrow_mut() = None;
        Ok(())
    }

    fn discard_changes(&self) -> Result<(), RepoError> {
        self.calls.borrow_mut().push(Call::DiscardChanges);
        Ok(())
    }

    fn apply(&self, patch: &Path, allow_partial: bool) -> Result<(), RepoError> {
        self.calls.borrow_mut().push(Call::Apply {
            patch_exists: patch.exists(),
            allow_partial,
        });
        if self.fail_apply {
            return Err(RepoError::CommandFailed {
                command: "apply".to_string(),
                detail: "patch does not apply".to_string(),
            });
        }
        Ok(())
    }

    fn commit(
        &self,
        message: &str,
        author_name: &str,
        _author_email: &str,
    ) -> Result<CommitHash, RepoError> {
        self.calls.borrow_mut().push(Call::Commit {
            message: message.to_string(),
            author: author_name.to_string(),
        });
        Ok(CommitHash::new("beef"))
    }

    fn delete_branch(&self, branch: &Branch) -> Result<(), RepoError> {
        self.calls
            .borrow_mut()
            .push(Call::DeleteBranch(branch.name().to_string()));
        self.branches.borrow_mut().retain(|b| b != branch.name());
        Ok(())
    }
}
