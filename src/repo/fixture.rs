//! Throwaway git repositories for tests that need the real executable.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use super::GitRepository;

/// Turns README from "hello" into "hello, world".
pub const README_PATCH: &str = "\
diff --git a/README b/README
--- a/README
+++ b/README
@@ -1 +1 @@
-hello
+hello, world
";

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A repository on `main` with one commit holding `README`.
pub fn init_repo() -> (TempDir, GitRepository) {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "--quiet"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    git(dir.path(), &["config", "core.hooksPath", ".git/hooks"]);
    fs::write(dir.path().join("README"), "hello\n").unwrap();
    git(dir.path(), &["add", "README"]);
    git(dir.path(), &["commit", "--quiet", "-m", "initial"]);
    let repo = GitRepository::discover(dir.path()).unwrap();
    (dir, repo)
}

/// Make every later commit fail in a silent `pre-commit` hook.
#[cfg(unix)]
pub fn install_failing_hook(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let hooks = dir.join(".git").join("hooks");
    fs::create_dir_all(&hooks).unwrap();
    let hook = hooks.join("pre-commit");
    fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
}
