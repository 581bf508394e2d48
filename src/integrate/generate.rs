use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use super::IntegrationError;
use crate::config::{self, Config, ProcessDefaults};
use crate::repo::{CommitHash, RepositoryQuery};
use crate::resolve;

const ISSUE_TRACKER: &str = "https://bugs.openjdk.java.net/browse/";
const DEFAULT_OUTPUT: &str = "webrev";
const ENABLED_VALUES: [&str; 4] = ["TRUE", "ON", "1", "ENABLED"];

static ISSUE_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(JDK|CODETOOLS|JMC)-)?([0-9]+).*$").expect("issue branch pattern is valid")
});

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("Refusing to clear output directory {0}: it contains the working directory")]
    UnsafeOutput(PathBuf),

    #[error("Failed to clear output directory {path}: {source}")]
    ClearOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Command-line values for `generate`; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub rev: Option<String>,
    pub output: Option<String>,
    pub username: Option<String>,
    pub repository: Option<String>,
    pub title: Option<String>,
    pub cr: Option<String>,
    pub no_outgoing: bool,
}

/// Fully resolved inputs for the webrev generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratePlan {
    pub base: CommitHash,
    pub output: PathBuf,
    pub title: String,
    pub upstream: Option<String>,
    pub username: Option<String>,
    pub issue: Option<String>,
    pub version: String,
}

/// Renders a webrev from a plan.
pub trait WebrevGenerator {
    fn generate(&self, plan: &GeneratePlan) -> Result<(), GenerateError>;
}

/// Runs an external webrev renderer inside the repository.
pub struct ExternalGenerator {
    program: String,
    workdir: PathBuf,
}

impl ExternalGenerator {
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    fn arguments(plan: &GeneratePlan) -> Vec<String> {
        let mut args = vec![
            "--output".to_string(),
            plan.output.display().to_string(),
            "--title".to_string(),
            plan.title.clone(),
            "--version".to_string(),
            plan.version.clone(),
        ];
        let optional = [
            ("--username", &plan.username),
            ("--upstream", &plan.upstream),
            ("--issue", &plan.issue),
        ];
        for (flag, value) in optional {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args.push("--rev".to_string());
        args.push(plan.base.to_string());
        args
    }
}

impl WebrevGenerator for ExternalGenerator {
    fn generate(&self, plan: &GeneratePlan) -> Result<(), GenerateError> {
        let args = Self::arguments(plan);
        debug!(program = %self.program, ?args, "running webrev generator");
        let status = Command::new(&self.program)
            .current_dir(&self.workdir)
            .args(&args)
            .status()
            .map_err(|source| GenerateError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(GenerateError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Work out every generator input from flags, repository config and
/// process defaults.
pub fn plan<R>(
    options: &GenerateOptions,
    repo: &R,
    config: &Config,
    defaults: &ProcessDefaults,
) -> Result<GeneratePlan, IntegrationError>
where
    R: RepositoryQuery + ?Sized,
{
    let upstream = match config::setting(options.repository.as_deref(), "repository", repo)? {
        Some(upstream) => Some(upstream),
        None => repo
            .pull_path("origin")?
            .and_then(|pull| upstream_from_pull_path(&pull)),
    };

    let no_outgoing = options.no_outgoing || {
        let values = repo.config("webrev.no-outgoing")?;
        match values.as_slice() {
            [value] => ENABLED_VALUES.contains(&value.to_uppercase().as_str()),
            _ => false,
        }
    };

    let base = match (&options.rev, no_outgoing) {
        (Some(rev), _) => resolve::resolve_ref(repo, rev)?,
        (None, true) => resolve::resolve_ref(repo, "HEAD")?,
        (None, false) => resolve::resolve_ref(repo, config.upstream_ref())?,
    };

    let issue = match &options.cr {
        Some(cr) => Some(issue_url(cr)),
        None => repo
            .current_branch()?
            .and_then(|branch| issue_from_branch(branch.name())),
    };

    let output = config::setting(options.output.as_deref(), "output", repo)?
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let output = defaults.cwd.join(output);

    let title = options
        .title
        .clone()
        .or_else(|| issue.as_deref().and_then(last_path_segment))
        .or_else(|| upstream.as_deref().and_then(tail_after_slash))
        .or_else(|| {
            defaults
                .cwd
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
        })
        .unwrap_or_default();

    let username = match config::setting(options.username.as_deref(), "username", repo)? {
        Some(name) => Some(name),
        None => repo.username()?.or_else(|| defaults.user_name.clone()),
    };

    Ok(GeneratePlan {
        base,
        output,
        title,
        upstream,
        username,
        issue,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Plan, clear the output directory and hand over to `generator`.
#[instrument(skip_all)]
pub fn generate<R>(
    options: &GenerateOptions,
    repo: &R,
    generator: &dyn WebrevGenerator,
    config: &Config,
    defaults: &ProcessDefaults,
) -> Result<GeneratePlan, IntegrationError>
where
    R: RepositoryQuery + ?Sized,
{
    let plan = plan(options, repo, config, defaults)?;
    info!(base = %plan.base, output = %plan.output.display(), title = %plan.title, "generating webrev");

    clear_output(&plan.output, &defaults.cwd)?;
    generator.generate(&plan)?;
    Ok(plan)
}

fn clear_output(output: &Path, cwd: &Path) -> Result<(), GenerateError> {
    if !output.exists() {
        return Ok(());
    }
    let canonical = |path: &Path| {
        fs::canonicalize(path).map_err(|source| GenerateError::ClearOutput {
            path: path.to_path_buf(),
            source,
        })
    };
    // `..` and symlinks must not sneak past the containment check.
    if canonical(cwd)?.starts_with(canonical(output)?) {
        return Err(GenerateError::UnsafeOutput(output.to_path_buf()));
    }
    debug!(path = %output.display(), "clearing previous webrev");
    fs::remove_dir_all(output).map_err(|source| GenerateError::ClearOutput {
        path: output.to_path_buf(),
        source,
    })
}

/// Recognize upstream OpenJDK repositories from a remote URL.
fn upstream_from_pull_path(pull_path: &str) -> Option<String> {
    let uri = Url::parse(pull_path).ok()?;
    let host = uri.host_str()?;
    let path = uri.path();
    if host == "github.com" && path.starts_with("/openjdk/") {
        Some(format!("https://github.com{}", path))
    } else if host == "openjdk.java.net" {
        Some(format!("https://openjdk.java.net{}", path))
    } else {
        None
    }
}

/// Expand a `--cr` value into an issue tracker URL.
fn issue_url(cr: &str) -> String {
    if cr.starts_with("http") {
        return cr.to_string();
    }
    if cr.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{}JDK-{}", ISSUE_TRACKER, cr)
    } else {
        format!("{}{}", ISSUE_TRACKER, cr)
    }
}

/// Branches named after an issue, such as `8230000` or `jmc-7000-fix`.
fn issue_from_branch(branch: &str) -> Option<String> {
    let upper = branch.to_uppercase();
    let caps = ISSUE_BRANCH.captures(&upper)?;
    let project = caps.get(1).map_or("JDK", |m| m.as_str());
    Some(format!("{}{}-{}", ISSUE_TRACKER, project, &caps[2]))
}

fn last_path_segment(uri: &str) -> Option<String> {
    let uri = Url::parse(uri).ok()?;
    uri.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn tail_after_slash(upstream: &str) -> Option<String> {
    let (_, tail) = upstream.rsplit_once('/')?;
    (!tail.is_empty()).then(|| tail.to_string())
}
