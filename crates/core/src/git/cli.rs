//! Asynchronous git CLI client.
//!
//! Every operation is one `git` invocation: spawn, wait for completion,
//! capture stdout/stderr. There is no timeout, retry, or streaming: the
//! workflow depends on full completion and exact exit-code semantics.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::errors::GitError;

/// Exit code `git show-ref --verify` uses for a missing reference.
const EXIT_REF_MISSING: i32 = 1;

/// Asynchronous client for a single git repository, driven via the CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    /// Create a client operating on the repository at `repo_path`.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Name of the currently checked-out branch.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn current_branch(&self) -> Result<String, GitError> {
        self.run_git(&["branch", "--show-current"]).await
    }

    /// Whether a local branch reference exists.
    ///
    /// Explicit boolean check: exit 0 means the ref exists, exit 1 means it
    /// does not, anything else (e.g. not a repository) is a real failure.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{}", name);
        let output = self.run_git_raw(&["show-ref", "--verify", &refname]).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(EXIT_REF_MISSING) => Ok(false),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(?code, %stderr, "show-ref failed");
                Err(GitError::CommandFailed {
                    exit_code: code.unwrap_or(-1),
                    stderr,
                })
            }
        }
    }

    /// Porcelain status output; empty when the working tree is clean.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn status_porcelain(&self) -> Result<String, GitError> {
        self.run_git(&["status", "--porcelain"]).await
    }

    /// Whether the working tree has no uncommitted changes.
    pub async fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.status_porcelain().await?.is_empty())
    }

    /// Switch the working tree to `branch`.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", branch]).await?;
        debug!(branch, "checked out");
        Ok(())
    }

    /// Create `name` starting at `base` and switch to it.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn create_branch_from(&self, name: &str, base: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "-b", name, base]).await?;
        debug!(name, base, "created branch");
        Ok(())
    }

    /// Fast-forward/merge `branch` from its counterpart on `remote`.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["pull", remote, branch]).await?;
        debug!(remote, branch, "pulled");
        Ok(())
    }

    /// Merge `source` into the checked-out branch.
    #[instrument(skip(self, message), fields(repo = %self.repo_path.display()))]
    pub async fn merge(
        &self,
        source: &str,
        squash: bool,
        message: Option<&str>,
    ) -> Result<String, GitError> {
        let args = merge_args(source, squash, message);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_git(&arg_refs).await
    }

    /// Commit staged changes with `message`.
    #[instrument(skip(self, message), fields(repo = %self.repo_path.display()))]
    pub async fn commit(&self, message: &str) -> Result<String, GitError> {
        self.run_git(&["commit", "-m", message]).await
    }

    /// Push `branch` to `remote`.
    #[instrument(skip(self), fields(repo = %self.repo_path.display()))]
    pub async fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_git(&["push", remote, branch]).await?;
        debug!(remote, branch, "pushed");
        Ok(())
    }

    /// Run a git command to completion and return trimmed stdout, converting
    /// a non-zero exit status into [`GitError::CommandFailed`] carrying the
    /// captured stderr.
    async fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run_git_raw(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed { exit_code, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_git_raw(&self, args: &[&str]) -> Result<std::process::Output, GitError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("git {}", args.join(" ")), "running git command");
        cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound("git".into())
            } else {
                GitError::IoError(e)
            }
        })
    }
}

/// Build the argument list for a merge: `merge [--squash] [-m <message>] <source>`.
fn merge_args(source: &str, squash: bool, message: Option<&str>) -> Vec<String> {
    let mut args = vec!["merge".to_string()];
    if squash {
        args.push("--squash".to_string());
    }
    if let Some(msg) = message {
        args.push("-m".to_string());
        args.push(msg.to_string());
    }
    args.push(source.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_args_plain() {
        assert_eq!(merge_args("feature", false, None), vec!["merge", "feature"]);
    }

    #[test]
    fn test_merge_args_squash() {
        assert_eq!(
            merge_args("feature", true, None),
            vec!["merge", "--squash", "feature"]
        );
    }

    #[test]
    fn test_merge_args_with_message() {
        assert_eq!(
            merge_args("feature", false, Some("land feature")),
            vec!["merge", "-m", "land feature", "feature"]
        );
        assert_eq!(
            merge_args("feature", true, Some("land feature")),
            vec!["merge", "--squash", "-m", "land feature", "feature"]
        );
    }

    #[test]
    fn test_client_construction() {
        let client = GitCli::new("/tmp/repo");
        assert_eq!(client.repo_path(), Path::new("/tmp/repo"));
    }
}
