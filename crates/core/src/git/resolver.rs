//! Branch resolution: current branch and primary-branch detection.

use tracing::{debug, instrument};

use crate::errors::GitError;
use crate::git::cli::GitCli;

/// Conventional primary-branch names, probed in order. The first existing
/// reference wins; `main` is preferred over `master` when both exist.
pub const PRIMARY_CANDIDATES: [&str; 2] = ["main", "master"];

/// Resolves the distinguished branch roles of a repository.
pub struct BranchResolver<'a> {
    git: &'a GitCli,
}

impl<'a> BranchResolver<'a> {
    pub fn new(git: &'a GitCli) -> Self {
        Self { git }
    }

    /// Name of the currently checked-out branch. Fails only if the probe
    /// itself fails (detached HEAD, not a repository).
    pub async fn current_branch(&self) -> Result<String, GitError> {
        self.git.current_branch().await
    }

    /// Name of the repository's primary branch: the first candidate in
    /// [`PRIMARY_CANDIDATES`] whose reference exists.
    #[instrument(skip(self))]
    pub async fn primary_branch(&self) -> Result<String, GitError> {
        for candidate in PRIMARY_CANDIDATES {
            if self.git.branch_exists(candidate).await? {
                debug!(branch = candidate, "resolved primary branch");
                return Ok(candidate.to_string());
            }
        }
        Err(GitError::NoPrimaryBranch)
    }
}
