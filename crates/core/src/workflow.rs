//! Branch-merge workflow engine.
//!
//! The [`MergeEngine`] orchestrates the two supported merge operations:
//!
//! 1. Resolve the source branch (given, or currently checked out).
//! 2. Resolve/validate the target branch (primary branch, or a named test
//!    branch created from the primary when absent).
//! 3. Verify the working tree is clean.
//! 4. Switch to the target, synchronize it with its remote counterpart,
//!    merge the source, and commit separately for squash merges without an
//!    explicit message.
//!
//! Both operations convert every internal failure into
//! [`MergeOutcome::Failed`]; the caller always receives an outcome, never
//! an error. Each invocation runs its whole sequence to completion; there
//! is no locking between invocations, so concurrent calls race on the
//! shared working tree just like concurrent git commands would.

use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::GitError;
use crate::git::cli::GitCli;
use crate::git::resolver::BranchResolver;
use crate::models::{MergeOutcome, MergeRequest, TargetRole};

// ---------------------------------------------------------------------------
// Remote synchronization policy
// ---------------------------------------------------------------------------

/// How a pull failure during target synchronization is treated.
///
/// The primary-branch flow fails loudly when its remote cannot be pulled;
/// the test-branch flow proceeds, because the remote may legitimately not
/// have the test branch yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteSync {
    Required,
    BestEffort,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The branch-merge workflow engine.
pub struct MergeEngine {
    git: GitCli,
    remote: String,
}

impl MergeEngine {
    /// Create an engine operating through `git`, synchronizing with `remote`.
    pub fn new(git: GitCli, remote: impl Into<String>) -> Self {
        Self {
            git,
            remote: remote.into(),
        }
    }

    /// Build an engine from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            GitCli::new(&config.repository.path),
            &config.repository.remote,
        )
    }

    pub fn git(&self) -> &GitCli {
        &self.git
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Merge the source branch into the repository's primary branch.
    #[instrument(skip(self, req))]
    pub async fn merge_to_primary(&self, req: &MergeRequest) -> MergeOutcome {
        match self.primary_flow(req).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "merge into primary branch failed");
                MergeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Merge the source branch into `test_branch`, creating it from the
    /// primary branch if it does not exist yet.
    #[instrument(skip(self, req))]
    pub async fn merge_to_test(&self, req: &MergeRequest, test_branch: &str) -> MergeOutcome {
        match self.test_flow(req, test_branch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, test_branch, "merge into test branch failed");
                MergeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Primary-branch flow
    // -----------------------------------------------------------------------

    async fn primary_flow(&self, req: &MergeRequest) -> Result<MergeOutcome, GitError> {
        let resolver = BranchResolver::new(&self.git);

        let source = match &req.source_branch {
            Some(branch) => branch.clone(),
            None => resolver.current_branch().await?,
        };
        let primary = resolver.primary_branch().await?;

        if source == primary {
            info!(branch = %primary, "source is the primary branch, nothing to merge");
            return Ok(MergeOutcome::NoOpAlreadyMerged {
                branch: primary,
                role: TargetRole::Primary,
            });
        }

        if !self.git.is_clean().await? {
            info!("working tree is dirty, aborting");
            return Ok(MergeOutcome::AbortedDirtyTree);
        }

        self.git.checkout(&primary).await?;
        self.sync_with_remote(&primary, RemoteSync::Required).await?;

        self.merge_and_commit(req, &source, &primary).await?;

        let pushed_to = self.maybe_push(req, &primary).await?;

        info!(source = %source, target = %primary, "merged into primary branch");
        Ok(MergeOutcome::Completed {
            source,
            target: primary,
            role: TargetRole::Primary,
            pushed_to,
        })
    }

    // -----------------------------------------------------------------------
    // Test-branch flow
    // -----------------------------------------------------------------------

    async fn test_flow(
        &self,
        req: &MergeRequest,
        test_branch: &str,
    ) -> Result<MergeOutcome, GitError> {
        let resolver = BranchResolver::new(&self.git);

        let source = match &req.source_branch {
            Some(branch) => branch.clone(),
            None => resolver.current_branch().await?,
        };

        if source == test_branch {
            info!(branch = test_branch, "source is the test branch, nothing to merge");
            return Ok(MergeOutcome::NoOpAlreadyMerged {
                branch: test_branch.to_string(),
                role: TargetRole::Test,
            });
        }

        if !self.git.is_clean().await? {
            info!("working tree is dirty, aborting");
            return Ok(MergeOutcome::AbortedDirtyTree);
        }

        // Recovery path, not an error: a missing test branch is created
        // from the primary branch's tip.
        if !self.git.branch_exists(test_branch).await? {
            let primary = resolver.primary_branch().await?;
            info!(test_branch, base = %primary, "test branch missing, creating");
            self.git.create_branch_from(test_branch, &primary).await?;
        }

        self.git.checkout(test_branch).await?;
        self.sync_with_remote(test_branch, RemoteSync::BestEffort)
            .await?;

        self.merge_and_commit(req, &source, test_branch).await?;

        let pushed_to = self.maybe_push(req, test_branch).await?;

        info!(source = %source, target = test_branch, "merged into test branch");
        Ok(MergeOutcome::Completed {
            source,
            target: test_branch.to_string(),
            role: TargetRole::Test,
            pushed_to,
        })
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    /// Pull `branch` from the remote. Under [`RemoteSync::BestEffort`] a
    /// failure is logged and swallowed; under [`RemoteSync::Required`] it
    /// propagates.
    async fn sync_with_remote(&self, branch: &str, policy: RemoteSync) -> Result<(), GitError> {
        match self.git.pull(&self.remote, branch).await {
            Ok(()) => Ok(()),
            Err(e) if policy == RemoteSync::BestEffort => {
                warn!(branch, error = %e, "pull failed, continuing without remote sync");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the merge, plus the separate commit a squash merge without an
    /// explicit message needs.
    async fn merge_and_commit(
        &self,
        req: &MergeRequest,
        source: &str,
        target: &str,
    ) -> Result<(), GitError> {
        // An empty commit message is treated as absent, matching how the
        // tools are called over the wire.
        let message = req.commit_message.as_deref().filter(|m| !m.is_empty());

        self.git.merge(source, req.squash, message).await?;

        if req.squash && message.is_none() {
            self.git
                .commit(&squash_commit_message(source, target))
                .await?;
        }
        Ok(())
    }

    /// Push `target` when the request asks for it. A push failure is a hard
    /// failure.
    async fn maybe_push(
        &self,
        req: &MergeRequest,
        target: &str,
    ) -> Result<Option<String>, GitError> {
        if !req.push {
            return Ok(None);
        }
        self.git.push(&self.remote, target).await?;
        Ok(Some(self.remote.clone()))
    }
}

/// Commit message synthesized for a squash merge without an explicit one.
fn squash_commit_message(source: &str, target: &str) -> String {
    format!("Merge branch '{}' into {}", source, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squash_commit_message() {
        assert_eq!(
            squash_commit_message("feature", "main"),
            "Merge branch 'feature' into main"
        );
        assert_eq!(
            squash_commit_message("fix/login", "test"),
            "Merge branch 'fix/login' into test"
        );
    }

    #[test]
    fn test_engine_from_config_uses_repository_settings() {
        let mut config = AppConfig::default();
        config.repository.path = std::path::PathBuf::from("/srv/repo");
        config.repository.remote = "upstream".into();

        let engine = MergeEngine::from_config(&config);
        assert_eq!(engine.git().repo_path(), std::path::Path::new("/srv/repo"));
        assert_eq!(engine.remote, "upstream");
    }
}
