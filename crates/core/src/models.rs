//! Domain model types shared by the merge engine, MCP server, and CLI.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Merge request
// ---------------------------------------------------------------------------

/// Input to a merge operation.
///
/// The source branch defaults to the currently checked-out branch at call
/// time; the target is chosen by the operation (primary branch or a named
/// test branch).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Source branch; current branch when not given.
    #[serde(default)]
    pub source_branch: Option<String>,

    /// Merge commit message.
    #[serde(default)]
    pub commit_message: Option<String>,

    /// Condense the source branch's history into a single change.
    #[serde(default)]
    pub squash: bool,

    /// Push the target branch to the remote after a successful merge.
    #[serde(default)]
    pub push: bool,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Which role the target branch plays; affects message wording only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Primary,
    Test,
}

impl std::fmt::Display for TargetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Result of a merge operation.
///
/// One tagged type covers the three outcome families the tools can report:
/// success, benign no-op, and failure. The boundary layers render these to
/// prose; the engine and tests work with the variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// The merge ran to completion.
    Completed {
        source: String,
        target: String,
        role: TargetRole,
        /// Remote the target was pushed to, when a push was requested.
        pushed_to: Option<String>,
    },

    /// Source and target are the same branch; nothing was done.
    NoOpAlreadyMerged { branch: String, role: TargetRole },

    /// The working tree had uncommitted changes; nothing was done.
    AbortedDirtyTree,

    /// A step failed; `reason` carries the underlying error text.
    Failed { reason: String },
}

impl MergeOutcome {
    /// Human-readable status line for the tool/CLI boundary.
    pub fn render(&self) -> String {
        match self {
            Self::Completed {
                source,
                target,
                role,
                pushed_to,
            } => match pushed_to {
                Some(remote) => format!(
                    "merged branch '{}' into {} branch '{}' and pushed to '{}'",
                    source, role, target, remote
                ),
                None => format!("merged branch '{}' into {} branch '{}'", source, role, target),
            },
            Self::NoOpAlreadyMerged { branch, role } => {
                format!("already on {} branch '{}', no merge needed", role, branch)
            }
            Self::AbortedDirtyTree => {
                "uncommitted changes present; commit or stash first".to_string()
            }
            Self::Failed { reason } => format!("merge failed: {}", reason),
        }
    }

    /// Whether this outcome is a hard failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_completed() {
        let outcome = MergeOutcome::Completed {
            source: "feature".into(),
            target: "main".into(),
            role: TargetRole::Primary,
            pushed_to: None,
        };
        assert_eq!(
            outcome.render(),
            "merged branch 'feature' into primary branch 'main'"
        );
    }

    #[test]
    fn test_render_completed_with_push() {
        let outcome = MergeOutcome::Completed {
            source: "feature".into(),
            target: "test".into(),
            role: TargetRole::Test,
            pushed_to: Some("origin".into()),
        };
        assert_eq!(
            outcome.render(),
            "merged branch 'feature' into test branch 'test' and pushed to 'origin'"
        );
    }

    #[test]
    fn test_render_noop() {
        let outcome = MergeOutcome::NoOpAlreadyMerged {
            branch: "main".into(),
            role: TargetRole::Primary,
        };
        assert_eq!(
            outcome.render(),
            "already on primary branch 'main', no merge needed"
        );
    }

    #[test]
    fn test_render_dirty_tree() {
        assert_eq!(
            MergeOutcome::AbortedDirtyTree.render(),
            "uncommitted changes present; commit or stash first"
        );
    }

    #[test]
    fn test_render_failed_is_prefixed() {
        let outcome = MergeOutcome::Failed {
            reason: "no primary branch found".into(),
        };
        assert_eq!(outcome.render(), "merge failed: no primary branch found");
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_request_defaults() {
        let req: MergeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.source_branch.is_none());
        assert!(req.commit_message.is_none());
        assert!(!req.squash);
        assert!(!req.push);
    }
}
