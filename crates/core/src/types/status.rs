//! Status enums for batch runs.

use serde::{Deserialize, Serialize};

/// Pipeline stage of one entity inside a batch run.
///
/// ```text
/// pending -> generating -> generated -> committing -> tagged
///                 |                          |
///                 v                          v
///          generation_failed           commit_failed
/// ```
///
/// There is no transition back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    #[default]
    Pending,
    Generating,
    Generated,
    Committing,
    Tagged,
    GenerationFailed,
    CommitFailed,
}

impl ItemStage {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Tagged | Self::GenerationFailed | Self::CommitFailed)
    }

    /// Whether `next` is a legal successor of this stage.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Generating, Self::Generated | Self::GenerationFailed)
                | (Self::Generated, Self::Committing)
                | (Self::Committing, Self::Tagged | Self::CommitFailed)
        )
    }

    /// Outcome reported for a terminal stage.
    #[must_use]
    pub const fn outcome(self) -> Option<BatchOutcome> {
        match self {
            Self::Tagged => Some(BatchOutcome::Optimized),
            Self::GenerationFailed | Self::CommitFailed => Some(BatchOutcome::Failed),
            _ => None,
        }
    }
}

/// Final outcome of one entity, as reported to the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Content generated, committed and tagged.
    Optimized,
    /// Generation or commit failed; the entity stays eligible for a later run.
    Failed,
    /// Excluded by the selection filter; never entered the pipeline.
    Skipped,
}

impl std::fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimized => write!(f, "optimized"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
