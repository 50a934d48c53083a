use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use baselog_registry::{Inclusion, TransactionHandle};
use baselog_types::{ContentId, JournalMetadata};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Coarse position of the pipeline in the commit state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Uploading,
    Signing,
    Confirming,
    Success,
    Failed,
}

impl Phase {
    /// Returns `true` for the three phases that hold the busy flag.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Uploading | Self::Signing | Self::Confirming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Signing => "signing",
            Self::Confirming => "confirming",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// Immutable context of one commit attempt, shared by every state the
/// attempt passes through.
#[derive(Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Monotonic attempt number within one pipeline, starting at 1.
    pub seq: u64,
    pub metadata: JournalMetadata,
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Observable state of the commit pipeline.
///
/// Each variant carries exactly the data that exists at that point: a
/// content id only once the upload succeeded, a transaction handle only
/// once the write was submitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PipelineState {
    #[default]
    Idle,
    Uploading {
        attempt: Arc<Attempt>,
    },
    Signing {
        attempt: Arc<Attempt>,
        content_id: ContentId,
    },
    Confirming {
        attempt: Arc<Attempt>,
        content_id: ContentId,
        transaction: TransactionHandle,
    },
    Success {
        attempt: Arc<Attempt>,
        content_id: ContentId,
        transaction: TransactionHandle,
        inclusion: Inclusion,
    },
    Failed {
        attempt: Arc<Attempt>,
        /// Phase the error occurred in.
        at: Phase,
        error: PipelineError,
        content_id: Option<ContentId>,
        transaction: Option<TransactionHandle>,
    },
}

impl PipelineState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Uploading { .. } => Phase::Uploading,
            Self::Signing { .. } => Phase::Signing,
            Self::Confirming { .. } => Phase::Confirming,
            Self::Success { .. } => Phase::Success,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_active()
    }

    pub fn attempt(&self) -> Option<&Arc<Attempt>> {
        match self {
            Self::Idle => None,
            Self::Uploading { attempt }
            | Self::Signing { attempt, .. }
            | Self::Confirming { attempt, .. }
            | Self::Success { attempt, .. }
            | Self::Failed { attempt, .. } => Some(attempt),
        }
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        match self {
            Self::Signing { content_id, .. }
            | Self::Confirming { content_id, .. }
            | Self::Success { content_id, .. } => Some(content_id),
            Self::Failed { content_id, .. } => content_id.as_ref(),
            Self::Idle | Self::Uploading { .. } => None,
        }
    }

    /// Handle of a submitted write that has not yet been included.
    pub fn pending_transaction(&self) -> Option<&TransactionHandle> {
        match self {
            Self::Confirming { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    /// Handle of the write in any state that has one.
    pub fn transaction(&self) -> Option<&TransactionHandle> {
        match self {
            Self::Confirming { transaction, .. } | Self::Success { transaction, .. } => {
                Some(transaction)
            }
            Self::Failed { transaction, .. } => transaction.as_ref(),
            _ => None,
        }
    }

    /// The last failure and the phase it occurred in.
    pub fn last_error(&self) -> Option<(Phase, &PipelineError)> {
        match self {
            Self::Failed { at, error, .. } => Some((*at, error)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CommitOutcome
// ---------------------------------------------------------------------------

/// Timing of one completed pipeline step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub phase: Phase,
    pub elapsed: Duration,
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub content_id: ContentId,
    pub transaction: TransactionHandle,
    pub inclusion: Inclusion,
    /// Per-step results in execution order.
    pub steps: Vec<StepResult>,
    /// Total wall-clock time for the commit.
    pub elapsed: Duration,
}
