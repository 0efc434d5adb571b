//! Transition validation for [`JobStatus`](crate::domain::JobStatus) and
//! [`RunStatus`](crate::domain::RunStatus).
//!
//! Centralizing the allowed-transition tables here means repositories and
//! orchestration code can reject an invalid `update_status` call before it
//! reaches the database, rather than relying on callers to get the order
//! right.

use crate::domain::{JobStatus, RunStatus};

/// Error returned when a state transition is not permitted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("illegal transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// Returns `Ok(())` if moving a job from `from` to `to` is a legal transition.
///
/// # Errors
///
/// Returns [`IllegalTransition`] if the transition is not in the allowed
/// table below.
pub fn validate_job_transition(from: JobStatus, to: JobStatus) -> Result<(), IllegalTransition> {
    use JobStatus::{Clustered, Deduped, Embedded, Extracted, Failed, Fetching, Queued, Scored, SkippedDuplicate, Summarized};

    let allowed = matches!(
        (from, to),
        (Queued, Fetching)
            | (Queued, Failed)
            | (Fetching, Extracted)
            | (Fetching, Failed)
            | (Extracted, Deduped)
            | (Extracted, SkippedDuplicate)
            | (Extracted, Failed)
            | (Deduped, Embedded)
            | (Deduped, Failed)
            | (Embedded, Clustered)
            | (Embedded, Failed)
            | (Clustered, Summarized)
            | (Clustered, Failed)
            | (Summarized, Scored)
            | (Summarized, Failed)
            // Entries that skip embedding/clustering on lower tiers go straight
            // from extraction to a terminal state.
            | (Extracted, Summarized)
            | (Deduped, Summarized)
    );

    if allowed || from == to {
        Ok(())
    } else {
        Err(IllegalTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// Returns `Ok(())` if moving a run from `from` to `to` is a legal transition.
///
/// # Errors
///
/// Returns [`IllegalTransition`] if the transition is not in the allowed
/// table below.
pub fn validate_run_transition(from: RunStatus, to: RunStatus) -> Result<(), IllegalTransition> {
    use RunStatus::{Completed, Failed, Partial, Pending, Running};

    let allowed = matches!(
        (from, to),
        (Pending, Running) | (Running, Completed) | (Running, Failed) | (Running, Partial)
    );

    if allowed {
        Ok(())
    } else {
        Err(IllegalTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}
