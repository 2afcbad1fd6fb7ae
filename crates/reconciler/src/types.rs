//! Core types for phase execution.

use std::fmt;
use std::time::Duration;

use resume_core::{DynamicObject, Workload};

/// Which phase sequence a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Create,
    Update,
    Delete,
}

impl EventClass {
    /// Deleting objects take the delete path; objects that never reached
    /// `status.created` are still being created.
    pub fn of<W: Workload>(workload: &W) -> Self {
        if workload.meta().is_being_deleted() {
            Self::Delete
        } else if workload.status().created {
            Self::Update
        } else {
            Self::Create
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// What a single phase asks the executor to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Advance to the next phase in this pass.
    Continue,
    /// Abort the pass and try again. The registry may attach a fixed delay.
    Requeue { reason: String },
    /// Abort the pass and try again no sooner than `after`.
    RequeueAfter { after: Duration, reason: String },
    /// Abort the pass without scheduling another one.
    Stop { reason: String },
}

impl PhaseOutcome {
    pub fn requeue(reason: impl Into<String>) -> Self {
        Self::Requeue {
            reason: reason.into(),
        }
    }

    pub fn requeue_after(after: Duration, reason: impl Into<String>) -> Self {
        Self::RequeueAfter {
            after,
            reason: reason.into(),
        }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self::Stop {
            reason: reason.into(),
        }
    }
}

/// Verdict of one reconciliation pass, handed to the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing more to do until the next watch event.
    Done,
    /// Run again soon, subject to the queue's rate limiter.
    Requeue,
    /// Run again once, no sooner than the given delay.
    RequeueAfter(Duration),
}

impl ReconcileAction {
    #[must_use]
    pub const fn is_requeue(&self) -> bool {
        !matches!(self, Self::Done)
    }
}

/// Result of a mutation hook for one generated object.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub objects: Vec<DynamicObject>,
    pub skip: bool,
}

impl Mutation {
    /// Apply the object unchanged.
    #[must_use]
    pub fn keep(object: DynamicObject) -> Self {
        Self {
            objects: vec![object],
            skip: false,
        }
    }

    /// Apply these objects instead.
    #[must_use]
    pub const fn replace(objects: Vec<DynamicObject>) -> Self {
        Self {
            objects,
            skip: false,
        }
    }

    /// Drop the object.
    #[must_use]
    pub const fn skip() -> Self {
        Self {
            objects: Vec::new(),
            skip: true,
        }
    }
}
