//! Phase registry and executor.
//!
//! Phases are registered per event class and run strictly in registration
//! order. Each phase either advances the pass, stops it, asks for a requeue
//! (aborting the remaining phases), or fails it. Every outcome is recorded
//! as a phase condition on the object's status; the delete path records
//! nothing because the object is going away.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resume_core::{PhaseState, Workload};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::phases::{
    CHECK_READY, COMPLETE, CREATE_RESOURCES, CheckReadyPhase, CompletePhase, CreateResourcesPhase,
    DELETION_COMPLETE, DEPENDENCY, DeletionCompletePhase, DependencyPhase,
};
use crate::reconciler::{RequestFor, WorkloadHandler, WorkloadReconciler};
use crate::recorder::Event;
use crate::types::{EventClass, PhaseOutcome, ReconcileAction};

/// One named, idempotent step of a reconciliation pass.
#[async_trait]
pub trait Phase<H: WorkloadHandler>: Send + Sync {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome>;
}

struct PhaseEntry<H: WorkloadHandler> {
    name: String,
    event: EventClass,
    phase: Arc<dyn Phase<H>>,
    requeue_after: Option<Duration>,
}

/// Ordered phases per event class.
pub struct PhaseRegistry<H: WorkloadHandler> {
    entries: Vec<PhaseEntry<H>>,
}

impl<H: WorkloadHandler> Default for PhaseRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: WorkloadHandler> PhaseRegistry<H> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The canonical sequences: Dependency, Create-Resources, Check-Ready
    /// and Complete for create and update; DeletionComplete for delete.
    /// Dependency and Check-Ready requeue after `requeue_interval`.
    #[must_use]
    pub fn standard(requeue_interval: Duration) -> Self {
        let mut registry = Self::new();
        for event in [EventClass::Create, EventClass::Update] {
            registry
                .register_with_requeue(DEPENDENCY, Arc::new(DependencyPhase), event, requeue_interval)
                .register(CREATE_RESOURCES, Arc::new(CreateResourcesPhase), event)
                .register_with_requeue(CHECK_READY, Arc::new(CheckReadyPhase), event, requeue_interval)
                .register(COMPLETE, Arc::new(CompletePhase), event);
        }
        registry.register(DELETION_COMPLETE, Arc::new(DeletionCompletePhase), EventClass::Delete);
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        phase: Arc<dyn Phase<H>>,
        event: EventClass,
    ) -> &mut Self {
        self.entries.push(PhaseEntry {
            name: name.into(),
            event,
            phase,
            requeue_after: None,
        });
        self
    }

    /// Register a phase whose plain [`PhaseOutcome::Requeue`] becomes a
    /// requeue after the fixed delay `after`.
    pub fn register_with_requeue(
        &mut self,
        name: impl Into<String>,
        phase: Arc<dyn Phase<H>>,
        event: EventClass,
        after: Duration,
    ) -> &mut Self {
        self.entries.push(PhaseEntry {
            name: name.into(),
            event,
            phase,
            requeue_after: Some(after),
        });
        self
    }

    /// Phase names for an event class, in execution order.
    #[must_use]
    pub fn names(&self, event: EventClass) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.event == event)
            .map(|e| e.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the phases registered for the request's event class.
    ///
    /// # Errors
    ///
    /// The first phase error aborts the pass and is returned unchanged,
    /// after a `Failed` condition is recorded. Status write failures are
    /// returned as well.
    pub async fn handle_execution(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<ReconcileAction> {
        let event = EventClass::of(&request.workload);
        let tracks_status = event != EventClass::Delete;
        let context = request.context.clone();
        debug!(%event, phases = ?self.names(event), "Executing phases");

        for entry in self.entries.iter().filter(|e| e.event == event) {
            let outcome = match context.guard(entry.phase.run(reconciler, request)).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(phase = %entry.name, %event, error = %err, "Phase failed");
                    if tracks_status && !err.is_cancelled() {
                        request.workload.status_mut().set_phase_condition(
                            &entry.name,
                            PhaseState::Failed,
                            err.to_string(),
                        );
                        if let Err(write_err) = reconciler.write_status(request).await {
                            warn!(phase = %entry.name, error = %write_err, "Could not record phase failure");
                        }
                    }
                    if !err.is_cancelled() {
                        reconciler
                            .recorder()
                            .record(Event::warning(
                                request.workload.object_ref(),
                                "PhaseFailed",
                                format!("{}: {err}", entry.name),
                            ))
                            .await;
                    }
                    return Err(err);
                }
            };

            let (state, reason, verdict) = match outcome {
                PhaseOutcome::Continue => (PhaseState::Complete, String::new(), None),
                PhaseOutcome::Requeue { reason } => {
                    let action = entry
                        .requeue_after
                        .map_or(ReconcileAction::Requeue, ReconcileAction::RequeueAfter);
                    (PhaseState::Pending, reason, Some(action))
                }
                PhaseOutcome::RequeueAfter { after, reason } => (
                    PhaseState::Pending,
                    reason,
                    Some(ReconcileAction::RequeueAfter(after)),
                ),
                PhaseOutcome::Stop { reason } => {
                    (PhaseState::Complete, reason, Some(ReconcileAction::Done))
                }
            };

            if tracks_status {
                request
                    .workload
                    .status_mut()
                    .set_phase_condition(&entry.name, state, reason.as_str());
                reconciler.write_status(request).await?;
            }

            if let Some(action) = verdict {
                info!(phase = %entry.name, %event, ?action, reason = %reason, "Pass ended early");
                return Ok(action);
            }
            debug!(phase = %entry.name, %event, "Phase complete");
        }

        Ok(ReconcileAction::Done)
    }
}
