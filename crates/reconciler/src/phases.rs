//! The canonical phases.

use async_trait::async_trait;
use resume_core::{ChildResource, DynamicObject, Keyed, Readiness, Workload, readiness};
use tracing::{debug, info};

use crate::error::Result;
use crate::phase::Phase;
use crate::reconciler::{RequestFor, WorkloadHandler, WorkloadReconciler};
use crate::recorder::Event;
use crate::request::Request;
use crate::types::PhaseOutcome;

pub const DEPENDENCY: &str = "Dependency";
pub const CREATE_RESOURCES: &str = "Create-Resources";
pub const CHECK_READY: &str = "Check-Ready";
pub const COMPLETE: &str = "Complete";
pub const DELETION_COMPLETE: &str = "DeletionComplete";
/// Condition written while a component's named collection does not exist.
/// No phase runs under this name.
pub const COLLECTION: &str = "Collection";

/// Gate on the kind-specific dependency checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyPhase;

#[async_trait]
impl<H: WorkloadHandler> Phase<H> for DependencyPhase {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome> {
        let ready = reconciler
            .handler()
            .check_dependencies(request, reconciler.store())
            .await?;
        request.workload.status_mut().dependencies_satisfied = ready;

        if ready {
            Ok(PhaseOutcome::Continue)
        } else {
            debug!("Dependencies not satisfied");
            Ok(PhaseOutcome::requeue("dependencies not satisfied"))
        }
    }
}

/// Generate the desired children, pass each through the mutation hook and
/// apply what survives under this reconciler's field manager. Child records
/// for objects this pass did not apply are dropped from the status.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateResourcesPhase;

#[async_trait]
impl<H: WorkloadHandler> Phase<H> for CreateResourcesPhase {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome> {
        let desired = reconciler.handler().generate(request)?;
        let owner = request.workload.to_dynamic()?.controller_reference();
        let namespace = request.workload.meta().namespace.clone();
        let mut skipped = 0usize;

        for object in desired {
            let mutation = reconciler.handler().mutate(request, object).await?;
            if mutation.skip {
                skipped = skipped.saturating_add(1);
                continue;
            }

            for mut object in mutation.objects {
                if object.metadata.namespace.is_empty() {
                    object.metadata.namespace.clone_from(&namespace);
                }
                if !object.metadata.is_owned_by(&owner.uid) {
                    object.metadata.owner_references.push(owner.clone());
                }

                let live = request
                    .context
                    .guard(reconciler.store().apply(object, reconciler.field_manager()))
                    .await?;
                reconciler.registrar().watch_owned(&live.gvk()).await?;
                record_child(request, &live, None);
                request.record_applied(live.object_ref());
            }
        }

        let applied = request.applied().to_vec();
        if request.workload.status_mut().prune_child_resources(&applied) {
            debug!("Forgot children no longer generated");
        }
        debug!(applied = applied.len(), skipped, "Resources applied");
        Ok(PhaseOutcome::Continue)
    }
}

/// Query every child applied in this pass for live readiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckReadyPhase;

#[async_trait]
impl<H: WorkloadHandler> Phase<H> for CheckReadyPhase {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome> {
        let mut waiting = Vec::new();

        for child in request.applied().to_vec() {
            let live = request
                .context
                .guard(reconciler.store().get(&child.gvk, &child.key))
                .await;
            match live {
                Ok(object) => {
                    let state = readiness(&object);
                    if !state.ready {
                        waiting.push(child.to_string());
                    }
                    record_child(request, &object, Some(state));
                }
                Err(err) if err.is_not_found() => {
                    let mut record = ChildResource::new(
                        &child.gvk,
                        child.key.namespace.clone(),
                        child.key.name.clone(),
                    );
                    record.message = "not found".to_string();
                    request.workload.status_mut().set_child_resource(record);
                    waiting.push(child.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        if waiting.is_empty() {
            Ok(PhaseOutcome::Continue)
        } else {
            Ok(PhaseOutcome::requeue(format!("waiting for {}", waiting.join(", "))))
        }
    }
}

/// Mark the object created.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletePhase;

#[async_trait]
impl<H: WorkloadHandler> Phase<H> for CompletePhase {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome> {
        let status = request.workload.status_mut();
        if !status.created {
            status.created = true;
            info!("Workload created");
            reconciler
                .recorder()
                .record(Event::normal(
                    request.workload.object_ref(),
                    "Created",
                    format!("{} child resources applied", request.applied().len()),
                ))
                .await;
        }
        Ok(PhaseOutcome::Continue)
    }
}

/// Run the handler's cleanup, then release the finalizer so the store can
/// finish the deletion. Children are removed by the store through their
/// owner references.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionCompletePhase;

#[async_trait]
impl<H: WorkloadHandler> Phase<H> for DeletionCompletePhase {
    async fn run(
        &self,
        reconciler: &WorkloadReconciler<H>,
        request: &mut RequestFor<H>,
    ) -> Result<PhaseOutcome> {
        reconciler.registrar().forget(&request.workload.key());
        reconciler
            .handler()
            .finalize(request, reconciler.store())
            .await?;

        if request
            .workload
            .meta_mut()
            .remove_finalizer(reconciler.finalizer())
        {
            let object = request.workload.to_dynamic()?;
            request
                .context
                .guard(reconciler.store().update(object))
                .await?;
            info!("Finalizer released");
            reconciler
                .recorder()
                .record(Event::normal(
                    request.workload.object_ref(),
                    "Deleted",
                    "finalizer released",
                ))
                .await;
        }
        Ok(PhaseOutcome::Continue)
    }
}

/// Upsert a child record, keeping its last known readiness unless a fresh
/// one is given.
fn record_child<W: Workload, C: Workload>(
    request: &mut Request<W, C>,
    live: &DynamicObject,
    state: Option<Readiness>,
) {
    let gvk = live.gvk();
    let status = request.workload.status_mut();
    let mut record = ChildResource::new(
        &gvk,
        live.metadata.namespace.clone(),
        live.metadata.name.clone(),
    );
    if let Some(previous) = status.resources.get(&record.key()) {
        record.ready = previous.ready;
        record.message.clone_from(&previous.message);
    }
    record.created = true;
    if let Some(state) = state {
        record.ready = state.ready;
        record.message = state.message;
    }
    status.set_child_resource(record);
}
