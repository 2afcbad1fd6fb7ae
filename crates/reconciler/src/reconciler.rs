//! Reconciler implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resume_core::{DynamicObject, ObjectKey, ObjectStore, PhaseState, Workload, get_typed};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::collection::resolve_collection;
use crate::error::{Error, Result};
use crate::phase::PhaseRegistry;
use crate::phases::COLLECTION;
use crate::recorder::{Event, EventRecorder, TracingRecorder};
use crate::request::{Context, Request};
use crate::types::{Mutation, ReconcileAction};
use crate::watch::{WatchRegistrar, WatchSource};

/// The request type seen by a handler's hooks.
pub type RequestFor<H> =
    Request<<H as WorkloadHandler>::Workload, <H as WorkloadHandler>::Collection>;

/// Per-kind hooks: resource generation, mutation and dependency readiness.
///
/// Collection kinds set `Collection = Self::Workload`; their requests never
/// carry a collection.
#[async_trait]
pub trait WorkloadHandler: Send + Sync + 'static {
    type Workload: Workload;
    type Collection: Workload;

    /// Compute the desired children. Must be deterministic.
    ///
    /// # Errors
    ///
    /// A generator error aborts the pass.
    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>>;

    /// Last-mile adjustment or suppression of one generated object.
    ///
    /// # Errors
    ///
    /// A mutation error aborts the pass.
    async fn mutate(&self, request: &RequestFor<Self>, object: DynamicObject) -> Result<Mutation> {
        let _ = request;
        Ok(Mutation::keep(object))
    }

    /// Whether everything this object depends on is ready.
    ///
    /// # Errors
    ///
    /// Errors are fatal for the pass; "not ready" must be `Ok(false)`.
    async fn check_dependencies(
        &self,
        request: &RequestFor<Self>,
        store: &dyn ObjectStore,
    ) -> Result<bool> {
        let _ = (request, store);
        Ok(true)
    }

    /// Clean up what owner references do not cover, such as this object's
    /// entry in a child it shares with others. Runs on deletion before the
    /// finalizer is released.
    ///
    /// # Errors
    ///
    /// An error keeps the finalizer in place and the deletion is retried.
    async fn finalize(&self, request: &RequestFor<Self>, store: &dyn ObjectStore) -> Result<()> {
        let _ = (request, store);
        Ok(())
    }
}

/// Configuration for a workload reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Fixed delay used by the Dependency and Check-Ready phases.
    pub requeue_interval: Duration,
    /// Attempts at writing status before a conflict is surfaced.
    pub status_retries: u32,
    /// Prefix of the field manager identity used for apply.
    pub field_manager_prefix: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            requeue_interval: Duration::from_secs(5),
            status_retries: 5,
            field_manager_prefix: "resume-operator".to_string(),
        }
    }
}

impl ReconcilerConfig {
    #[must_use]
    pub const fn with_requeue_interval(mut self, interval: Duration) -> Self {
        self.requeue_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_status_retries(mut self, retries: u32) -> Self {
        self.status_retries = retries;
        self
    }

    #[must_use]
    pub fn with_field_manager_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_manager_prefix = prefix.into();
        self
    }
}

/// Reconciles one object kind: builds the request, resolves and watches the
/// collection, installs the finalizer and runs the phases.
pub struct WorkloadReconciler<H: WorkloadHandler> {
    store: Arc<dyn ObjectStore>,
    handler: Arc<H>,
    registrar: WatchRegistrar,
    phases: PhaseRegistry<H>,
    recorder: Arc<dyn EventRecorder>,
    config: ReconcilerConfig,
    field_manager: String,
    finalizer: String,
}

impl<H: WorkloadHandler> WorkloadReconciler<H> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        handler: Arc<H>,
        watches: Arc<dyn WatchSource>,
        config: ReconcilerConfig,
    ) -> Self {
        let gvk = H::Workload::gvk();
        let field_manager = format!(
            "{}-{}",
            config.field_manager_prefix,
            gvk.kind.to_lowercase()
        );
        let finalizer = format!("{}/finalizer", gvk.group);
        Self {
            store,
            handler,
            registrar: WatchRegistrar::new(watches, gvk),
            phases: PhaseRegistry::standard(config.requeue_interval),
            recorder: Arc::new(TracingRecorder),
            config,
            field_manager,
            finalizer,
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Replace the canonical phase sequences.
    #[must_use]
    pub fn with_phases(mut self, phases: PhaseRegistry<H>) -> Self {
        self.phases = phases;
        self
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub const fn registrar(&self) -> &WatchRegistrar {
        &self.registrar
    }

    pub fn recorder(&self) -> &dyn EventRecorder {
        self.recorder.as_ref()
    }

    pub const fn phases(&self) -> &PhaseRegistry<H> {
        &self.phases
    }

    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Identity under which children are applied.
    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }

    pub fn finalizer(&self) -> &str {
        &self.finalizer
    }

    /// Run one reconciliation pass for `key`.
    ///
    /// A vanished object is treated as already deleted. An explicit
    /// collection reference that matches nothing yet requeues the request
    /// without running any phase.
    ///
    /// # Errors
    ///
    /// Any other failure is returned for the caller's retry policy.
    pub async fn reconcile(&self, key: &ObjectKey, context: Context) -> Result<ReconcileAction> {
        let kind = H::Workload::gvk().kind;
        let span = info_span!("reconcile", kind = %kind, name = %key.name, namespace = %key.namespace);
        self.reconcile_in(key, context, span.clone())
            .instrument(span)
            .await
    }

    async fn reconcile_in(
        &self,
        key: &ObjectKey,
        context: Context,
        span: tracing::Span,
    ) -> Result<ReconcileAction> {
        let mut request = match self.new_request(key, context.clone(), span.clone()).await {
            Ok(request) => request,
            Err(err) if err.is_not_found() => {
                debug!("Object no longer exists");
                return Ok(ReconcileAction::Done);
            }
            Err(err @ Error::CollectionNotFound { .. }) => {
                info!(error = %err, "Collection not found yet, requeueing");
                self.recorder
                    .record(Event::warning(
                        resume_core::ObjectRef::new(H::Workload::gvk(), key.clone()),
                        "CollectionNotFound",
                        err.to_string(),
                    ))
                    .await;
                if let Err(status_err) =
                    self.record_missing_collection(key, context, span, &err).await
                {
                    warn!(error = %status_err, "Could not record missing collection");
                }
                return Ok(ReconcileAction::Requeue);
            }
            Err(err) => {
                if matches!(err, Error::CollectionCountMismatch { .. }) {
                    self.recorder
                        .record(Event::warning(
                            resume_core::ObjectRef::new(H::Workload::gvk(), key.clone()),
                            "AmbiguousCollection",
                            err.to_string(),
                        ))
                        .await;
                }
                return Err(err);
            }
        };

        let status = request.workload.status_mut();
        if status
            .phase_condition(COLLECTION)
            .is_some_and(|condition| condition.state != PhaseState::Complete)
        {
            status.set_phase_condition(COLLECTION, PhaseState::Complete, "");
        }

        self.register_delete_hooks(&mut request).await?;
        self.phases.handle_execution(self, &mut request).await
    }

    /// Fetch the object and, for components, resolve and watch its
    /// collection.
    async fn new_request(
        &self,
        key: &ObjectKey,
        context: Context,
        span: tracing::Span,
    ) -> Result<RequestFor<H>> {
        let workload: H::Workload = context
            .guard(get_typed::<H::Workload>(self.store.as_ref(), key))
            .await?;

        let Some(reference) = workload.collection_ref() else {
            return Ok(Request::new(workload, None, context, span));
        };
        let reference = reference.or_namespace(&workload.meta().namespace);

        let resolved =
            resolve_collection::<H::Collection>(self.store.as_ref(), &reference, &context).await;
        let collection = match resolved {
            Ok(collection) => collection,
            Err(
                err @ (Error::CollectionNotFound { .. } | Error::CollectionCountMismatch { .. }),
            ) if workload.meta().is_being_deleted() => {
                debug!(error = %err, "Collection gone, continuing deletion without it");
                return Ok(Request::new(workload, None, context, span));
            }
            Err(err) => return Err(err),
        };

        self.registrar
            .watch_collection(&workload.key(), &H::Collection::gvk(), &collection.key())
            .await?;
        Ok(Request::new(workload, Some(collection), context, span))
    }

    /// Mark the object Pending on its collection, so the wait shows in its
    /// status and not only as an event.
    async fn record_missing_collection(
        &self,
        key: &ObjectKey,
        context: Context,
        span: tracing::Span,
        err: &Error,
    ) -> Result<()> {
        let workload: H::Workload = context
            .guard(get_typed::<H::Workload>(self.store.as_ref(), key))
            .await?;
        let mut request: RequestFor<H> = Request::new(workload, None, context, span);
        request
            .workload
            .status_mut()
            .set_phase_condition(COLLECTION, PhaseState::Pending, err.to_string());
        self.write_status(&mut request).await
    }

    /// Add the finalizer before any phase runs so deletion always goes
    /// through DeletionComplete.
    async fn register_delete_hooks(&self, request: &mut RequestFor<H>) -> Result<()> {
        if request.workload.meta().is_being_deleted()
            || !request.workload.meta_mut().add_finalizer(&self.finalizer)
        {
            return Ok(());
        }
        let object = request.workload.to_dynamic()?;
        let written = request.context.guard(self.store.update(object)).await?;
        let status = request.workload.status().clone();
        request.workload = H::Workload::from_dynamic(&written)?;
        *request.workload.status_mut() = status;
        debug!(finalizer = %self.finalizer, "Finalizer added");
        Ok(())
    }

    /// Persist the request's status if it changed, re-fetching and
    /// reapplying on write conflicts.
    ///
    /// # Errors
    ///
    /// Returns the conflict once `status_retries` attempts are exhausted, or
    /// any other store error immediately.
    pub async fn write_status(&self, request: &mut RequestFor<H>) -> Result<()> {
        if !request.status_dirty() {
            return Ok(());
        }
        let desired = request.workload.status().clone();
        let mut attempt = 0u32;

        loop {
            let object = request.workload.to_dynamic()?;
            match request.context.guard(self.store.update_status(object)).await {
                Ok(written) => {
                    request.workload.meta_mut().resource_version = written.metadata.resource_version;
                    request.mark_persisted();
                    return Ok(());
                }
                Err(err) if err.is_conflict() && attempt < self.config.status_retries => {
                    attempt = attempt.saturating_add(1);
                    warn!(attempt, "Status write conflicted, retrying on latest version");
                    let key = request.workload.key();
                    let mut latest: H::Workload = request
                        .context
                        .guard(get_typed::<H::Workload>(self.store.as_ref(), &key))
                        .await?;
                    *latest.status_mut() = desired.clone();
                    request.workload = latest;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
