//! Reconciliation pass behavior against the in-memory store.
//!
//! Covers collection resolution, phase gating, mutation, idempotence,
//! watch deduplication, deletion and status write conflicts.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{
    Book, BookHandler, CountingWatchSource, Harness, NAMESPACE, Shelf, ShelfHandler, config_map_gvk,
    config_maps, fetch, seed,
};
use futures::future::join_all;
use resume_core::{
    CollectionReference, DynamicObject, GroupVersionKind, InMemoryStore, ObjectKey, ObjectStore,
    PhaseState, WatchStream, Workload,
};
use resume_reconciler::phases::COLLECTION;
use resume_reconciler::{
    Context, Error, MemoryRecorder, ReconcileAction, ReconcilerConfig, RequestFor, WorkloadHandler,
    WorkloadReconciler,
};
use serde_json::json;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn shelf_ref(name: &str) -> CollectionReference {
    CollectionReference::new(NAMESPACE, name)
}

// ==========================================================================
// Collection resolution
// ==========================================================================

#[tokio::test]
async fn given_explicit_reference_when_several_collections_exist_then_named_one_is_used() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    seed(&h.store, &Shelf::new("history", "History")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("history"), 1)).await?;

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    let page = h
        .store
        .get(&config_map_gvk(), &ObjectKey::new(NAMESPACE, "dune-page-1"))
        .await?;
    assert_eq!(page.field(&["data", "shelf"]), Some(&json!("History")));
    Ok(())
}

#[tokio::test]
async fn given_reference_without_namespace_when_resolving_then_component_namespace_is_used() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", CollectionReference::new("", "fiction"), 1)).await?;

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    Ok(())
}

#[tokio::test]
async fn given_empty_reference_and_one_collection_when_reconciling_then_it_is_used() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", CollectionReference::default(), 1)).await?;

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    let book: Book = fetch(&h.store, &key).await?;
    assert!(book.status.created);
    Ok(())
}

#[tokio::test]
async fn given_empty_reference_and_two_collections_when_reconciling_then_count_mismatch() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    seed(&h.store, &Shelf::new("history", "History")).await?;
    let key = seed(&h.store, &Book::new("dune", CollectionReference::default(), 1)).await?;

    let result = h.reconciler.reconcile(&key, Context::background()).await;

    assert!(matches!(result, Err(Error::CollectionCountMismatch { found: 2, .. })));
    assert!(h.recorder.reasons().await.contains(&"AmbiguousCollection".to_string()));
    assert!(config_maps(&h.store).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn given_empty_reference_and_no_collection_when_reconciling_then_count_mismatch() -> TestResult {
    let h = Harness::new(BookHandler::default());
    let key = seed(&h.store, &Book::new("dune", CollectionReference::default(), 1)).await?;

    let result = h.reconciler.reconcile(&key, Context::background()).await;

    assert!(matches!(result, Err(Error::CollectionCountMismatch { found: 0, .. })));
    Ok(())
}

#[tokio::test]
async fn given_missing_named_collection_when_reconciling_then_requeue_without_phases() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("poetry"), 1)).await?;

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Requeue);
    assert_eq!(h.recorder.reasons().await, vec!["CollectionNotFound"]);
    let book: Book = fetch(&h.store, &key).await?;
    assert_eq!(book.status.conditions.len(), 1);
    let waiting = book.status.phase_condition(COLLECTION);
    assert_eq!(waiting.map(|c| c.state), Some(PhaseState::Pending));
    assert!(waiting.is_some_and(|c| c.reason.contains("poetry")));
    assert!(book.metadata.finalizers.is_empty());
    assert_eq!(h.reconciler.handler().generated.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn given_collection_created_later_when_reconciling_again_then_component_completes() -> TestResult {
    let h = Harness::new(BookHandler::default());
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 1)).await?;

    let first = h.reconciler.reconcile(&key, Context::background()).await?;
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let second = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(first, ReconcileAction::Requeue);
    assert_eq!(second, ReconcileAction::Done);
    let book: Book = fetch(&h.store, &key).await?;
    assert_eq!(
        book.status.phase_condition(COLLECTION).map(|c| c.state),
        Some(PhaseState::Complete)
    );
    Ok(())
}

// ==========================================================================
// Phases
// ==========================================================================

#[tokio::test]
async fn given_new_component_when_reconciled_then_every_phase_completes_in_order() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 2)).await?;

    h.reconciler.reconcile(&key, Context::background()).await?;

    let book: Book = fetch(&h.store, &key).await?;
    let phases: Vec<_> = book
        .status
        .conditions
        .iter()
        .map(|c| (c.phase.as_str(), c.state))
        .collect();
    assert_eq!(
        phases,
        vec![
            ("Dependency", PhaseState::Complete),
            ("Create-Resources", PhaseState::Complete),
            ("Check-Ready", PhaseState::Complete),
            ("Complete", PhaseState::Complete),
        ]
    );
    assert!(book.status.created);
    assert!(book.status.dependencies_satisfied);
    assert!(book.status.resources.iter().all(|r| r.created && r.ready));
    assert_eq!(book.metadata.finalizers, vec!["test.operator.dev/finalizer"]);
    assert_eq!(h.recorder.reasons().await, vec!["Created"]);
    Ok(())
}

#[tokio::test]
async fn given_unready_dependencies_when_reconciling_then_requeue_after_interval_without_creating() -> TestResult {
    let h = Harness::new(BookHandler::blocked());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 2)).await?;

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::RequeueAfter(Duration::from_secs(5)));
    let book: Book = fetch(&h.store, &key).await?;
    assert!(!book.status.dependencies_satisfied);
    assert_eq!(
        book.status.phase_condition("Dependency").map(|c| c.state),
        Some(PhaseState::Pending)
    );
    assert!(book.status.phase_condition("Create-Resources").is_none());
    assert!(config_maps(&h.store).await?.is_empty());
    assert_eq!(h.reconciler.handler().generated.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn given_dependencies_become_ready_when_reconciling_again_then_pass_completes() -> TestResult {
    let h = Harness::new(BookHandler::blocked());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 1)).await?;

    h.reconciler.reconcile(&key, Context::background()).await?;
    h.reconciler
        .handler()
        .dependencies_ready
        .store(true, Ordering::SeqCst);
    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    let book: Book = fetch(&h.store, &key).await?;
    assert_eq!(
        book.status.phase_condition("Dependency").map(|c| c.state),
        Some(PhaseState::Complete)
    );
    Ok(())
}

#[tokio::test]
async fn given_mutation_skips_one_of_three_when_reconciling_then_two_are_applied() -> TestResult {
    let h = Harness::new(BookHandler::skipping(&["dune-page-2"]));
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 3)).await?;

    h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(config_maps(&h.store).await?, vec!["dune-page-1", "dune-page-3"]);
    let book: Book = fetch(&h.store, &key).await?;
    let names: Vec<_> = book.status.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["dune-page-1", "dune-page-3"]);
    Ok(())
}

#[tokio::test]
async fn given_fewer_children_generated_when_reconciling_again_then_stale_records_are_dropped() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 3)).await?;
    h.reconciler.reconcile(&key, Context::background()).await?;

    let mut book: Book = fetch(&h.store, &key).await?;
    assert_eq!(book.status.resources.len(), 3);
    book.spec.pages = 1;
    h.store.update(book.to_dynamic()?).await?;
    h.reconciler.reconcile(&key, Context::background()).await?;

    let book: Book = fetch(&h.store, &key).await?;
    let names: Vec<_> = book.status.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["dune-page-1"]);
    Ok(())
}

#[tokio::test]
async fn given_applied_children_then_they_are_owned_and_managed() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 1)).await?;

    h.reconciler.reconcile(&key, Context::background()).await?;

    let book: Book = fetch(&h.store, &key).await?;
    let page = h
        .store
        .get(&config_map_gvk(), &ObjectKey::new(NAMESPACE, "dune-page-1"))
        .await?;
    assert!(page.metadata.is_owned_by(&book.metadata.uid));
    assert_eq!(
        page.metadata.controller_owner().map(|o| o.kind.as_str()),
        Some("Book")
    );
    let managers: Vec<_> = page
        .metadata
        .managed_fields
        .iter()
        .map(|m| m.manager.as_str())
        .collect();
    assert_eq!(managers, vec!["resume-operator-book"]);
    Ok(())
}

// ==========================================================================
// Idempotence
// ==========================================================================

#[tokio::test]
async fn given_reconciled_component_when_reconciled_again_then_store_is_unchanged() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 3)).await?;

    h.reconciler.reconcile(&key, Context::background()).await?;
    let before = h.store.snapshot().await;
    let action = h.reconciler.reconcile(&key, Context::background()).await?;
    let after = h.store.snapshot().await;

    assert_eq!(action, ReconcileAction::Done);
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn given_repeated_passes_then_conditions_and_children_stay_unique() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 3)).await?;

    for _ in 0..4 {
        h.reconciler.reconcile(&key, Context::background()).await?;
    }

    let book: Book = fetch(&h.store, &key).await?;
    assert_eq!(book.status.conditions.len(), 4);
    assert_eq!(book.status.resources.len(), 3);
    assert_eq!(h.recorder.reasons().await, vec!["Created"]);
    Ok(())
}

// ==========================================================================
// Watches
// ==========================================================================

#[tokio::test]
async fn given_many_components_on_one_collection_when_reconciled_concurrently_then_one_watch() -> TestResult {
    let h = Harness::new(BookHandler::default());
    let shelf = seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let mut books = Vec::new();
    for name in ["dune", "emma", "ulysses", "walden"] {
        books.push(seed(&h.store, &Book::new(name, shelf_ref("fiction"), 1)).await?);
    }

    let results = join_all(
        books
            .iter()
            .map(|key| h.reconciler.reconcile(key, Context::background())),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.watches.registrations(&Shelf::gvk()), 1);
    assert_eq!(h.watches.registrations(&config_map_gvk()), 1);
    assert_eq!(h.reconciler.registrar().bindings().components_of(&shelf), books);
    Ok(())
}

// ==========================================================================
// Missing objects and deletion
// ==========================================================================

#[tokio::test]
async fn given_missing_object_when_reconciling_then_done() -> TestResult {
    let h = Harness::new(BookHandler::default());

    let action = h
        .reconciler
        .reconcile(&ObjectKey::new(NAMESPACE, "ghost"), Context::background())
        .await?;

    assert_eq!(action, ReconcileAction::Done);
    assert!(h.recorder.events().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn given_deleted_component_when_reconciled_then_finalizer_released_and_children_removed() -> TestResult {
    let h = Harness::new(BookHandler::default());
    let shelf = seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 2)).await?;
    h.reconciler.reconcile(&key, Context::background()).await?;

    h.store.delete(&Book::gvk(), &key).await?;
    let pending: Book = fetch(&h.store, &key).await?;
    assert!(pending.metadata.is_being_deleted());
    assert_eq!(config_maps(&h.store).await?.len(), 2);

    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    let gone = h.store.get(&Book::gvk(), &key).await;
    assert!(gone.is_err_and(|e| e.is_not_found()));
    assert!(config_maps(&h.store).await?.is_empty());
    assert!(h.reconciler.registrar().bindings().components_of(&shelf).is_empty());
    assert!(h.recorder.reasons().await.contains(&"Deleted".to_string()));
    assert_eq!(h.reconciler.handler().finalized.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn given_failing_cleanup_when_component_is_deleted_then_finalizer_is_kept() -> TestResult {
    let h = Harness::new(BookHandler::default());
    seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 1)).await?;
    h.reconciler.reconcile(&key, Context::background()).await?;

    h.reconciler.handler().finalize_fails.store(true, Ordering::SeqCst);
    h.store.delete(&Book::gvk(), &key).await?;
    let result = h.reconciler.reconcile(&key, Context::background()).await;

    assert!(matches!(result, Err(Error::Generate { .. })));
    let pending: Book = fetch(&h.store, &key).await?;
    assert!(pending.metadata.is_being_deleted());
    assert!(!pending.metadata.finalizers.is_empty());
    assert_eq!(config_maps(&h.store).await?.len(), 1);

    h.reconciler.handler().finalize_fails.store(false, Ordering::SeqCst);
    assert_eq!(h.reconciler.reconcile(&key, Context::background()).await?, ReconcileAction::Done);
    assert!(config_maps(&h.store).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn given_collection_removed_when_component_is_deleted_then_deletion_still_completes() -> TestResult {
    let h = Harness::new(BookHandler::default());
    let shelf = seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let key = seed(&h.store, &Book::new("dune", shelf_ref("fiction"), 1)).await?;
    h.reconciler.reconcile(&key, Context::background()).await?;

    h.store.delete(&Shelf::gvk(), &shelf).await?;
    h.store.delete(&Book::gvk(), &key).await?;
    let action = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    assert!(h.store.is_empty().await);
    Ok(())
}

// ==========================================================================
// Readiness and failures
// ==========================================================================

/// Renders a single Deployment so readiness depends on its status.
struct DeploymentHandler;

fn deployment_gvk() -> GroupVersionKind {
    GroupVersionKind::new("apps", "v1", "Deployment")
}

#[async_trait]
impl WorkloadHandler for DeploymentHandler {
    type Workload = Shelf;
    type Collection = Shelf;

    fn generate(&self, request: &RequestFor<Self>) -> resume_reconciler::Result<Vec<DynamicObject>> {
        let key = ObjectKey::new("", format!("{}-web", request.workload.metadata.name));
        Ok(vec![
            DynamicObject::new(&deployment_gvk(), &key).with_field("spec", json!({ "replicas": 1 })),
        ])
    }
}

#[tokio::test]
async fn given_child_not_ready_when_checking_then_requeue_until_it_reports_ready() -> TestResult {
    let h = Harness::new(DeploymentHandler);
    let key = seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;

    let first = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(first, ReconcileAction::RequeueAfter(Duration::from_secs(5)));
    let shelf: Shelf = fetch(&h.store, &key).await?;
    let check = shelf.status.phase_condition("Check-Ready");
    assert_eq!(check.map(|c| c.state), Some(PhaseState::Pending));
    assert!(check.is_some_and(|c| c.reason.contains("fiction-web")));
    assert!(!shelf.status.created);

    let web = ObjectKey::new(NAMESPACE, "fiction-web");
    let deployment = h
        .store
        .get(&deployment_gvk(), &web)
        .await?
        .with_field("status", json!({ "readyReplicas": 1, "observedGeneration": 1 }));
    h.store.update_status(deployment).await?;

    let second = h.reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(second, ReconcileAction::Done);
    let shelf: Shelf = fetch(&h.store, &key).await?;
    assert!(shelf.status.created);
    assert!(shelf.status.resources.iter().all(|r| r.ready));
    Ok(())
}

struct BrokenHandler;

#[async_trait]
impl WorkloadHandler for BrokenHandler {
    type Workload = Shelf;
    type Collection = Shelf;

    fn generate(&self, _request: &RequestFor<Self>) -> resume_reconciler::Result<Vec<DynamicObject>> {
        Err(Error::generate("Shelf", "title must not be empty"))
    }
}

#[tokio::test]
async fn given_generator_error_when_reconciling_then_failure_is_recorded_and_returned() -> TestResult {
    let h = Harness::new(BrokenHandler);
    let key = seed(&h.store, &Shelf::new("fiction", "")).await?;

    let result = h.reconciler.reconcile(&key, Context::background()).await;

    assert!(matches!(result, Err(Error::Generate { .. })));
    let shelf: Shelf = fetch(&h.store, &key).await?;
    let failed = shelf.status.phase_condition("Create-Resources");
    assert_eq!(failed.map(|c| c.state), Some(PhaseState::Failed));
    assert!(failed.is_some_and(|c| c.reason.contains("title must not be empty")));
    assert!(h.recorder.reasons().await.contains(&"PhaseFailed".to_string()));
    Ok(())
}

#[tokio::test]
async fn given_cancelled_context_when_reconciling_then_cancelled_error() -> TestResult {
    let h = Harness::new(ShelfHandler);
    let key = seed(&h.store, &Shelf::new("fiction", "Fiction")).await?;
    let signal = resume_reconciler::ShutdownSignal::new();
    signal.trigger();

    let result = h.reconciler.reconcile(&key, signal.context()).await;

    assert!(result.is_err_and(|e| e.is_cancelled()));
    assert!(config_maps(&h.store).await?.is_empty());
    Ok(())
}

// ==========================================================================
// Status write conflicts
// ==========================================================================

/// Bumps the target object behind the writer's back on the first status
/// write, so that write conflicts.
struct InterferingStore {
    inner: Arc<InMemoryStore>,
    interfered: AtomicBool,
}

#[async_trait]
impl ObjectStore for InterferingStore {
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> resume_core::Result<DynamicObject> {
        self.inner.get(gvk, key).await
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> resume_core::Result<Vec<DynamicObject>> {
        self.inner.list(gvk, namespace).await
    }

    async fn create(&self, object: DynamicObject) -> resume_core::Result<DynamicObject> {
        self.inner.create(object).await
    }

    async fn update(&self, object: DynamicObject) -> resume_core::Result<DynamicObject> {
        self.inner.update(object).await
    }

    async fn update_status(&self, object: DynamicObject) -> resume_core::Result<DynamicObject> {
        if !self.interfered.swap(true, Ordering::SeqCst) {
            let mut current = self.inner.get(&object.gvk(), &object.key()).await?;
            current
                .metadata
                .labels
                .insert("edited-by".to_string(), "someone-else".to_string());
            self.inner.update(current).await?;
        }
        self.inner.update_status(object).await
    }

    async fn apply(&self, object: DynamicObject, field_manager: &str) -> resume_core::Result<DynamicObject> {
        self.inner.apply(object, field_manager).await
    }

    async fn delete(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> resume_core::Result<()> {
        self.inner.delete(gvk, key).await
    }

    async fn watch(&self, gvk: &GroupVersionKind) -> resume_core::Result<WatchStream> {
        self.inner.watch(gvk).await
    }
}

#[tokio::test]
async fn given_concurrent_edit_when_writing_status_then_write_is_retried_on_latest() -> TestResult {
    let inner = InMemoryStore::new_arc();
    let key = seed(&inner, &Shelf::new("fiction", "Fiction")).await?;
    let store = Arc::new(InterferingStore {
        inner: inner.clone(),
        interfered: AtomicBool::new(false),
    });
    let reconciler = WorkloadReconciler::new(
        store,
        Arc::new(ShelfHandler),
        Arc::new(CountingWatchSource::default()),
        ReconcilerConfig::default(),
    )
    .with_recorder(Arc::new(MemoryRecorder::new()));

    let action = reconciler.reconcile(&key, Context::background()).await?;

    assert_eq!(action, ReconcileAction::Done);
    let shelf: Shelf = fetch(&inner, &key).await?;
    assert!(shelf.status.created);
    assert_eq!(
        shelf.metadata.labels.get("edited-by").map(String::as_str),
        Some("someone-else")
    );
    Ok(())
}

#[tokio::test]
async fn given_no_retries_when_status_write_conflicts_then_conflict_is_returned() -> TestResult {
    let inner = InMemoryStore::new_arc();
    let key = seed(&inner, &Shelf::new("fiction", "Fiction")).await?;
    let store = Arc::new(InterferingStore {
        inner: inner.clone(),
        interfered: AtomicBool::new(false),
    });
    let reconciler = WorkloadReconciler::new(
        store,
        Arc::new(ShelfHandler),
        Arc::new(CountingWatchSource::default()),
        ReconcilerConfig::default().with_status_retries(0),
    );

    let result = reconciler.reconcile(&key, Context::background()).await;

    assert!(result.is_err_and(|e| e.is_conflict()));
    Ok(())
}
