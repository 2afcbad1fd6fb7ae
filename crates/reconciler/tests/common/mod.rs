//! Shared fixtures: a minimal collection kind, a component kind bound to it,
//! handlers for both and a watch source that only counts registrations.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use resume_core::{
    CollectionReference, DynamicObject, GroupVersionKind, InMemoryStore, ObjectKey, ObjectMeta,
    ObjectStore, Workload, WorkloadStatus,
};
use resume_reconciler::{
    Error, EventFilter, EventMapper, MemoryRecorder, Mutation, ReconcilerConfig, RequestFor, Result,
    WatchSource, WorkloadHandler, WorkloadReconciler,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const GROUP: &str = "test.operator.dev";
pub const NAMESPACE: &str = "default";

pub fn config_map_gvk() -> GroupVersionKind {
    GroupVersionKind::new("", "v1", "ConfigMap")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfSpec {
    #[serde(default)]
    pub title: String,
}

/// Collection kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelf {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ShelfSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl Shelf {
    pub fn new(name: &str, title: &str) -> Self {
        let gvk = Self::gvk();
        Self {
            api_version: gvk.api_version(),
            kind: gvk.kind,
            metadata: ObjectMeta::new(NAMESPACE, name),
            spec: ShelfSpec {
                title: title.to_string(),
            },
            status: WorkloadStatus::default(),
        }
    }
}

impl Workload for Shelf {
    fn gvk() -> GroupVersionKind {
        GroupVersionKind::new(GROUP, "v1", "Shelf")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn status(&self) -> &WorkloadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut WorkloadStatus {
        &mut self.status
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSpec {
    #[serde(default)]
    pub shelf: CollectionReference,
    #[serde(default)]
    pub pages: u32,
}

/// Component kind; renders one ConfigMap per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BookSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl Book {
    pub fn new(name: &str, shelf: CollectionReference, pages: u32) -> Self {
        let gvk = Self::gvk();
        Self {
            api_version: gvk.api_version(),
            kind: gvk.kind,
            metadata: ObjectMeta::new(NAMESPACE, name),
            spec: BookSpec { shelf, pages },
            status: WorkloadStatus::default(),
        }
    }
}

impl Workload for Book {
    fn gvk() -> GroupVersionKind {
        GroupVersionKind::new(GROUP, "v1", "Book")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn status(&self) -> &WorkloadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut WorkloadStatus {
        &mut self.status
    }

    fn collection_ref(&self) -> Option<&CollectionReference> {
        Some(&self.spec.shelf)
    }
}

#[derive(Debug, Default)]
pub struct ShelfHandler;

#[async_trait]
impl WorkloadHandler for ShelfHandler {
    type Workload = Shelf;
    type Collection = Shelf;

    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>> {
        let shelf = &request.workload;
        let name = format!("{}-config", shelf.metadata.name);
        Ok(vec![
            DynamicObject::new(&config_map_gvk(), &ObjectKey::new("", name))
                .with_field("data", json!({ "title": shelf.spec.title })),
        ])
    }
}

/// Component handler with switchable dependency readiness and a skip list.
#[derive(Debug)]
pub struct BookHandler {
    pub dependencies_ready: AtomicBool,
    pub skip: BTreeSet<String>,
    pub generated: AtomicUsize,
    pub finalized: AtomicUsize,
    pub finalize_fails: AtomicBool,
}

impl Default for BookHandler {
    fn default() -> Self {
        Self {
            dependencies_ready: AtomicBool::new(true),
            skip: BTreeSet::new(),
            generated: AtomicUsize::new(0),
            finalized: AtomicUsize::new(0),
            finalize_fails: AtomicBool::new(false),
        }
    }
}

impl BookHandler {
    pub fn skipping(names: &[&str]) -> Self {
        Self {
            skip: names.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn blocked() -> Self {
        Self {
            dependencies_ready: AtomicBool::new(false),
            ..Self::default()
        }
    }
}

#[async_trait]
impl WorkloadHandler for BookHandler {
    type Workload = Book;
    type Collection = Shelf;

    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        let book = &request.workload;
        let title = request
            .collection
            .as_ref()
            .map(|shelf| shelf.spec.title.clone())
            .unwrap_or_default();

        Ok((1..=book.spec.pages)
            .map(|page| {
                let key = ObjectKey::new("", format!("{}-page-{page}", book.metadata.name));
                DynamicObject::new(&config_map_gvk(), &key)
                    .with_field("data", json!({ "page": page.to_string(), "shelf": title }))
            })
            .collect())
    }

    async fn mutate(&self, _request: &RequestFor<Self>, object: DynamicObject) -> Result<Mutation> {
        if self.skip.contains(&object.metadata.name) {
            return Ok(Mutation::skip());
        }
        Ok(Mutation::keep(object))
    }

    async fn check_dependencies(
        &self,
        _request: &RequestFor<Self>,
        _store: &dyn ObjectStore,
    ) -> Result<bool> {
        Ok(self.dependencies_ready.load(Ordering::SeqCst))
    }

    async fn finalize(&self, request: &RequestFor<Self>, _store: &dyn ObjectStore) -> Result<()> {
        if self.finalize_fails.load(Ordering::SeqCst) {
            return Err(Error::generate(Book::gvk().kind, format!("cannot release {}", request.workload.metadata.name)));
        }
        self.finalized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records which kinds were registered and never delivers anything.
#[derive(Debug, Default)]
pub struct CountingWatchSource {
    registered: Mutex<Vec<GroupVersionKind>>,
}

impl CountingWatchSource {
    pub fn registrations(&self, gvk: &GroupVersionKind) -> usize {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|g| *g == gvk)
            .count()
    }
}

#[async_trait]
impl WatchSource for CountingWatchSource {
    async fn register_watch(
        &self,
        gvk: GroupVersionKind,
        _filter: Arc<dyn EventFilter>,
        _mapper: Arc<dyn EventMapper>,
    ) -> Result<()> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(gvk);
        Ok(())
    }
}

/// A reconciler over a fresh store with in-memory events.
pub struct Harness<H: WorkloadHandler> {
    pub store: Arc<InMemoryStore>,
    pub watches: Arc<CountingWatchSource>,
    pub recorder: Arc<MemoryRecorder>,
    pub reconciler: WorkloadReconciler<H>,
}

impl<H: WorkloadHandler> Harness<H> {
    pub fn new(handler: H) -> Self {
        Self::with_store(InMemoryStore::new_arc(), handler)
    }

    pub fn with_store(store: Arc<InMemoryStore>, handler: H) -> Self {
        let watches = Arc::new(CountingWatchSource::default());
        let recorder = Arc::new(MemoryRecorder::new());
        let reconciler = WorkloadReconciler::new(
            store.clone(),
            Arc::new(handler),
            watches.clone(),
            ReconcilerConfig::default(),
        )
        .with_recorder(recorder.clone());
        Self {
            store,
            watches,
            recorder,
            reconciler,
        }
    }
}

/// Store `workload` and return its key.
pub async fn seed<W: Workload>(store: &InMemoryStore, workload: &W) -> resume_core::Result<ObjectKey> {
    let object = workload.to_dynamic()?;
    Ok(store.create(object).await?.key())
}

pub async fn fetch<W: Workload>(store: &InMemoryStore, key: &ObjectKey) -> resume_core::Result<W> {
    resume_core::get_typed::<W>(store, key).await
}

pub async fn config_maps(store: &InMemoryStore) -> resume_core::Result<Vec<String>> {
    Ok(store
        .list(&config_map_gvk(), None)
        .await?
        .into_iter()
        .map(|o| o.metadata.name)
        .collect())
}
