//! Watch registration: collection-change propagation and owned children.
//!
//! A [`WatchSource`] turns store events into queue keys through an
//! [`EventFilter`] (which events count) and an [`EventMapper`] (which keys
//! they wake). The [`WatchRegistrar`] owns the per-reconciler watch sets so
//! each kind is registered at most once.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use resume_core::{DynamicObject, GroupVersionKind, ObjectKey, WatchEvent};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::error::Result;

/// Decides which watch events are worth a reconciliation.
pub trait EventFilter: Send + Sync {
    fn create(&self, _object: &DynamicObject) -> bool {
        true
    }

    fn update(&self, _old: &DynamicObject, _new: &DynamicObject) -> bool {
        true
    }

    fn delete(&self, _object: &DynamicObject) -> bool {
        true
    }

    fn accepts(&self, event: &WatchEvent) -> bool {
        match event {
            WatchEvent::Added(object) => self.create(object),
            WatchEvent::Modified { old, new } => self.update(old, new),
            WatchEvent::Deleted(object) => self.delete(object),
        }
    }
}

/// Maps an accepted event to the keys that must be reconciled.
pub trait EventMapper: Send + Sync {
    fn map(&self, event: &WatchEvent) -> Vec<ObjectKey>;
}

/// Something that can deliver filtered, mapped watch events to a queue.
#[async_trait]
pub trait WatchSource: Send + Sync {
    /// Start delivering events for `gvk`.
    async fn register_watch(
        &self,
        gvk: GroupVersionKind,
        filter: Arc<dyn EventFilter>,
        mapper: Arc<dyn EventMapper>,
    ) -> Result<()>;
}

/// Only confirmed content changes of a collection count. Creation and
/// deletion do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionChangeFilter;

impl EventFilter for CollectionChangeFilter {
    fn create(&self, _object: &DynamicObject) -> bool {
        false
    }

    fn update(&self, old: &DynamicObject, new: &DynamicObject) -> bool {
        old.key() == new.key() && old.metadata.resource_version != new.metadata.resource_version
    }

    fn delete(&self, _object: &DynamicObject) -> bool {
        false
    }
}

/// Primary watch on the reconciled kind: spec edits and deletion requests.
/// Status-only writes are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadFilter;

impl EventFilter for WorkloadFilter {
    fn update(&self, old: &DynamicObject, new: &DynamicObject) -> bool {
        old.metadata.generation != new.metadata.generation
            || old.metadata.deletion_timestamp != new.metadata.deletion_timestamp
            || old.metadata.labels != new.metadata.labels
            || old.metadata.annotations != new.metadata.annotations
    }
}

/// Generated children: drift and deletion wake the owner; our own creates
/// do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnedResourceFilter;

impl EventFilter for OwnedResourceFilter {
    fn create(&self, _object: &DynamicObject) -> bool {
        false
    }

    fn update(&self, old: &DynamicObject, new: &DynamicObject) -> bool {
        old.metadata.resource_version != new.metadata.resource_version
    }
}

/// Maps an event to the key of the object itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfMapper;

impl EventMapper for SelfMapper {
    fn map(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        vec![event.object().key()]
    }
}

/// Maps a child event to its controlling owner of the given kind.
#[derive(Debug, Clone)]
pub struct OwnerMapper {
    owner: GroupVersionKind,
}

impl OwnerMapper {
    #[must_use]
    pub const fn new(owner: GroupVersionKind) -> Self {
        Self { owner }
    }
}

impl EventMapper for OwnerMapper {
    fn map(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        let child = event.object();
        child
            .metadata
            .controller_owner()
            .filter(|owner| owner.kind == self.owner.kind && owner.api_version == self.owner.api_version())
            .map(|owner| vec![ObjectKey::new(child.metadata.namespace.clone(), owner.name.clone())])
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Bindings {
    by_collection: HashMap<ObjectKey, BTreeSet<ObjectKey>>,
    by_component: HashMap<ObjectKey, ObjectKey>,
}

/// Which components resolved to which collection.
///
/// A component is bound to one collection at a time; resolving a different
/// collection moves the binding.
#[derive(Debug, Default)]
pub struct CollectionBindings {
    inner: Mutex<Bindings>,
}

impl CollectionBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, collection: &ObjectKey, component: &ObjectKey) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = inner
            .by_component
            .insert(component.clone(), collection.clone());
        if let Some(previous) = previous.filter(|p| p != collection) {
            if let Some(components) = inner.by_collection.get_mut(&previous) {
                components.remove(component);
            }
        }
        inner
            .by_collection
            .entry(collection.clone())
            .or_default()
            .insert(component.clone());
    }

    pub fn unbind(&self, component: &ObjectKey) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(collection) = inner.by_component.remove(component) {
            if let Some(components) = inner.by_collection.get_mut(&collection) {
                components.remove(component);
            }
        }
    }

    /// Components currently bound to `collection`, in key order.
    #[must_use]
    pub fn components_of(&self, collection: &ObjectKey) -> Vec<ObjectKey> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_collection
            .get(collection)
            .map(|components| components.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl EventMapper for CollectionBindings {
    fn map(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        self.components_of(&event.object().key())
    }
}

/// Ensures each collection kind and each child kind is watched once per
/// reconciler, no matter how many passes race to register it.
pub struct WatchRegistrar {
    source: Arc<dyn WatchSource>,
    owner: GroupVersionKind,
    collections: AsyncMutex<HashSet<GroupVersionKind>>,
    children: AsyncMutex<HashSet<GroupVersionKind>>,
    bindings: Arc<CollectionBindings>,
}

impl WatchRegistrar {
    /// `owner` is the kind reconciled by the owning reconciler.
    pub fn new(source: Arc<dyn WatchSource>, owner: GroupVersionKind) -> Self {
        Self {
            source,
            owner,
            collections: AsyncMutex::new(HashSet::new()),
            children: AsyncMutex::new(HashSet::new()),
            bindings: Arc::new(CollectionBindings::new()),
        }
    }

    /// Bind `component` to `collection` and make sure edits to that
    /// collection re-enqueue it.
    ///
    /// # Errors
    ///
    /// Fails if the underlying watch cannot be established; the kind is then
    /// not recorded and the next caller retries.
    pub async fn watch_collection(
        &self,
        component: &ObjectKey,
        collection_gvk: &GroupVersionKind,
        collection: &ObjectKey,
    ) -> Result<()> {
        self.bindings.bind(collection, component);

        let mut watched = self.collections.lock().await;
        if watched.contains(collection_gvk) {
            return Ok(());
        }
        let mapper: Arc<dyn EventMapper> = self.bindings.clone();
        self.source
            .register_watch(collection_gvk.clone(), Arc::new(CollectionChangeFilter), mapper)
            .await?;
        watched.insert(collection_gvk.clone());
        info!(collection_kind = %collection_gvk.kind, owner = %self.owner.kind, "Watching collection kind");
        Ok(())
    }

    /// Make sure changes to children of `child_gvk` re-enqueue their owner.
    ///
    /// # Errors
    ///
    /// Fails if the underlying watch cannot be established.
    pub async fn watch_owned(&self, child_gvk: &GroupVersionKind) -> Result<()> {
        let mut watched = self.children.lock().await;
        if watched.contains(child_gvk) {
            return Ok(());
        }
        self.source
            .register_watch(
                child_gvk.clone(),
                Arc::new(OwnedResourceFilter),
                Arc::new(OwnerMapper::new(self.owner.clone())),
            )
            .await?;
        watched.insert(child_gvk.clone());
        debug!(child_kind = %child_gvk.kind, owner = %self.owner.kind, "Watching owned kind");
        Ok(())
    }

    pub fn forget(&self, component: &ObjectKey) {
        self.bindings.unbind(component);
    }

    #[must_use]
    pub fn bindings(&self) -> &CollectionBindings {
        &self.bindings
    }

    pub async fn watched_collection_kinds(&self) -> Vec<GroupVersionKind> {
        self.collections.lock().await.iter().cloned().collect()
    }
}
