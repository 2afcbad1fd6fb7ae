//! Object store contract and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures::Stream;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gvk::{GroupVersionKind, ObjectKey, ObjectRef};
use crate::object::{DynamicObject, ManagedFieldsEntry};
use crate::workload::Workload;

const DEFAULT_WATCH_CAPACITY: usize = 1024;

/// A change observed on one object.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Added(DynamicObject),
    Modified {
        old: DynamicObject,
        new: DynamicObject,
    },
    Deleted(DynamicObject),
}

impl WatchEvent {
    /// The object as it is after the event.
    #[must_use]
    pub const fn object(&self) -> &DynamicObject {
        match self {
            Self::Added(object) | Self::Deleted(object) => object,
            Self::Modified { new, .. } => new,
        }
    }
}

/// Stream of events for a single kind.
pub struct WatchStream {
    gvk: GroupVersionKind,
    rx: broadcast::Receiver<WatchEvent>,
}

impl WatchStream {
    #[must_use]
    pub const fn new(gvk: GroupVersionKind, rx: broadcast::Receiver<WatchEvent>) -> Self {
        Self { gvk, rx }
    }

    #[must_use]
    pub const fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Next event for the watched kind, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.object().gvk() == self.gvk => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(kind = %self.gvk.kind, skipped, "Watch fell behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = WatchEvent> + Send {
        futures::stream::unfold(self, |mut watch| async move {
            watch.next().await.map(|event| (event, watch))
        })
    }
}

/// Versioned object store: the single source of truth for every object.
///
/// Writes are optimistic: an object carrying a `resourceVersion` is only
/// written if it still matches the stored one.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<DynamicObject>;

    /// List objects of a kind, optionally restricted to one namespace.
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject>;

    /// Replace everything except `status`.
    async fn update(&self, object: DynamicObject) -> Result<DynamicObject>;

    /// Replace only `status`.
    async fn update_status(&self, object: DynamicObject) -> Result<DynamicObject>;

    /// Create the object if absent, otherwise merge the given fields into it
    /// on behalf of `field_manager`. Applying content that is already
    /// present is a no-op.
    ///
    /// The merge only adds and overwrites. Map keys the object has but the
    /// applied fields lack are kept, whichever manager wrote them; arrays and
    /// scalars are replaced whole. Removing a key takes an `update`.
    async fn apply(&self, object: DynamicObject, field_manager: &str) -> Result<DynamicObject>;

    /// Delete an object. While finalizers remain the object is only marked
    /// with a `deletionTimestamp`.
    async fn delete(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<()>;

    async fn watch(&self, gvk: &GroupVersionKind) -> Result<WatchStream>;
}

/// Fetch and parse a typed object.
///
/// # Errors
///
/// Propagates store errors and parse failures.
pub async fn get_typed<W: Workload>(store: &dyn ObjectStore, key: &ObjectKey) -> Result<W> {
    let object = store.get(&W::gvk(), key).await?;
    W::from_dynamic(&object)
}

/// List and parse typed objects.
///
/// # Errors
///
/// Propagates store errors and parse failures.
pub async fn list_typed<W: Workload>(
    store: &dyn ObjectStore,
    namespace: Option<&str>,
) -> Result<Vec<W>> {
    store
        .list(&W::gvk(), namespace)
        .await?
        .iter()
        .map(W::from_dynamic)
        .collect()
}

/// In-memory store with watch support.
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<ObjectRef, DynamicObject>>,
    revision: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

type Objects = BTreeMap<ObjectRef, DynamicObject>;

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    /// Create a store whose watchers may fall `capacity` events behind
    /// before events are dropped.
    #[must_use]
    pub fn with_watch_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            objects: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
            events,
        }
    }

    #[must_use]
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Every stored object, ordered by kind then namespaced name.
    pub async fn snapshot(&self) -> Vec<DynamicObject> {
        self.objects.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn next_revision(&self) -> String {
        self.revision
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
            .to_string()
    }

    fn publish(&self, event: WatchEvent) {
        // No receivers is fine: nobody is watching yet.
        self.events.send(event).ok();
    }

    fn insert_new(&self, objects: &mut Objects, mut object: DynamicObject) -> DynamicObject {
        object.metadata.uid = Uuid::new_v4().to_string();
        object.metadata.resource_version = self.next_revision();
        object.metadata.generation = 1;
        object.metadata.creation_timestamp = Some(Utc::now());
        object.metadata.deletion_timestamp = None;
        debug!(kind = %object.kind, key = %object.key(), "Object created");
        objects.insert(object.object_ref(), object.clone());
        self.publish(WatchEvent::Added(object.clone()));
        object
    }

    /// Store a changed object, finishing its deletion if the last finalizer
    /// was just released.
    fn commit(&self, objects: &mut Objects, old: DynamicObject, new: DynamicObject) -> DynamicObject {
        let oref = new.object_ref();
        objects.insert(oref.clone(), new.clone());
        if new.metadata.is_being_deleted() && new.metadata.finalizers.is_empty() {
            self.delete_locked(objects, oref);
        } else {
            self.publish(WatchEvent::Modified {
                old,
                new: new.clone(),
            });
        }
        new
    }

    /// Delete `root` and, transitively, everything it owns.
    fn delete_locked(&self, objects: &mut Objects, root: ObjectRef) {
        let mut pending = vec![root];
        while let Some(oref) = pending.pop() {
            let Some(current) = objects.get(&oref).cloned() else {
                continue;
            };

            if !current.metadata.finalizers.is_empty() {
                if !current.metadata.is_being_deleted() {
                    let mut marked = current.clone();
                    marked.metadata.deletion_timestamp = Some(Utc::now());
                    marked.metadata.resource_version = self.next_revision();
                    objects.insert(oref, marked.clone());
                    self.publish(WatchEvent::Modified {
                        old: current,
                        new: marked,
                    });
                }
                continue;
            }

            objects.remove(&oref);
            let uid = current.metadata.uid.clone();
            debug!(kind = %current.kind, key = %current.key(), "Object deleted");
            self.publish(WatchEvent::Deleted(current));
            if uid.is_empty() {
                continue;
            }

            let dependents: Vec<DynamicObject> = objects
                .values()
                .filter(|o| o.metadata.is_owned_by(&uid))
                .cloned()
                .collect();
            for dependent in dependents {
                if dependent.metadata.owner_references.len() <= 1 {
                    pending.push(dependent.object_ref());
                    continue;
                }
                // Other owners keep it alive; only this owner's reference goes.
                let mut released = dependent.clone();
                released.metadata.owner_references.retain(|r| r.uid != uid);
                released.metadata.resource_version = self.next_revision();
                objects.insert(released.object_ref(), released.clone());
                self.publish(WatchEvent::Modified {
                    old: dependent,
                    new: released,
                });
            }
        }
    }
}

fn validate(object: &DynamicObject) -> Result<()> {
    if object.kind.is_empty() || object.api_version.is_empty() {
        return Err(Error::invalid_object("apiVersion and kind are required"));
    }
    if object.metadata.name.is_empty() {
        return Err(Error::invalid_object(format!(
            "{} is missing metadata.name",
            object.kind
        )));
    }
    Ok(())
}

fn check_version(existing: &DynamicObject, incoming: &DynamicObject) -> Result<()> {
    let expected = &incoming.metadata.resource_version;
    let actual = &existing.metadata.resource_version;
    if !expected.is_empty() && expected != actual {
        return Err(Error::conflict(
            &existing.kind,
            existing.key(),
            expected.clone(),
            actual.clone(),
        ));
    }
    Ok(())
}

/// Top-level fields excluding `status`.
fn content(object: &DynamicObject) -> Map<String, Value> {
    let mut data = object.data.clone();
    data.remove("status");
    data
}

/// Recursive merge: objects merge key by key, everything else is replaced.
fn merge_value(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_value(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

fn not_found(oref: &ObjectRef) -> Error {
    Error::not_found(&oref.gvk.kind, &oref.key)
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<DynamicObject> {
        let oref = ObjectRef::new(gvk.clone(), key.clone());
        self.objects
            .read()
            .await
            .get(&oref)
            .cloned()
            .ok_or_else(|| not_found(&oref))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .filter(|(oref, _)| &oref.gvk == gvk)
            .filter(|(oref, _)| namespace.is_none_or(|ns| oref.key.namespace == ns))
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(&self, object: DynamicObject) -> Result<DynamicObject> {
        validate(&object)?;
        let oref = object.object_ref();
        let mut objects = self.objects.write().await;
        if objects.contains_key(&oref) {
            return Err(Error::already_exists(&oref.gvk.kind, &oref.key));
        }
        Ok(self.insert_new(&mut objects, object))
    }

    async fn update(&self, mut object: DynamicObject) -> Result<DynamicObject> {
        validate(&object)?;
        let oref = object.object_ref();
        let mut objects = self.objects.write().await;
        let existing = objects.get(&oref).cloned().ok_or_else(|| not_found(&oref))?;
        check_version(&existing, &object)?;

        match existing.data.get("status") {
            Some(status) => object.data.insert("status".to_string(), status.clone()),
            None => object.data.remove("status"),
        };
        let meta = &mut object.metadata;
        meta.uid.clone_from(&existing.metadata.uid);
        meta.creation_timestamp = existing.metadata.creation_timestamp;
        meta.deletion_timestamp = existing.metadata.deletion_timestamp;
        meta.managed_fields.clone_from(&existing.metadata.managed_fields);
        meta.resource_version.clone_from(&existing.metadata.resource_version);
        meta.generation = existing.metadata.generation;

        if object == existing {
            return Ok(existing);
        }
        if content(&object) != content(&existing) {
            object.metadata.generation = existing.metadata.generation.saturating_add(1);
        }
        object.metadata.resource_version = self.next_revision();
        Ok(self.commit(&mut objects, existing, object))
    }

    async fn update_status(&self, object: DynamicObject) -> Result<DynamicObject> {
        let oref = object.object_ref();
        let mut objects = self.objects.write().await;
        let existing = objects.get(&oref).cloned().ok_or_else(|| not_found(&oref))?;
        check_version(&existing, &object)?;

        let mut updated = existing.clone();
        match object.data.get("status") {
            Some(status) => updated.data.insert("status".to_string(), status.clone()),
            None => updated.data.remove("status"),
        };
        if updated == existing {
            return Ok(existing);
        }
        updated.metadata.resource_version = self.next_revision();
        Ok(self.commit(&mut objects, existing, updated))
    }

    async fn apply(&self, object: DynamicObject, field_manager: &str) -> Result<DynamicObject> {
        validate(&object)?;
        let oref = object.object_ref();
        let entry = ManagedFieldsEntry {
            manager: field_manager.to_string(),
            operation: "Apply".to_string(),
            time: Some(Utc::now()),
        };
        let mut objects = self.objects.write().await;

        let Some(existing) = objects.get(&oref).cloned() else {
            let mut object = object;
            object.metadata.managed_fields = vec![entry];
            return Ok(self.insert_new(&mut objects, object));
        };

        let mut merged = existing.clone();
        let meta = object.metadata;
        merged.metadata.labels.extend(meta.labels);
        merged.metadata.annotations.extend(meta.annotations);
        for reference in meta.owner_references {
            if !merged.metadata.is_owned_by(&reference.uid) {
                merged.metadata.owner_references.push(reference);
            }
        }
        for (field, value) in object.data {
            if field == "status" {
                continue;
            }
            merge_value(merged.data.entry(field).or_insert(Value::Null), value);
        }

        if merged == existing {
            return Ok(existing);
        }
        if content(&merged) != content(&existing) {
            merged.metadata.generation = existing.metadata.generation.saturating_add(1);
        }
        merged
            .metadata
            .managed_fields
            .retain(|m| m.manager != field_manager);
        merged.metadata.managed_fields.push(entry);
        merged.metadata.resource_version = self.next_revision();
        debug!(kind = %merged.kind, key = %merged.key(), manager = field_manager, "Object applied");
        Ok(self.commit(&mut objects, existing, merged))
    }

    async fn delete(&self, gvk: &GroupVersionKind, key: &ObjectKey) -> Result<()> {
        let oref = ObjectRef::new(gvk.clone(), key.clone());
        let mut objects = self.objects.write().await;
        if !objects.contains_key(&oref) {
            return Err(not_found(&oref));
        }
        self.delete_locked(&mut objects, oref);
        Ok(())
    }

    async fn watch(&self, gvk: &GroupVersionKind) -> Result<WatchStream> {
        Ok(WatchStream::new(gvk.clone(), self.events.subscribe()))
    }
}
