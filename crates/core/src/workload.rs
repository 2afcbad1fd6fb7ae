//! The capability every reconciled kind implements.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gvk::{GroupVersionKind, ObjectKey, ObjectRef};
use crate::object::{DynamicObject, ObjectMeta};
use crate::status::WorkloadStatus;

/// Binding from a component to its collection. An empty name means "the
/// only collection in the store".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl CollectionReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Fill in an unset namespace with the referencing object's own.
    #[must_use]
    pub fn or_namespace(&self, namespace: &str) -> Self {
        let mut reference = self.clone();
        if reference.namespace.is_empty() {
            namespace.clone_into(&mut reference.namespace);
        }
        reference
    }

    #[must_use]
    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        self.name == meta.name && self.namespace == meta.namespace
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// A typed, reconcilable object: either a collection or a component.
pub trait Workload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn gvk() -> GroupVersionKind;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn status(&self) -> &WorkloadStatus;

    fn status_mut(&mut self) -> &mut WorkloadStatus;

    /// The collection this object belongs to. `None` for collection kinds.
    fn collection_ref(&self) -> Option<&CollectionReference> {
        None
    }

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(Self::gvk(), self.key())
    }

    /// # Errors
    ///
    /// Returns a serialization error when the value cannot be encoded.
    fn to_dynamic(&self) -> Result<DynamicObject> {
        DynamicObject::from_typed(self)
    }

    /// # Errors
    ///
    /// Returns a serialization error when `object` does not match `Self`.
    fn from_dynamic(object: &DynamicObject) -> Result<Self> {
        object.try_parse()
    }
}
