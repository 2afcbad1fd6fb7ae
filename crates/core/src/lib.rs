//! Object model and store contract shared by the resume operator crates.
//!
//! - [`ObjectStore`] is the versioned store every reconciler reads from and
//!   writes to; [`InMemoryStore`] implements it with watch support.
//! - [`DynamicObject`] is the untyped object all store calls exchange;
//!   [`Workload`] is implemented by typed collection and component kinds.
//! - [`WorkloadStatus`] carries the phase conditions and child resource
//!   records, each kept unique by key.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod gvk;
pub mod object;
pub mod readiness;
pub mod status;
pub mod store;
pub mod workload;

pub use error::{Error, Result};
pub use gvk::{GroupVersionKind, ObjectKey, ObjectRef};
pub use object::{DynamicObject, ManagedFieldsEntry, ObjectMeta, OwnerReference};
pub use readiness::{Readiness, is_ready, readiness};
pub use status::{ChildKey, ChildResource, Keyed, KeyedList, PhaseCondition, PhaseState, WorkloadStatus};
pub use store::{InMemoryStore, ObjectStore, WatchEvent, WatchStream, get_typed, list_typed};
pub use workload::{CollectionReference, Workload};
