//! Phase-based reconciliation for collection and component workloads.
//!
//! A *collection* is a singleton-style object (a resume `Profile`) that
//! components (job experiences, certifications) bind to. Each pass:
//!
//! 1. Fetches the object and, for components, resolves its collection
//! 2. Registers a deduplicated watch so collection edits re-enqueue every
//!    bound component
//! 3. Installs the finalizer
//! 4. Runs the phases registered for the pass's event class, recording a
//!    condition per phase on the object's status
//!
//! # Phases
//!
//! - `Dependency` - gate on the kind's dependency checker
//! - `Create-Resources` - generate, mutate and apply children
//! - `Check-Ready` - wait for every applied child to report ready
//! - `Complete` - mark the object created
//! - `DeletionComplete` - release the finalizer
//!
//! # Example
//!
//! ```ignore
//! use resume_reconciler::{ControllerConfig, Manager, ReconcilerConfig};
//! use resume_core::InMemoryStore;
//!
//! let mut manager = Manager::new(
//!     InMemoryStore::new_arc(),
//!     ReconcilerConfig::default(),
//!     ControllerConfig::default(),
//! );
//! manager.add(ProfileHandler);
//! let shutdown = manager.shutdown_signal();
//! tokio::spawn(async move { manager.run().await });
//! // ...
//! shutdown.trigger();
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod collection;
pub mod controller;
pub mod error;
pub mod phase;
pub mod phases;
pub mod queue;
pub mod reconciler;
pub mod recorder;
pub mod request;
pub mod retry;
pub mod types;
pub mod watch;

pub use collection::resolve_collection;
pub use controller::{Controller, ControllerConfig, Manager, QueueWatchSource, Runnable};
pub use error::{Error, Result};
pub use phase::{Phase, PhaseRegistry};
pub use queue::WorkQueue;
pub use reconciler::{ReconcilerConfig, RequestFor, WorkloadHandler, WorkloadReconciler};
pub use recorder::{Event, EventRecorder, EventType, MemoryRecorder, TracingRecorder};
pub use request::{Context, Request, ShutdownSignal};
pub use retry::Backoff;
pub use types::{EventClass, Mutation, PhaseOutcome, ReconcileAction};
pub use watch::{
    CollectionBindings, CollectionChangeFilter, EventFilter, EventMapper, OwnedResourceFilter,
    OwnerMapper, SelfMapper, WatchRegistrar, WatchSource, WorkloadFilter,
};
