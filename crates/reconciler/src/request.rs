//! Per-pass request and its cancellation context.

use std::future::Future;
use std::sync::Arc;

use resume_core::{ObjectRef, Workload, WorkloadStatus};
use tokio::sync::watch;
use tracing::Span;

use crate::error::{Error, Result};

/// Owner of the shutdown signal. Dropping it never cancels contexts; only
/// [`ShutdownSignal::trigger`] does.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A context that is cancelled when this signal triggers.
    #[must_use]
    pub fn context(&self) -> Context {
        Context {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cancellation context carried by every store call made during a pass.
#[derive(Debug, Clone, Default)]
pub struct Context {
    rx: Option<watch::Receiver<bool>>,
}

impl Context {
    /// A context that is never cancelled.
    #[must_use]
    pub const fn background() -> Self {
        Self { rx: None }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled. Never resolves for a
    /// background context or after the signal owner is gone.
    pub async fn cancelled(&self) {
        let Some(mut rx) = self.rx.clone() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Race `fut` against cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the context fires first, otherwise
    /// whatever `fut` returns.
    pub async fn guard<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        Error: From<E>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Error::Cancelled),
            result = fut => result.map_err(Error::from),
        }
    }
}

/// Everything one reconciliation pass knows about its object.
///
/// Built fresh for each pass and dropped at its end.
pub struct Request<W: Workload, C: Workload> {
    pub workload: W,
    /// Resolved collection; `None` for collection kinds.
    pub collection: Option<C>,
    pub context: Context,
    span: Span,
    persisted: WorkloadStatus,
    applied: Vec<ObjectRef>,
}

impl<W: Workload, C: Workload> Request<W, C> {
    pub fn new(workload: W, collection: Option<C>, context: Context, span: Span) -> Self {
        let persisted = workload.status().clone();
        Self {
            workload,
            collection,
            context,
            span,
            persisted,
            applied: Vec::new(),
        }
    }

    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Children applied so far in this pass.
    #[must_use]
    pub fn applied(&self) -> &[ObjectRef] {
        &self.applied
    }

    pub fn record_applied(&mut self, child: ObjectRef) {
        if !self.applied.contains(&child) {
            self.applied.push(child);
        }
    }

    /// Whether the in-memory status differs from what the store last saw.
    #[must_use]
    pub fn status_dirty(&self) -> bool {
        self.workload.status() != &self.persisted
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = self.workload.status().clone();
    }
}
