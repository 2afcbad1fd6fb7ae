//! Controllers: watches feeding a work queue drained by reconcile workers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use resume_core::{GroupVersionKind, ObjectKey, ObjectStore, Workload};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::Result;
use crate::queue::WorkQueue;
use crate::reconciler::{ReconcilerConfig, WorkloadHandler, WorkloadReconciler};
use crate::recorder::{EventRecorder, TracingRecorder};
use crate::request::{Context, ShutdownSignal};
use crate::retry::Backoff;
use crate::types::ReconcileAction;
use crate::watch::{EventFilter, EventMapper, SelfMapper, WatchSource, WorkloadFilter};

/// Delivers store watch events for one kind into a work queue.
pub struct QueueWatchSource {
    store: Arc<dyn ObjectStore>,
    queue: Arc<WorkQueue<ObjectKey>>,
    context: Context,
}

impl QueueWatchSource {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        queue: Arc<WorkQueue<ObjectKey>>,
        context: Context,
    ) -> Self {
        Self {
            store,
            queue,
            context,
        }
    }
}

#[async_trait]
impl WatchSource for QueueWatchSource {
    async fn register_watch(
        &self,
        gvk: GroupVersionKind,
        filter: Arc<dyn EventFilter>,
        mapper: Arc<dyn EventMapper>,
    ) -> Result<()> {
        let mut stream = self.store.watch(&gvk).await?;
        let queue = Arc::clone(&self.queue);
        let context = self.context.clone();
        debug!(kind = %gvk.kind, "Watch registered");

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = context.cancelled() => break,
                    event = stream.next() => event,
                };
                let Some(event) = event else {
                    warn!(kind = %gvk.kind, "Watch stream closed");
                    break;
                };
                if !filter.accepts(&event) {
                    continue;
                }
                for key in mapper.map(&event) {
                    queue.add(key).await;
                }
            }
        });
        Ok(())
    }
}

/// Worker and retry settings for one controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Concurrent reconcile workers. Keys are still processed one at a time.
    pub workers: usize,
    pub backoff: Backoff,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            backoff: Backoff::default(),
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Something the [`Manager`] runs until shutdown.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the runnable cannot start.
    async fn run(&self) -> Result<()>;
}

/// Drives one [`WorkloadReconciler`] from watch events.
pub struct Controller<H: WorkloadHandler> {
    name: String,
    store: Arc<dyn ObjectStore>,
    reconciler: Arc<WorkloadReconciler<H>>,
    queue: Arc<WorkQueue<ObjectKey>>,
    watches: Arc<QueueWatchSource>,
    config: ControllerConfig,
    context: Context,
}

impl<H: WorkloadHandler> Controller<H> {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        handler: Arc<H>,
        reconciler_config: ReconcilerConfig,
        config: ControllerConfig,
        context: Context,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        let queue = Arc::new(WorkQueue::new(config.backoff.clone()));
        let watches = Arc::new(QueueWatchSource::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            context.clone(),
        ));
        let source: Arc<dyn WatchSource> = watches.clone();
        let reconciler = WorkloadReconciler::new(Arc::clone(&store), handler, source, reconciler_config)
            .with_recorder(recorder);

        Self {
            name: H::Workload::gvk().kind.to_lowercase(),
            store,
            reconciler: Arc::new(reconciler),
            queue,
            watches,
            config,
            context,
        }
    }

    #[must_use]
    pub fn reconciler(&self) -> &WorkloadReconciler<H> {
        &self.reconciler
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<WorkQueue<ObjectKey>> {
        &self.queue
    }

    async fn worker(&self, id: usize) {
        while let Some(key) = self.queue.get().await {
            let result = self.reconciler.reconcile(&key, self.context.clone()).await;
            match result {
                Ok(ReconcileAction::Done) => self.queue.forget(&key).await,
                Ok(ReconcileAction::Requeue) => {
                    let delay = self.queue.add_rate_limited(key.clone()).await;
                    debug!(%key, ?delay, "Requeued");
                }
                Ok(ReconcileAction::RequeueAfter(delay)) => {
                    self.queue.forget(&key).await;
                    self.queue.add_after(key.clone(), delay);
                    debug!(%key, ?delay, "Requeued after fixed delay");
                }
                Err(err) if err.is_cancelled() => {
                    debug!(%key, "Reconcile cancelled");
                }
                Err(err) => {
                    let delay = self.queue.add_rate_limited(key.clone()).await;
                    error!(%key, error = %err, ?delay, "Reconcile failed");
                }
            }
            self.queue.done(&key).await;
        }
        debug!(worker = id, "Worker stopped");
    }
}

#[async_trait]
impl<H: WorkloadHandler> Runnable for Controller<H> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<()> {
        let gvk = H::Workload::gvk();
        self.watches
            .register_watch(gvk.clone(), Arc::new(WorkloadFilter), Arc::new(SelfMapper))
            .await?;

        for object in self.store.list(&gvk, None).await? {
            self.queue.add(object.key()).await;
        }
        info!(controller = %self.name, workers = self.config.workers, "Controller started");

        let workers = (0..self.config.workers.max(1)).map(|id| self.worker(id));
        let shutdown = async {
            self.context.cancelled().await;
            self.queue.shut_down().await;
        };
        let span = info_span!("controller", name = %self.name);
        async { tokio::join!(join_all(workers), shutdown) }
            .instrument(span)
            .await;

        info!(controller = %self.name, "Controller stopped");
        Ok(())
    }
}

/// Owns the store, the shutdown signal and every controller.
pub struct Manager {
    store: Arc<dyn ObjectStore>,
    shutdown: ShutdownSignal,
    controllers: Vec<Arc<dyn Runnable>>,
    reconciler_config: ReconcilerConfig,
    controller_config: ControllerConfig,
    recorder: Arc<dyn EventRecorder>,
}

impl Manager {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        reconciler_config: ReconcilerConfig,
        controller_config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            shutdown: ShutdownSignal::new(),
            controllers: Vec::new(),
            reconciler_config,
            controller_config,
            recorder: Arc::new(TracingRecorder),
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Register a controller for `handler`'s kind.
    pub fn add<H: WorkloadHandler>(&mut self, handler: H) -> Arc<Controller<H>> {
        let controller = Arc::new(Controller::new(
            Arc::clone(&self.store),
            Arc::new(handler),
            self.reconciler_config.clone(),
            self.controller_config.clone(),
            self.shutdown.context(),
            Arc::clone(&self.recorder),
        ));
        self.controllers.push(controller.clone());
        controller
    }

    /// Handle used to stop every controller.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    #[must_use]
    pub fn controller_names(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    /// Run all controllers until the shutdown signal triggers.
    ///
    /// # Errors
    ///
    /// Returns the first controller start-up failure.
    pub async fn run(&self) -> Result<()> {
        info!(controllers = ?self.controller_names(), "Manager starting");
        try_join_all(self.controllers.iter().map(|c| c.run())).await?;
        info!("Manager stopped");
        Ok(())
    }
}
