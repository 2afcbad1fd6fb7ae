//! The in-memory control plane behind `run`: manifest loading, a stand-in
//! for the deployment controller, and the final snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::StreamExt;
use itertools::Itertools;
use resume_api::ResumeKind;
use resume_core::{DynamicObject, GroupVersionKind, ObjectStore, WatchEvent, is_ready};
use resume_reconciler::Context;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Kinds included in the snapshot printed on shutdown, parents first.
#[must_use]
pub fn snapshot_kinds() -> Vec<GroupVersionKind> {
    ResumeKind::ALL
        .iter()
        .map(|kind| kind.gvk())
        .chain([
            GroupVersionKind::new("", "v1", "ConfigMap"),
            GroupVersionKind::new("apps", "v1", "Deployment"),
            GroupVersionKind::new("", "v1", "Service"),
            GroupVersionKind::new("networking.k8s.io", "v1", "Ingress"),
        ])
        .collect()
}

/// Every `*.yaml`/`*.yml` file directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let files = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read manifest directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .sorted()
        .collect();
    Ok(files)
}

/// Parse a `---` separated YAML stream. Empty documents are skipped and
/// objects without a namespace land in `default`.
///
/// # Errors
///
/// Returns an error naming the document that failed to parse.
pub fn parse_manifests(content: &str) -> Result<Vec<DynamicObject>> {
    serde_yaml::Deserializer::from_str(content)
        .zip(1usize..)
        .filter_map(|(document, number)| {
            match Value::deserialize(document) {
                Ok(Value::Null) => None,
                Ok(value) => Some(
                    DynamicObject::from_value(value)
                        .with_context(|| format!("Document {number} is not an object")),
                ),
                Err(e) => Some(Err(anyhow::Error::new(e)
                    .context(format!("Document {number} is not valid YAML")))),
            }
        })
        .map(|object| {
            object.map(|mut object| {
                if object.metadata.namespace.is_empty() {
                    DEFAULT_NAMESPACE.clone_into(&mut object.metadata.namespace);
                }
                object
            })
        })
        .collect()
}

/// Create every object found in the manifests under `dir`.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or the store rejects
/// an object.
pub async fn seed_manifests(store: &dyn ObjectStore, dir: &Path) -> Result<usize> {
    let mut created: usize = 0;
    for file in manifest_files(dir)? {
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        for object in parse_manifests(&content).with_context(|| file.display().to_string())? {
            let key = object.key();
            let kind = object.kind.clone();
            store
                .create(object)
                .await
                .with_context(|| format!("Failed to create {kind} {key}"))?;
            info!(kind = %kind, key = %key, file = %file.display(), "Manifest loaded");
            created = created.saturating_add(1);
        }
    }
    Ok(created)
}

/// Rolled-out status for a deployment: every desired replica ready at the
/// current generation.
fn rolled_out(deployment: &DynamicObject) -> Value {
    let replicas = deployment
        .field(&["spec", "replicas"])
        .and_then(Value::as_i64)
        .unwrap_or(1);
    json!({
        "replicas": replicas,
        "readyReplicas": replicas,
        "availableReplicas": replicas,
        "observedGeneration": deployment.metadata.generation,
    })
}

async fn roll_out(store: &dyn ObjectStore, deployment: DynamicObject) {
    if deployment.metadata.is_being_deleted() || is_ready(&deployment) {
        return;
    }
    let key = deployment.key();
    let mut updated = deployment;
    let status = rolled_out(&updated);
    updated.data.insert("status".to_string(), status);
    match store.update_status(updated).await {
        Ok(_) => debug!(key = %key, "Deployment rolled out"),
        // A newer revision arrives as its own event.
        Err(e) if e.is_conflict() || e.is_not_found() => {}
        Err(e) => warn!(key = %key, error = %e, "Failed to report rollout"),
    }
}

/// Mark deployments ready as they appear or change, standing in for the
/// deployment controller of a real cluster. Runs until `context` is
/// cancelled.
///
/// # Errors
///
/// Returns an error if the deployment watch cannot be opened.
pub async fn simulate_rollouts(store: Arc<dyn ObjectStore>, context: Context) -> Result<()> {
    let gvk = GroupVersionKind::new("apps", "v1", "Deployment");
    let events = store.watch(&gvk).await?.into_stream();
    futures::pin_mut!(events);

    for existing in store.list(&gvk, None).await? {
        roll_out(store.as_ref(), existing).await;
    }

    loop {
        tokio::select! {
            () = context.cancelled() => break,
            event = events.next() => match event {
                Some(WatchEvent::Added(object) | WatchEvent::Modified { new: object, .. }) => {
                    roll_out(store.as_ref(), object).await;
                }
                Some(WatchEvent::Deleted(_)) => {}
                None => break,
            },
        }
    }
    debug!("Rollout simulation stopped");
    Ok(())
}

/// All objects of the snapshot kinds as one YAML stream.
///
/// # Errors
///
/// Returns an error if the store cannot be listed or an object cannot be
/// rendered.
pub async fn snapshot(store: &dyn ObjectStore) -> Result<String> {
    let mut out = String::new();
    for gvk in snapshot_kinds() {
        for object in store.list(&gvk, None).await? {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(&object)?);
        }
    }
    Ok(out)
}
