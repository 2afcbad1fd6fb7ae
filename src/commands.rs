//! CLI command handlers. Output goes to the given writer so commands can be
//! exercised without a terminal.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use resume_api::{CertificationHandler, JobExperienceHandler, ProfileHandler, ResumeKind};
use resume_core::{InMemoryStore, ObjectStore};
use resume_reconciler::Manager;
use serde_json::json;
use tracing::{info, warn};

use crate::config::OperatorConfig;
use crate::control_plane;

/// Print the sample manifest of `kind`.
///
/// # Errors
///
/// Returns an error for a version `kind` does not serve.
pub fn init(
    out: &mut impl Write,
    kind: ResumeKind,
    api_version: Option<&str>,
    required_only: bool,
) -> Result<()> {
    let sample = kind.sample(api_version, required_only)?;
    out.write_all(sample.as_bytes())?;
    Ok(())
}

/// Render the children of the manifest at `workload` as a YAML stream.
///
/// # Errors
///
/// Returns an error if a manifest cannot be read or does not render.
pub fn generate(
    out: &mut impl Write,
    kind: ResumeKind,
    workload: &Path,
    collection: Option<&Path>,
) -> Result<()> {
    let workload = std::fs::read_to_string(workload)
        .with_context(|| format!("Failed to read workload manifest {}", workload.display()))?;
    let collection = collection
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read collection manifest {}", path.display()))
        })
        .transpose()?;

    let objects = kind
        .generate(&workload, collection.as_deref())
        .with_context(|| format!("Failed to generate {kind} resources"))?;
    for object in objects {
        writeln!(out, "---")?;
        out.write_all(serde_yaml::to_string(&object)?.as_bytes())?;
    }
    Ok(())
}

/// Print the CLI version and the API versions served for `kind`.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn version(out: &mut impl Write, kind: ResumeKind) -> Result<()> {
    let info = json!({
        "cliVersion": env!("CARGO_PKG_VERSION"),
        "apiVersions": kind.api_versions(),
    });
    writeln!(out, "{}", serde_json::to_string(&info)?)?;
    Ok(())
}

/// Options for [`run`] beyond the operator configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions<'a> {
    pub manifests: Option<&'a Path>,
    pub simulate_rollout: bool,
}

/// Run the operator over an in-memory store until `shutdown` resolves, then
/// write the resulting objects.
///
/// # Errors
///
/// Returns an error if the manifests cannot be loaded or a controller fails
/// to start.
pub async fn run(
    out: &mut impl Write,
    config: &OperatorConfig,
    options: RunOptions<'_>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let store = InMemoryStore::new_arc();
    if let Some(dir) = options.manifests {
        let loaded = control_plane::seed_manifests(store.as_ref(), dir).await?;
        info!(loaded, dir = %dir.display(), "Manifests loaded");
    }

    let mut manager = Manager::new(
        store.clone(),
        config.reconciler_config(),
        config.controller_config(),
    );
    manager.add(ProfileHandler);
    manager.add(JobExperienceHandler);
    manager.add(CertificationHandler);
    let signal = manager.shutdown_signal();

    let rollouts = options.simulate_rollout.then(|| {
        let store: Arc<dyn ObjectStore> = store.clone();
        tokio::spawn(control_plane::simulate_rollouts(store, signal.context()))
    });

    let mut running = tokio::spawn(async move { manager.run().await });
    info!("Operator running. Press Ctrl+C to stop.");

    tokio::select! {
        joined = &mut running => {
            signal.trigger();
            joined.context("Manager task failed")??;
        }
        () = shutdown => {
            info!("Shutting down");
            signal.trigger();
            running.await.context("Manager task failed")??;
        }
    }

    if let Some(rollouts) = rollouts {
        if let Err(e) = rollouts.await.context("Rollout task failed")? {
            warn!(error = %e, "Rollout simulation ended with an error");
        }
    }

    out.write_all(control_plane::snapshot(store.as_ref()).await?.as_bytes())?;
    Ok(())
}
