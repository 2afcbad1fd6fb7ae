//! Generic per-kind readiness predicates for generated children.

use serde_json::Value;

use crate::object::DynamicObject;

/// Whether a live object has finished converging, with a short explanation
/// when it has not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    pub message: String,
}

impl Readiness {
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            ready: true,
            message: String::new(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            message: message.into(),
        }
    }
}

fn int(object: &DynamicObject, path: &[&str]) -> Option<i64> {
    object.field(path).and_then(Value::as_i64)
}

fn observed_current(object: &DynamicObject) -> bool {
    int(object, &["status", "observedGeneration"])
        .is_none_or(|observed| observed >= object.metadata.generation)
}

fn replicas_ready(object: &DynamicObject) -> Readiness {
    if !observed_current(object) {
        return Readiness::not_ready("rollout not yet observed");
    }
    let desired = int(object, &["spec", "replicas"]).unwrap_or(1);
    let ready = int(object, &["status", "readyReplicas"]).unwrap_or(0);
    if ready >= desired {
        Readiness::ready()
    } else {
        Readiness::not_ready(format!("{ready}/{desired} replicas ready"))
    }
}

fn daemon_set_ready(object: &DynamicObject) -> Readiness {
    let desired = int(object, &["status", "desiredNumberScheduled"]).unwrap_or(0);
    let ready = int(object, &["status", "numberReady"]).unwrap_or(0);
    if observed_current(object) && ready >= desired {
        Readiness::ready()
    } else {
        Readiness::not_ready(format!("{ready}/{desired} pods ready"))
    }
}

fn job_ready(object: &DynamicObject) -> Readiness {
    if int(object, &["status", "succeeded"]).unwrap_or(0) >= 1 {
        Readiness::ready()
    } else {
        Readiness::not_ready("job has not succeeded")
    }
}

fn service_ready(object: &DynamicObject) -> Readiness {
    let is_load_balancer = object
        .field(&["spec", "type"])
        .and_then(Value::as_str)
        .is_some_and(|t| t == "LoadBalancer");
    if !is_load_balancer {
        return Readiness::ready();
    }
    let has_ingress = object
        .field(&["status", "loadBalancer", "ingress"])
        .and_then(Value::as_array)
        .is_some_and(|ingress| !ingress.is_empty());
    if has_ingress {
        Readiness::ready()
    } else {
        Readiness::not_ready("load balancer has no ingress")
    }
}

fn phase_is(object: &DynamicObject, expected: &str) -> bool {
    object
        .field(&["status", "phase"])
        .and_then(Value::as_str)
        .is_some_and(|phase| phase == expected)
}

/// Evaluate the readiness of a live object based on its kind.
///
/// Kinds without a specific predicate are ready as soon as they exist.
#[must_use]
pub fn readiness(object: &DynamicObject) -> Readiness {
    match object.kind.as_str() {
        "Deployment" | "StatefulSet" | "ReplicaSet" => replicas_ready(object),
        "DaemonSet" => daemon_set_ready(object),
        "Job" => job_ready(object),
        "Service" => service_ready(object),
        "PersistentVolumeClaim" if !phase_is(object, "Bound") => {
            Readiness::not_ready("claim is not bound")
        }
        "Namespace" if phase_is(object, "Terminating") => {
            Readiness::not_ready("namespace is terminating")
        }
        _ => Readiness::ready(),
    }
}

#[must_use]
pub fn is_ready(object: &DynamicObject) -> bool {
    readiness(object).ready
}
