//! Child resource generators.
//!
//! Every generator is a pure function of its parent (and, for components,
//! the collection); the same input always renders the same objects in the
//! same order.

use std::collections::BTreeMap;

use resume_core::{DynamicObject, GroupVersionKind, ObjectKey};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::v1alpha1::{GROUP, Profile};

pub mod certification;
pub mod experience;
pub mod profile;

pub const PART_OF: &str = "resume";
pub const MANAGED_BY: &str = "resume-operator";
pub const CREATED_BY: &str = "resume-controller-manager";

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_CREATED_BY: &str = "app.kubernetes.io/created-by";
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";

/// `<group>/candidate`, which routes `resume-svc` to the web pods.
#[must_use]
pub fn candidate_label() -> String {
    format!("{GROUP}/candidate")
}

pub(crate) fn config_map_gvk() -> GroupVersionKind {
    GroupVersionKind::new("", "v1", "ConfigMap")
}

pub(crate) fn service_gvk() -> GroupVersionKind {
    GroupVersionKind::new("", "v1", "Service")
}

pub(crate) fn deployment_gvk() -> GroupVersionKind {
    GroupVersionKind::new("apps", "v1", "Deployment")
}

pub(crate) fn ingress_gvk() -> GroupVersionKind {
    GroupVersionKind::new("networking.k8s.io", "v1", "Ingress")
}

/// The labels that select an app's pods.
pub(crate) fn selector_labels(profile: &Profile, app: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), app.to_string()),
        (LABEL_COMPONENT.to_string(), component.to_string()),
        (LABEL_PART_OF.to_string(), PART_OF.to_string()),
        (LABEL_INSTANCE.to_string(), profile.instance()),
    ])
}

/// Selector labels plus ownership and version, stamped on every object.
pub(crate) fn standard_labels(profile: &Profile, app: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(profile, app, component);
    labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string());
    labels.insert(LABEL_CREATED_BY.to_string(), CREATED_BY.to_string());
    labels.insert(LABEL_VERSION.to_string(), profile.spec.web.image.tag.clone());
    labels
}

pub(crate) fn labels_value(labels: &BTreeMap<String, String>) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

pub(crate) fn object(
    gvk: &GroupVersionKind,
    namespace: &str,
    name: &str,
    labels: BTreeMap<String, String>,
) -> DynamicObject {
    let mut object = DynamicObject::new(gvk, &ObjectKey::new(namespace, name));
    object.metadata.labels = labels;
    object
}

/// A ConfigMap holding a single rendered file.
pub(crate) fn config_map(
    namespace: &str,
    name: &str,
    labels: BTreeMap<String, String>,
    file: String,
    contents: String,
) -> DynamicObject {
    let mut data = Map::new();
    data.insert(file, Value::String(contents));
    object(&config_map_gvk(), namespace, name, labels).with_field("data", Value::Object(data))
}

/// Render `value` as a YAML document, the format the site reads its data
/// files in.
pub(crate) fn render_yaml<T: Serialize>(file: &str, value: &T) -> Result<String> {
    let body = serde_yaml::to_string(value).map_err(|e| ApiError::render(file, e))?;
    Ok(format!("---\n{body}"))
}
