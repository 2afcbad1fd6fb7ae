use resume_core::{CollectionReference, ObjectMeta, WorkloadStatus};
use serde::{Deserialize, Serialize};

use super::{gvk, impl_workload};
use crate::error::{ApiError, Result};

/// A certification listed on the resume; a component of a `Profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CertificationSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl_workload!(Certification, "Certification", collection = collection);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificationSpec {
    pub collection: CollectionReference,
    pub title: String,
    pub issuer: String,
    pub earned_date: String,
    pub alias: String,
    #[serde(rename = "validationURL")]
    pub validation_url: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

impl Certification {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: CertificationSpec,
    ) -> Self {
        Self {
            api_version: gvk("Certification").api_version(),
            kind: "Certification".to_string(),
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: WorkloadStatus::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] when the alias is missing or cannot be
    /// used as a file and object name.
    pub fn validate(&self) -> Result<()> {
        let alias = &self.spec.alias;
        if alias.is_empty() {
            return Err(ApiError::invalid("Certification", "spec.alias must not be empty"));
        }
        if !alias
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ApiError::invalid(
                "Certification",
                format!("spec.alias '{alias}' may only contain lowercase letters, digits and '-'"),
            ));
        }
        Ok(())
    }
}
