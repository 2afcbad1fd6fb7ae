use resume_core::{CollectionReference, ObjectMeta, WorkloadStatus};
use serde::{Deserialize, Serialize};

use super::{gvk, impl_workload};
use crate::error::{ApiError, Result};

/// One employer on the resume; a component of a `Profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExperience {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: JobExperienceSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl_workload!(JobExperience, "JobExperience", collection = collection);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobExperienceSpec {
    pub collection: CollectionReference,
    pub employer: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Position {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub highlights: Vec<String>,
}

impl JobExperience {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: JobExperienceSpec,
    ) -> Self {
        Self {
            api_version: gvk("JobExperience").api_version(),
            kind: "JobExperience".to_string(),
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: WorkloadStatus::default(),
        }
    }

    /// File-name-safe employer: spaces become dashes, dots and commas go.
    #[must_use]
    pub fn employer_slug(&self) -> String {
        self.spec
            .employer
            .replace(' ', "-")
            .replace(['.', ','], "")
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] without an employer, which names the
    /// rendered data file.
    pub fn validate(&self) -> Result<()> {
        if self.employer_slug().is_empty() {
            return Err(ApiError::invalid("JobExperience", "spec.employer must not be empty"));
        }
        Ok(())
    }
}
