//! The `Profile` collection: who the resume is for and how the site is served.

use resume_core::{ObjectMeta, WorkloadStatus};
use serde::{Deserialize, Serialize};

use super::{gvk, impl_workload};
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ProfileSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl_workload!(Profile, "Profile");

impl Profile {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: ProfileSpec) -> Self {
        Self {
            api_version: gvk("Profile").api_version(),
            kind: "Profile".to_string(),
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: WorkloadStatus::default(),
        }
    }

    /// `resume-<first><last>`, shared by every object rendered for this
    /// profile and its components.
    #[must_use]
    pub fn instance(&self) -> String {
        format!("resume-{}", self.candidate())
    }

    /// `<first><last>`, used to select the web pods.
    #[must_use]
    pub fn candidate(&self) -> String {
        format!(
            "{}{}",
            self.spec.profile.first_name, self.spec.profile.last_name
        )
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] when the site has no host to serve on.
    pub fn validate(&self) -> Result<()> {
        if self.spec.base_url.trim().is_empty() {
            return Err(ApiError::invalid("Profile", "spec.baseURL must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSpec {
    pub profile: ProfileDetails,
    pub web: ImageHolder,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub page_title: String,
    pub page_count: String,
    pub pdf: ImageHolder,
    pub cert_issuer: String,
    pub ingress_class: String,
}

impl Default for ProfileSpec {
    fn default() -> Self {
        Self {
            profile: ProfileDetails::default(),
            web: ImageHolder::default(),
            base_url: "example.com".to_string(),
            page_title: "John Doe - CV".to_string(),
            page_count: "1".to_string(),
            pdf: ImageHolder::default(),
            cert_issuer: "letsencrypt-staging".to_string(),
            ingress_class: "nginx".to_string(),
        }
    }
}

/// `web` and `pdf` both wrap a single image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageHolder {
    pub image: Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Image {
    pub registry: String,
    pub name: String,
    pub tag: String,
    pub pull_policy: String,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            registry: String::new(),
            name: "jefedavis/resume".to_string(),
            tag: "latest".to_string(),
            pull_policy: "IfNotPresent".to_string(),
        }
    }
}

impl Image {
    /// `<registry><name>:<tag>`; the registry carries its own trailing slash.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}{}:{}", self.registry, self.name, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    #[serde(rename = "linkedinURL")]
    pub linkedin_url: String,
    #[serde(rename = "githubURL")]
    pub github_url: String,
    pub location: String,
    pub overview: String,
    pub core_competencies: Vec<String>,
    pub projects: Vec<String>,
    pub skills: Vec<SkillFamily>,
}

impl Default for ProfileDetails {
    fn default() -> Self {
        Self {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            phone_number: String::new(),
            email: String::new(),
            linkedin_url: String::new(),
            github_url: String::new(),
            location: "South Carolina".to_string(),
            overview: String::new(),
            core_competencies: Vec::new(),
            projects: Vec::new(),
            skills: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillFamily {
    pub family: String,
    pub items: Vec<String>,
}
