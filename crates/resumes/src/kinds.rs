//! Kind-level entry points used by the command line: samples, API versions
//! and offline resource generation from manifests.

use std::fmt;
use std::str::FromStr;

use resume_core::{DynamicObject, GroupVersionKind, Workload};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::resources;
use crate::samples;
use crate::v1alpha1::{self, Certification, JobExperience, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResumeKind {
    Profile,
    JobExperience,
    Certification,
}

impl ResumeKind {
    pub const ALL: [Self; 3] = [Self::Profile, Self::JobExperience, Self::Certification];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::JobExperience => "JobExperience",
            Self::Certification => "Certification",
        }
    }

    #[must_use]
    pub fn gvk(self) -> GroupVersionKind {
        v1alpha1::gvk(self.as_str())
    }

    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Profile)
    }

    /// Served versions, newest first.
    #[must_use]
    pub const fn api_versions(self) -> &'static [&'static str] {
        &[v1alpha1::VERSION]
    }

    /// The sample manifest for `api_version`; `None`, empty or `latest`
    /// select the newest version.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnknownVersion`] for a version this kind does not
    /// serve.
    pub fn sample(self, api_version: Option<&str>, required_only: bool) -> Result<&'static str> {
        let version = match api_version {
            None | Some("" | "latest") => v1alpha1::VERSION,
            Some(version) => version,
        };
        if !self.api_versions().contains(&version) {
            return Err(ApiError::unknown_version(self.as_str(), version));
        }

        Ok(match (self, required_only) {
            (Self::Profile, false) => samples::PROFILE,
            (Self::Profile, true) => samples::PROFILE_REQUIRED,
            (Self::JobExperience, false) => samples::JOB_EXPERIENCE,
            (Self::JobExperience, true) => samples::JOB_EXPERIENCE_REQUIRED,
            (Self::Certification, false) => samples::CERTIFICATION,
            (Self::Certification, true) => samples::CERTIFICATION_REQUIRED,
        })
    }

    /// Render the children of a workload manifest without a control plane.
    /// Components also need the manifest of their profile.
    ///
    /// # Errors
    ///
    /// Returns an error when a manifest does not parse, is of another kind or
    /// version, fails validation, or a component has no collection manifest.
    pub fn generate(self, workload: &str, collection: Option<&str>) -> Result<Vec<DynamicObject>> {
        match self {
            Self::Profile => {
                let profile: Profile = parse_manifest(self, workload)?;
                profile.validate()?;
                resources::profile::generate(&profile)
            }
            Self::JobExperience => {
                let profile = self.collection(collection)?;
                let experience: JobExperience = parse_manifest(self, workload)?;
                experience.validate()?;
                resources::experience::generate(&experience, &profile)
            }
            Self::Certification => {
                let profile = self.collection(collection)?;
                let certification: Certification = parse_manifest(self, workload)?;
                certification.validate()?;
                resources::certification::generate(&certification, &profile)
            }
        }
    }

    fn collection(self, manifest: Option<&str>) -> Result<Profile> {
        let manifest = manifest.ok_or_else(|| ApiError::MissingCollection {
            kind: self.as_str().to_string(),
        })?;
        let profile: Profile = parse_manifest(Self::Profile, manifest)?;
        profile.validate()?;
        Ok(profile)
    }
}

fn parse_manifest<W: Workload>(kind: ResumeKind, manifest: &str) -> Result<W> {
    let value: Value = serde_yaml::from_str(manifest).map_err(ApiError::parse)?;
    let object = DynamicObject::from_value(value)?;
    let expected = kind.gvk();
    if object.gvk() != expected {
        return Err(ApiError::kind_mismatch(
            format!("{} {}", expected.api_version(), expected.kind),
            format!("{} {}", object.api_version, object.kind),
        ));
    }
    Ok(object.try_parse()?)
}

impl fmt::Display for ResumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeKind {
    type Err = ApiError;

    /// Case-insensitive, singular or plural.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        let singular = wanted.strip_suffix('s').unwrap_or(&wanted);
        Self::ALL
            .into_iter()
            .find(|kind| {
                let name = kind.as_str().to_ascii_lowercase();
                name == wanted || name == singular
            })
            .ok_or_else(|| ApiError::unknown_kind(s))
    }
}
