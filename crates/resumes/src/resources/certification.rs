use resume_core::DynamicObject;
use serde::Serialize;

use super::{config_map, render_yaml, standard_labels};
use crate::error::Result;
use crate::v1alpha1::{Certification, CertificationSpec, Profile};

pub const NAME: &str = "resume-cert";

#[must_use]
pub fn data_file(certification: &Certification) -> String {
    format!("{}.yaml", certification.spec.alias)
}

/// The shared ConfigMap `resume-cert` carrying only `<alias>.yaml`.
///
/// # Errors
///
/// Returns [`crate::ApiError::Render`] when the data file cannot be rendered.
pub fn generate(certification: &Certification, profile: &Profile) -> Result<Vec<DynamicObject>> {
    let file = data_file(certification);
    let rendered = render_yaml(&file, &CertificationData::from(&certification.spec))?;

    Ok(vec![config_map(
        &certification.metadata.namespace,
        NAME,
        standard_labels(profile, "hugo", "data"),
        file,
        rendered,
    )])
}

/// The spec minus the collection binding.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificationData<'a> {
    title: &'a str,
    issuer: &'a str,
    earned_date: &'a str,
    alias: &'a str,
    #[serde(rename = "validationURL")]
    validation_url: &'a str,
    #[serde(rename = "imageURL")]
    image_url: &'a str,
}

impl<'a> From<&'a CertificationSpec> for CertificationData<'a> {
    fn from(spec: &'a CertificationSpec) -> Self {
        Self {
            title: &spec.title,
            issuer: &spec.issuer,
            earned_date: &spec.earned_date,
            alias: &spec.alias,
            validation_url: &spec.validation_url,
            image_url: &spec.image_url,
        }
    }
}
