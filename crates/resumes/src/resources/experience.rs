use resume_core::DynamicObject;
use serde::Serialize;

use super::{config_map, render_yaml, standard_labels};
use crate::error::Result;
use crate::v1alpha1::{JobExperience, Position, Profile};

pub const NAME: &str = "resume-experience";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExperienceData<'a> {
    employer: &'a str,
    location: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    positions: &'a [Position],
}

/// The key this experience occupies in the shared `resume-experience` map.
#[must_use]
pub fn data_file(experience: &JobExperience) -> String {
    format!("{}.yaml", experience.employer_slug())
}

/// The shared ConfigMap `resume-experience` carrying only this experience's
/// `<employer-slug>.yaml`. Applying it merges the file in beside the ones
/// other experiences wrote.
///
/// # Errors
///
/// Returns [`crate::ApiError::Render`] when the data file cannot be rendered.
pub fn generate(experience: &JobExperience, profile: &Profile) -> Result<Vec<DynamicObject>> {
    let file = data_file(experience);
    let spec = &experience.spec;
    let data = ExperienceData {
        employer: &spec.employer,
        location: &spec.location,
        start_date: &spec.start_date,
        end_date: &spec.end_date,
        positions: &spec.positions,
    };
    let rendered = render_yaml(&file, &data)?;

    Ok(vec![config_map(
        &experience.metadata.namespace,
        NAME,
        standard_labels(profile, "hugo", "data"),
        file,
        rendered,
    )])
}
