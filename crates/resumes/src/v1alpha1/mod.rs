//! `resumes.operator.dev/v1alpha1`.

use resume_core::GroupVersionKind;

pub const GROUP: &str = "resumes.operator.dev";
pub const VERSION: &str = "v1alpha1";

#[must_use]
pub fn gvk(kind: &str) -> GroupVersionKind {
    GroupVersionKind::new(GROUP, VERSION, kind)
}

/// Implements [`resume_core::Workload`] for a kind with `metadata`, `spec`
/// and `status` fields. Components name the spec field holding their
/// collection reference.
macro_rules! impl_workload {
    ($ty:ty, $kind:literal) => {
        impl_workload!(@impl $ty, $kind, {});
    };
    ($ty:ty, $kind:literal, collection = $field:ident) => {
        impl_workload!(@impl $ty, $kind, {
            fn collection_ref(&self) -> Option<&resume_core::CollectionReference> {
                Some(&self.spec.$field)
            }
        });
    };
    (@impl $ty:ty, $kind:literal, { $($extra:tt)* }) => {
        impl resume_core::Workload for $ty {
            fn gvk() -> resume_core::GroupVersionKind {
                $crate::v1alpha1::gvk($kind)
            }

            fn meta(&self) -> &resume_core::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut resume_core::ObjectMeta {
                &mut self.metadata
            }

            fn status(&self) -> &resume_core::WorkloadStatus {
                &self.status
            }

            fn status_mut(&mut self) -> &mut resume_core::WorkloadStatus {
                &mut self.status
            }

            $($extra)*
        }
    };
}

pub(crate) use impl_workload;

mod certification;
mod job_experience;
mod profile;

pub use certification::{Certification, CertificationSpec};
pub use job_experience::{JobExperience, JobExperienceSpec, Position};
pub use profile::{Image, ImageHolder, Profile, ProfileDetails, ProfileSpec, SkillFamily};
