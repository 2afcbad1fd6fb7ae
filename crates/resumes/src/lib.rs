//! The resume API: `Profile` collections with their `JobExperience` and
//! `Certification` components, the objects rendered for each, and the
//! handlers that plug them into the reconciler.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod handlers;
pub mod kinds;
pub mod resources;
pub mod samples;
pub mod v1alpha1;

pub use error::{ApiError, Result};
pub use handlers::{CertificationHandler, JobExperienceHandler, ProfileHandler};
pub use kinds::ResumeKind;
pub use v1alpha1::{
    Certification, CertificationSpec, JobExperience, JobExperienceSpec, Position, Profile,
    ProfileSpec,
};
