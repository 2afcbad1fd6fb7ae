//! Reconciliation hooks for the resume kinds.
//!
//! A profile owns its children outright and has no dependencies.
//! Components write one file each into a ConfigMap they share with their
//! siblings, so they hold a non-controlling reference to it and take their
//! file back out when deleted. They wait until their profile reports
//! `status.created`.

use async_trait::async_trait;
use resume_core::{DynamicObject, ObjectKey, ObjectStore, Workload};
use resume_reconciler::{Error, Mutation, Request, RequestFor, Result, WorkloadHandler};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::resources;
use crate::v1alpha1::{Certification, JobExperience, Profile};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileHandler;

#[async_trait]
impl WorkloadHandler for ProfileHandler {
    type Workload = Profile;
    type Collection = Profile;

    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>> {
        let profile = &request.workload;
        profile
            .validate()
            .and_then(|()| resources::profile::generate(profile))
            .map_err(|e| Error::generate(Profile::gvk().kind, e))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JobExperienceHandler;

#[async_trait]
impl WorkloadHandler for JobExperienceHandler {
    type Workload = JobExperience;
    type Collection = Profile;

    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>> {
        let experience = &request.workload;
        let profile = collection(request)?;
        experience
            .validate()
            .and_then(|()| resources::experience::generate(experience, profile))
            .map_err(|e| Error::generate(JobExperience::gvk().kind, e))
    }

    async fn mutate(&self, request: &RequestFor<Self>, object: DynamicObject) -> Result<Mutation> {
        share(request, object)
    }

    async fn check_dependencies(
        &self,
        request: &RequestFor<Self>,
        _store: &dyn ObjectStore,
    ) -> Result<bool> {
        Ok(collection_created(request))
    }

    async fn finalize(&self, request: &RequestFor<Self>, store: &dyn ObjectStore) -> Result<()> {
        let file = resources::experience::data_file(&request.workload);
        release_data_file(request, store, resources::experience::NAME, &file).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CertificationHandler;

#[async_trait]
impl WorkloadHandler for CertificationHandler {
    type Workload = Certification;
    type Collection = Profile;

    fn generate(&self, request: &RequestFor<Self>) -> Result<Vec<DynamicObject>> {
        let certification = &request.workload;
        let profile = collection(request)?;
        certification
            .validate()
            .and_then(|()| resources::certification::generate(certification, profile))
            .map_err(|e| Error::generate(Certification::gvk().kind, e))
    }

    async fn mutate(&self, request: &RequestFor<Self>, object: DynamicObject) -> Result<Mutation> {
        share(request, object)
    }

    async fn check_dependencies(
        &self,
        request: &RequestFor<Self>,
        _store: &dyn ObjectStore,
    ) -> Result<bool> {
        Ok(collection_created(request))
    }

    async fn finalize(&self, request: &RequestFor<Self>, store: &dyn ObjectStore) -> Result<()> {
        let file = resources::certification::data_file(&request.workload);
        release_data_file(request, store, resources::certification::NAME, &file).await
    }
}

fn collection<W: Workload>(request: &Request<W, Profile>) -> Result<&Profile> {
    request.collection.as_ref().ok_or_else(|| {
        let kind = W::gvk().kind;
        Error::generate(kind.clone(), ApiError::MissingCollection { kind })
    })
}

/// Co-own `object` without controlling it. The store keeps it until the
/// last component referencing it is deleted.
fn share<W: Workload>(request: &Request<W, Profile>, mut object: DynamicObject) -> Result<Mutation> {
    let owner = request.workload.to_dynamic()?.owner_reference();
    if !owner.uid.is_empty() && !object.metadata.is_owned_by(&owner.uid) {
        object.metadata.owner_references.push(owner);
    }
    Ok(Mutation::keep(object))
}

/// Drop `file` from the shared ConfigMap `map`. A map that is already gone
/// has nothing left to release.
async fn release_data_file<W: Workload>(
    request: &Request<W, Profile>,
    store: &dyn ObjectStore,
    map: &str,
    file: &str,
) -> Result<()> {
    let key = ObjectKey::new(request.workload.meta().namespace.clone(), map);
    let mut shared = match request
        .context
        .guard(store.get(&resources::config_map_gvk(), &key))
        .await
    {
        Ok(shared) => shared,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    };

    let removed = shared
        .data
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .and_then(|files| files.remove(file))
        .is_some();
    if removed {
        request.context.guard(store.update(shared)).await?;
        debug!(map = %key, file, "Released data file");
    }
    Ok(())
}

fn collection_created<W: Workload>(request: &Request<W, Profile>) -> bool {
    let created = request
        .collection
        .as_ref()
        .is_some_and(|profile| profile.status.created);
    if !created {
        debug!(
            kind = %W::gvk().kind,
            name = %request.workload.meta().name,
            "waiting for profile to be created"
        );
    }
    created
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

    use resume_core::InMemoryStore;
    use resume_reconciler::Context;
    use serde_json::json;
    use tracing::Span;

    use super::*;
    use crate::v1alpha1::{JobExperienceSpec, ProfileSpec};

    fn experience() -> JobExperience {
        JobExperience::new(
            "default",
            "acme",
            JobExperienceSpec {
                employer: "Acme".to_string(),
                ..JobExperienceSpec::default()
            },
        )
    }

    #[tokio::test]
    async fn test_component_waits_for_created_profile() {
        let store = InMemoryStore::new();
        let mut profile = Profile::new("default", "profile-sample", ProfileSpec::default());
        let pending = Request::new(experience(), Some(profile.clone()), Context::background(), Span::none());
        assert!(!JobExperienceHandler.check_dependencies(&pending, &store).await.unwrap());

        profile.status.created = true;
        let ready = Request::new(experience(), Some(profile), Context::background(), Span::none());
        assert!(JobExperienceHandler.check_dependencies(&ready, &store).await.unwrap());
    }

    #[tokio::test]
    async fn test_component_co_owns_its_map_without_controlling_it() {
        let mut job = experience();
        job.metadata.uid = "uid-acme".to_string();
        let profile = Profile::new("default", "profile-sample", ProfileSpec::default());
        let request = Request::new(job, Some(profile), Context::background(), Span::none());

        let map = JobExperienceHandler.generate(&request).unwrap().remove(0);
        let mutation = JobExperienceHandler.mutate(&request, map).await.unwrap();

        assert!(!mutation.skip);
        let owners = &mutation.objects[0].metadata.owner_references;
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "uid-acme");
        assert!(!owners[0].controller);
        assert!(mutation.objects[0].metadata.controller_owner().is_none());
    }

    #[tokio::test]
    async fn test_deleted_component_takes_only_its_file_out_of_the_shared_map() {
        let store = InMemoryStore::new();
        let key = ObjectKey::new("default", resources::experience::NAME);
        let shared = DynamicObject::new(&resources::config_map_gvk(), &key)
            .with_field("data", json!({ "Acme.yaml": "acme", "Initech.yaml": "initech" }));
        store.create(shared).await.unwrap();

        let request = Request::new(experience(), None, Context::background(), Span::none());
        JobExperienceHandler.finalize(&request, &store).await.unwrap();

        let live = store.get(&resources::config_map_gvk(), &key).await.unwrap();
        assert!(live.field(&["data", "Acme.yaml"]).is_none());
        assert_eq!(live.field(&["data", "Initech.yaml"]), Some(&json!("initech")));
    }

    #[tokio::test]
    async fn test_finalize_without_shared_map_succeeds() {
        let store = InMemoryStore::new();
        let request = Request::new(experience(), None, Context::background(), Span::none());
        assert!(JobExperienceHandler.finalize(&request, &store).await.is_ok());
    }

    #[test]
    fn test_component_without_profile_cannot_generate() {
        let request = Request::new(experience(), None, Context::background(), Span::none());
        let err = JobExperienceHandler.generate(&request).unwrap_err();
        assert!(matches!(err, Error::Generate { ref kind, .. } if kind == "JobExperience"));
    }

    #[test]
    fn test_invalid_profile_is_a_generate_error() {
        let mut spec = ProfileSpec::default();
        spec.base_url = String::new();
        let profile = Profile::new("default", "profile-sample", spec);
        let request = Request::new(profile, None, Context::background(), Span::none());

        let err = ProfileHandler.generate(&request).unwrap_err();
        assert!(err.to_string().contains("baseURL"));
    }
}
