//! Objects rendered for a `Profile`: the site's config and data, the web and
//! PDF deployments, their services and the public ingress.

use resume_core::DynamicObject;
use serde::Serialize;
use serde_json::json;

use super::{
    candidate_label, certification, config_map, deployment_gvk, experience, ingress_gvk,
    labels_value, object, render_yaml, selector_labels, service_gvk, standard_labels,
};
use crate::error::{ApiError, Result};
use crate::v1alpha1::{Profile, SkillFamily};

pub const CONFIG_NAME: &str = "resume-config";
pub const PROFILE_NAME: &str = "resume-profile";
pub const WEB_NAME: &str = "resume";
pub const WEB_SERVICE_NAME: &str = "resume-svc";
pub const PDF_NAME: &str = "pdf-converter";
pub const PDF_SERVICE_NAME: &str = "pdf-converter-svc";
pub const INGRESS_NAME: &str = "resume";

const WEB_PORT: u16 = 8080;
const HUGO_PORT: u16 = 1313;
const PDF_PORT: u16 = 3000;

type Generator = fn(&Profile) -> Result<DynamicObject>;

const GENERATORS: [Generator; 7] = [
    site_config,
    site_profile,
    web_deployment,
    pdf_deployment,
    pdf_service,
    web_service,
    ingress,
];

/// Every child of `profile`, in creation order.
///
/// # Errors
///
/// Returns [`ApiError::Render`] when a data file cannot be rendered.
pub fn generate(profile: &Profile) -> Result<Vec<DynamicObject>> {
    GENERATORS.iter().map(|generate| generate(profile)).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteConfig<'a> {
    #[serde(rename = "baseURL")]
    base_url: String,
    title: &'a str,
    params: SiteParams<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteParams<'a> {
    page_count: &'a str,
}

fn site_config(profile: &Profile) -> Result<DynamicObject> {
    let config = SiteConfig {
        base_url: format!("https://{}/", profile.spec.base_url),
        title: &profile.spec.page_title,
        params: SiteParams {
            page_count: &profile.spec.page_count,
        },
    };
    let rendered = toml::to_string(&config).map_err(|e| ApiError::render("config.toml", e))?;
    Ok(config_map(
        &profile.metadata.namespace,
        CONFIG_NAME,
        standard_labels(profile, "hugo", "data"),
        "config.toml".to_string(),
        rendered,
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData<'a> {
    basic_info: BasicInfo<'a>,
    overview: &'a str,
    core_competencies: &'a [String],
    projects: &'a [String],
    skills: &'a [SkillFamily],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BasicInfo<'a> {
    first_name: &'a str,
    last_name: &'a str,
    photo: &'static str,
    contacts: Vec<Contact<'a>>,
}

#[derive(Serialize)]
struct Contact<'a> {
    icon: &'static str,
    info: &'a str,
}

fn contacts(profile: &Profile) -> Vec<Contact<'_>> {
    let details = &profile.spec.profile;
    let optional = [
        ("fa-solid fa-phone", details.phone_number.as_str()),
        ("fa-solid fa-envelope", details.email.as_str()),
        ("fa-brands fa-linkedin", details.linkedin_url.as_str()),
        ("fa-brands fa-github", details.github_url.as_str()),
    ];
    optional
        .into_iter()
        .filter(|(_, info)| !info.is_empty())
        .chain(std::iter::once(("fa-solid fa-map-marker-alt", details.location.as_str())))
        .map(|(icon, info)| Contact { icon, info })
        .collect()
}

fn site_profile(profile: &Profile) -> Result<DynamicObject> {
    let details = &profile.spec.profile;
    let data = ProfileData {
        basic_info: BasicInfo {
            first_name: &details.first_name,
            last_name: &details.last_name,
            photo: "img/avatar.jpg",
            contacts: contacts(profile),
        },
        overview: &details.overview,
        core_competencies: &details.core_competencies,
        projects: &details.projects,
        skills: &details.skills,
    };
    Ok(config_map(
        &profile.metadata.namespace,
        PROFILE_NAME,
        standard_labels(profile, "hugo", "data"),
        "profile.yaml".to_string(),
        render_yaml("profile.yaml", &data)?,
    ))
}

fn web_deployment(profile: &Profile) -> Result<DynamicObject> {
    let labels = standard_labels(profile, "hugo", "webfront");
    let mut pod_labels = labels.clone();
    pod_labels.insert(candidate_label(), profile.candidate());
    let image = &profile.spec.web.image;

    let spec = json!({
        "replicas": 1,
        "selector": { "matchLabels": labels_value(&selector_labels(profile, "hugo", "webfront")) },
        "template": {
            "metadata": { "labels": labels_value(&pod_labels) },
            "spec": {
                "containers": [{
                    "name": WEB_NAME,
                    "image": image.reference(),
                    "imagePullPolicy": image.pull_policy,
                    "args": [
                        "server",
                        format!("--baseURL=https://{}", profile.spec.base_url),
                        "--appendPort=false",
                    ],
                    "ports": [{ "containerPort": HUGO_PORT }],
                    "volumeMounts": [
                        { "name": "profile-mount", "mountPath": "/site/data" },
                        { "name": "experience-mount", "mountPath": "/site/data/experience/" },
                        { "name": "certs-mount", "mountPath": "/site/data/certs" },
                        { "name": "config", "mountPath": "/site/config.toml", "subPath": "config.toml" },
                    ],
                }],
                "volumes": [
                    { "name": "profile-mount", "configMap": { "name": PROFILE_NAME } },
                    { "name": "experience-mount", "configMap": { "name": experience::NAME } },
                    { "name": "certs-mount", "configMap": { "name": certification::NAME } },
                    { "name": "config", "configMap": { "name": CONFIG_NAME } },
                ],
            },
        },
    });
    Ok(object(&deployment_gvk(), &profile.metadata.namespace, WEB_NAME, labels).with_field("spec", spec))
}

fn pdf_deployment(profile: &Profile) -> Result<DynamicObject> {
    let labels = standard_labels(profile, "pdf", "converter");
    let image = &profile.spec.pdf.image;

    let spec = json!({
        "replicas": 1,
        "selector": { "matchLabels": labels_value(&selector_labels(profile, "pdf", "converter")) },
        "template": {
            "metadata": { "labels": labels_value(&labels) },
            "spec": {
                "containers": [{
                    "name": PDF_NAME,
                    "image": image.reference(),
                    "imagePullPolicy": image.pull_policy,
                    "env": [{ "name": "TARGET_URL", "value": format!("http://{WEB_SERVICE_NAME}:{WEB_PORT}") }],
                    "ports": [{ "containerPort": PDF_PORT }],
                    "securityContext": { "capabilities": { "add": ["SYS_ADMIN"] } },
                }],
            },
        },
    });
    Ok(object(&deployment_gvk(), &profile.metadata.namespace, PDF_NAME, labels).with_field("spec", spec))
}

fn pdf_service(profile: &Profile) -> Result<DynamicObject> {
    let spec = json!({
        "selector": labels_value(&selector_labels(profile, "pdf", "converter")),
        "ports": [{ "port": PDF_PORT, "targetPort": PDF_PORT }],
    });
    Ok(object(
        &service_gvk(),
        &profile.metadata.namespace,
        PDF_SERVICE_NAME,
        standard_labels(profile, "pdf", "converter"),
    )
    .with_field("spec", spec))
}

fn web_service(profile: &Profile) -> Result<DynamicObject> {
    let spec = json!({
        "selector": { (candidate_label()): profile.candidate() },
        "ports": [{ "port": WEB_PORT, "targetPort": HUGO_PORT }],
    });
    Ok(object(
        &service_gvk(),
        &profile.metadata.namespace,
        WEB_SERVICE_NAME,
        standard_labels(profile, "hugo", "webfront"),
    )
    .with_field("spec", spec))
}

fn ingress(profile: &Profile) -> Result<DynamicObject> {
    let host = &profile.spec.base_url;
    let spec = json!({
        "ingressClassName": profile.spec.ingress_class,
        "tls": [{ "hosts": [host], "secretName": format!("{INGRESS_NAME}-tls") }],
        "rules": [{
            "host": host,
            "http": {
                "paths": [{
                    "path": "/",
                    "pathType": "Prefix",
                    "backend": {
                        "service": { "name": WEB_SERVICE_NAME, "port": { "number": WEB_PORT } },
                    },
                }],
            },
        }],
    });

    let mut labels = standard_labels(profile, "hugo", "webfront");
    labels.insert(candidate_label(), profile.candidate());
    let mut ingress = object(&ingress_gvk(), &profile.metadata.namespace, INGRESS_NAME, labels);
    ingress.metadata.annotations.insert(
        "cert-manager.io/cluster-issuer".to_string(),
        profile.spec.cert_issuer.clone(),
    );
    Ok(ingress.with_field("spec", spec))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::indexing_slicing,
        clippy::panic
    )]

    use super::*;
    use crate::v1alpha1::{
        Certification, CertificationSpec, JobExperience, JobExperienceSpec, ProfileSpec,
    };

    fn profile() -> Profile {
        let mut spec = ProfileSpec::default();
        spec.profile.first_name = "Ada".to_string();
        spec.profile.last_name = "Lovelace".to_string();
        spec.profile.email = "ada@example.com".to_string();
        spec.base_url = "ada.dev".to_string();
        Profile::new("team-a", "profile-sample", spec)
    }

    fn file<'a>(object: &'a DynamicObject, name: &str) -> &'a str {
        object.field(&["data", name]).and_then(|v| v.as_str()).unwrap()
    }

    #[test]
    fn test_children_in_creation_order() {
        let names: Vec<_> = generate(&profile())
            .unwrap()
            .into_iter()
            .map(|o| format!("{}/{}", o.kind, o.metadata.name))
            .collect();
        assert_eq!(
            names,
            [
                "ConfigMap/resume-config",
                "ConfigMap/resume-profile",
                "Deployment/resume",
                "Deployment/pdf-converter",
                "Service/pdf-converter-svc",
                "Service/resume-svc",
                "Ingress/resume",
            ]
        );
    }

    #[test]
    fn test_children_live_in_the_profile_namespace() {
        assert!(
            generate(&profile())
                .unwrap()
                .iter()
                .all(|o| o.metadata.namespace == "team-a")
        );
    }

    #[test]
    fn test_site_config_is_toml() {
        let config = site_config(&profile()).unwrap();
        let parsed: toml::Table = file(&config, "config.toml").parse().unwrap();
        assert_eq!(parsed["baseURL"].as_str(), Some("https://ada.dev/"));
        assert_eq!(parsed["title"].as_str(), Some("John Doe - CV"));
        assert_eq!(parsed["params"]["pageCount"].as_str(), Some("1"));
    }

    #[test]
    fn test_profile_data_lists_only_present_contacts() {
        let rendered = site_profile(&profile()).unwrap();
        let data: serde_yaml::Value = serde_yaml::from_str(file(&rendered, "profile.yaml")).unwrap();
        let contacts = data["basicInfo"]["contacts"].as_sequence().unwrap();

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0]["info"].as_str(), Some("ada@example.com"));
        assert_eq!(contacts[1]["info"].as_str(), Some("South Carolina"));
        assert_eq!(data["basicInfo"]["firstName"].as_str(), Some("Ada"));
    }

    #[test]
    fn test_web_service_selects_the_web_pods() {
        let profile = profile();
        let service = web_service(&profile).unwrap();
        let deployment = web_deployment(&profile).unwrap();
        let selector = service.field(&["spec", "selector"]).unwrap().as_object().unwrap();
        let pod_labels = deployment
            .field(&["spec", "template", "metadata", "labels"])
            .unwrap();

        assert!(!selector.is_empty());
        for (key, value) in selector {
            assert_eq!(&pod_labels[key], value);
        }
    }

    #[test]
    fn test_web_deployment_image_and_args() {
        let deployment = web_deployment(&profile()).unwrap();
        let container = &deployment.field(&["spec", "template", "spec", "containers"]).unwrap()[0];
        assert_eq!(container["image"], "jefedavis/resume:latest");
        assert_eq!(container["args"][1], "--baseURL=https://ada.dev");
    }

    #[test]
    fn test_web_deployment_mounts_every_site_data_map() {
        let profile = profile();
        let job = JobExperience::new(
            "team-a",
            "acme",
            JobExperienceSpec { employer: "Acme".to_string(), ..JobExperienceSpec::default() },
        );
        let cert = Certification::new(
            "team-a",
            "cka",
            CertificationSpec { alias: "cka".to_string(), ..CertificationSpec::default() },
        );
        let experience_map = experience::generate(&job, &profile).unwrap().remove(0);
        let cert_map = certification::generate(&cert, &profile).unwrap().remove(0);

        let deployment = web_deployment(&profile).unwrap();
        let pod = deployment.field(&["spec", "template", "spec"]).unwrap();
        let mount_of = |map: &str| {
            let volume = pod["volumes"]
                .as_array()
                .unwrap()
                .iter()
                .find(|v| v["configMap"]["name"] == map)
                .unwrap_or_else(|| panic!("{map} is not a volume"));
            pod["containers"][0]["volumeMounts"]
                .as_array()
                .unwrap()
                .iter()
                .find(|m| m["name"] == volume["name"])
                .map(|m| m["mountPath"].as_str().unwrap().to_string())
                .unwrap_or_else(|| panic!("{map} is not mounted"))
        };

        assert_eq!(mount_of(&experience_map.metadata.name), "/site/data/experience/");
        assert_eq!(mount_of(&cert_map.metadata.name), "/site/data/certs");
        assert_eq!(mount_of(PROFILE_NAME), "/site/data");
        assert_eq!(mount_of(CONFIG_NAME), "/site/config.toml");
    }

    #[test]
    fn test_ingress_routes_the_host_to_the_web_service() {
        let ingress = ingress(&profile()).unwrap();
        let rule = &ingress.field(&["spec", "rules"]).unwrap()[0];
        assert_eq!(rule["host"], "ada.dev");
        assert_eq!(rule["http"]["paths"][0]["backend"]["service"]["name"], "resume-svc");
        assert_eq!(
            ingress.metadata.annotations.get("cert-manager.io/cluster-issuer").map(String::as_str),
            Some("letsencrypt-staging")
        );
    }
}
