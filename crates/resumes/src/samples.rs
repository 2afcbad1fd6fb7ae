//! Sample manifests printed by `init`.

pub const PROFILE: &str = r#"apiVersion: resumes.operator.dev/v1alpha1
kind: Profile
metadata:
  name: profile-sample
  namespace: default
spec:
  profile:
    firstName: "John"
    lastName: "Doe"
    phoneNumber: ""
    email: ""
    linkedinURL: ""
    githubURL: ""
    location: "South Carolina"
    overview: ""
    coreCompetencies: []
    projects: []
    skills: []
  web:
    image:
      registry: ""
      name: "jefedavis/resume"
      tag: "latest"
      pullPolicy: "IfNotPresent"
  baseURL: "example.com"
  pageTitle: "John Doe - CV"
  pageCount: "1"
  pdf:
    image:
      registry: ""
      name: "jefedavis/resume"
      tag: "latest"
      pullPolicy: "IfNotPresent"
  certIssuer: "letsencrypt-staging"
  ingressClass: "nginx"
"#;

pub const PROFILE_REQUIRED: &str = r"apiVersion: resumes.operator.dev/v1alpha1
kind: Profile
metadata:
  name: profile-sample
  namespace: default
spec: {}
";

pub const JOB_EXPERIENCE: &str = r#"apiVersion: resumes.operator.dev/v1alpha1
kind: JobExperience
metadata:
  name: jobexperience-sample
  namespace: default
spec:
  #collection:
  #  name: "profile-sample"
  #  namespace: "default"
  employer: "Employer"
  location: "Location"
  startDate: "2006-01-02"
  endDate: "Present"
  positions:
    - title: "Title"
      startDate: "2006-01-02"
      endDate: "Present"
      highlights:
        - "Highlight"
"#;

pub const JOB_EXPERIENCE_REQUIRED: &str = r#"apiVersion: resumes.operator.dev/v1alpha1
kind: JobExperience
metadata:
  name: jobexperience-sample
  namespace: default
spec:
  employer: "Employer"
"#;

pub const CERTIFICATION: &str = r#"apiVersion: resumes.operator.dev/v1alpha1
kind: Certification
metadata:
  name: certification-sample
  namespace: default
spec:
  #collection:
  #  name: "profile-sample"
  #  namespace: "default"
  title: "Certified Kubernetes Administrator"
  issuer: "The Linux Foundation"
  earnedDate: "2006-01-02"
  alias: "cka"
  validationURL: ""
  imageURL: ""
"#;

pub const CERTIFICATION_REQUIRED: &str = r#"apiVersion: resumes.operator.dev/v1alpha1
kind: Certification
metadata:
  name: certification-sample
  namespace: default
spec:
  alias: "cka"
"#;
