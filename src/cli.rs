//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use resume_api::ResumeKind;

use crate::config::LogFormat;

/// Renders Profile, JobExperience and Certification objects into a running
/// resume site.
#[derive(Parser, Debug)]
#[command(name = "resumectl")]
#[command(version)]
pub struct Cli {
    /// Log output format; overrides the config file and environment
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the operator against an in-memory control plane until Ctrl+C
    Run {
        /// Directory of *.yaml manifests to load before starting
        #[arg(short, long)]
        manifests: Option<PathBuf>,

        /// Operator config file (TOML, or JSON by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Workers per controller
        #[arg(long)]
        workers: Option<usize>,

        /// Leave deployments unready instead of reporting them rolled out
        #[arg(long, default_value_t = false)]
        no_rollout: bool,
    },

    /// Print a sample manifest for a kind
    Init {
        /// Profile, JobExperience or Certification
        kind: ResumeKind,

        /// API version of the sample; empty or "latest" for the newest
        #[arg(long)]
        api_version: Option<String>,

        /// Only include required fields
        #[arg(long, default_value_t = false)]
        required_only: bool,
    },

    /// Render the child objects of a manifest as a YAML stream
    Generate {
        kind: ResumeKind,

        /// Manifest of the object to render
        #[arg(short = 'w', long)]
        workload_manifest: PathBuf,

        /// Manifest of the owning Profile; required for components
        #[arg(short = 'c', long)]
        collection_manifest: Option<PathBuf>,
    },

    /// Print CLI and API versions for a kind as JSON
    Version { kind: ResumeKind },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "resumectl",
            "generate",
            "jobexperience",
            "-w",
            "job.yaml",
            "-c",
            "profile.yaml",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate {
                kind,
                workload_manifest,
                collection_manifest,
            } => {
                assert_eq!(kind, ResumeKind::JobExperience);
                assert_eq!(workload_manifest, PathBuf::from("job.yaml"));
                assert_eq!(collection_manifest, Some(PathBuf::from("profile.yaml")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["resumectl", "init", "resume"]).is_err());
    }

    #[test]
    fn test_global_log_format() {
        let cli = Cli::try_parse_from(["resumectl", "version", "profile", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }
}
