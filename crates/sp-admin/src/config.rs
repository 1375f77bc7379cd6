//! Configuration for the SearchParameter admin tool.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SP_LOG_LEVEL` | info | Log level |
//! | `SP_CATALOGUES` | | Extension catalogue files (comma-separated) |
//! | `SP_FINGERPRINT_FILE` | | Previously recorded fingerprints (JSON object) |

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SearchParameter registry host and inspection tool.
#[derive(Debug, Clone, Parser)]
#[command(name = "sp-admin")]
#[command(about = "Hosts and inspects the FHIR SearchParameter registry")]
pub struct AdminConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SP_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Extension catalogues merged after the embedded base catalogue.
    #[arg(
        long = "catalogue",
        env = "SP_CATALOGUES",
        value_delimiter = ',',
        global = true
    )]
    pub catalogues: Vec<PathBuf>,

    /// JSON object of resource type to fingerprint, recorded when search
    /// indexes were last built.
    #[arg(long = "fingerprints", env = "SP_FINGERPRINT_FILE", global = true)]
    pub fingerprint_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load the registry, report drift, and hold it until Ctrl-C.
    Serve,
    /// Print every resource type fingerprint as JSON.
    Fingerprints,
    /// List the parameters of a resource type, or describe one.
    Params {
        /// Resource type, e.g. Patient.
        resource_type: String,
        /// Parameter code, e.g. name.
        code: Option<String>,
    },
    /// Print resource types whose fingerprints differ from the recorded ones.
    Drift,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl AdminConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        for path in &self.catalogues {
            if !path.is_file() {
                errors.push(format!("Catalogue file not found: {}", path.display()));
            }
        }

        if matches!(self.command, Command::Drift) && self.fingerprint_file.is_none() {
            errors.push("The drift command requires --fingerprints".to_string());
        }

        if let Some(path) = &self.fingerprint_file {
            if !path.is_file() {
                errors.push(format!("Fingerprint file not found: {}", path.display()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
