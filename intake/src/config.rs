//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `INTAKE_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `INTAKE_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `INTAKE_UPLOADS__RENAME_ON_STORE=false` sets the `uploads.rename_on_store` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use intake::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 3000
//! upload_dir: ./uploads
//! uploads:
//!   max_total_bytes: 104857600
//!   allowed_content_types: [image/png, image/jpeg, application/pdf]
//!   rename_on_store: true
//! json:
//!   max_body_bytes: 1048576
//!   allow_unknown_fields: false
//! ```

use std::path::PathBuf;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::json::JsonCodecPolicy;
use crate::upload::UploadPolicy;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "INTAKE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty (or missing) config file yields a working server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory uploads are written to and downloads are served from
    pub upload_dir: PathBuf,
    /// Multipart ingestion rules
    pub uploads: UploadPolicy,
    /// JSON body decoding rules
    pub json: JsonCodecPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            uploads: UploadPolicy::default(),
            json: JsonCodecPolicy::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.uploads.max_total_bytes == 0 {
            return Err(Error::invalid_input(
                "Config validation: uploads.max_total_bytes must be greater than zero",
            ));
        }

        if self.json.max_body_bytes == 0 {
            return Err(Error::invalid_input(
                "Config validation: json.max_body_bytes must be greater than zero",
            ));
        }

        if let Some(idx) = self.uploads.allowed_content_types.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::invalid_input(format!(
                "Config validation: uploads.allowed_content_types[{idx}] is blank"
            )));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::invalid_input("Config validation: upload_dir must not be empty"));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables override specific values. INTAKE_CONFIG names the file itself.
            .merge(Env::prefixed("INTAKE_").split("__").ignore(&["config"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
