//! Server configuration.
//!
//! Sources are layered in this order, later ones winning:
//! 1. built-in defaults
//! 2. `config/default.toml`
//! 3. `config/{EFATURA_ENV}.toml` (`EFATURA_ENV` defaults to `development`)
//! 4. environment variables prefixed `EFATURA__`, e.g. `EFATURA__GIB__USERNAME`

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::core::{CompanyIdentity, EFaturaError, GibConfig};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, EFaturaError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EFaturaError::Config(format!("server address: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gib: GibConfig,
    pub company: CompanyIdentity,
    /// Seconds between incoming-invoice polls; 0 disables the poller.
    pub poll_incoming_secs: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl AppConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_incoming_secs > 0).then(|| Duration::from_secs(self.poll_incoming_secs))
    }

    fn validate(&self) -> Result<(), EFaturaError> {
        if self.gib.username.trim().is_empty() || self.gib.password.is_empty() {
            return Err(EFaturaError::Config("gib.username and gib.password are required".into()));
        }
        if !crate::core::is_valid_vkn(&self.gib.company_tax_number) {
            return Err(EFaturaError::Config(
                "gib.company_tax_number must be a 10-digit VKN".into(),
            ));
        }
        if self.company.name.trim().is_empty() {
            return Err(EFaturaError::Config("company.name is required".into()));
        }
        Ok(())
    }
}

/// Name of the active configuration profile, from `EFATURA_ENV`.
pub fn run_environment() -> String {
    resolve_environment(env::var("EFATURA_ENV").ok())
}

fn resolve_environment(var: Option<String>) -> String {
    var.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Load configuration from the layered sources.
///
/// Runs before the subscriber exists, so it does not log.
pub fn load_config() -> Result<AppConfig, EFaturaError> {
    let run_env = run_environment();
    let files = [format!("{CONFIG_DIR}/default"), format!("{CONFIG_DIR}/{run_env}")];
    build_config(&files, Environment::with_prefix("EFATURA").separator("__"))
}

fn build_config(files: &[String], environment: Environment) -> Result<AppConfig, EFaturaError> {
    let mut builder = Config::builder()
        .set_default("server.host", "0.0.0.0")
        .and_then(|b| b.set_default("server.port", 8080))
        .and_then(|b| b.set_default("poll_incoming_secs", 0))
        .and_then(|b| b.set_default("log_level", "info"))
        .and_then(|b| b.set_default("log_json", false))
        .map_err(config_error)?;
    for file in files {
        builder = builder.add_source(File::with_name(file).required(false));
    }

    let app: AppConfig = builder
        .add_source(environment)
        .build()
        .and_then(|c| c.try_deserialize::<AppConfig>())
        .map_err(config_error)?;
    app.validate()?;
    Ok(app)
}

fn config_error(e: config::ConfigError) -> EFaturaError {
    EFaturaError::Config(e.to_string())
}
