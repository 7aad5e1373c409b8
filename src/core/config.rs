use std::time::Duration;

use serde::{Deserialize, Serialize};

const TEST_BASE_URL: &str = "https://efaturatest.gbislem.com";
const PRODUCTION_BASE_URL: &str = "https://efatura.gbislem.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GibEnvironment {
    #[default]
    Test,
    Production,
}

impl GibEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Test => TEST_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

/// Credentials and endpoint for one tenant's gateway account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GibConfig {
    #[serde(default)]
    pub environment: GibEnvironment,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Company VKN sent as `vkn` in every envelope.
    pub company_tax_number: String,
    /// GIB mailbox alias (GB/PK label).
    #[serde(default)]
    pub alias: String,
    /// Overrides the environment URL (used against local fakes).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl GibConfig {
    pub fn new(
        environment: GibEnvironment,
        username: impl Into<String>,
        password: impl Into<String>,
        company_tax_number: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            username: username.into(),
            password: password.into(),
            company_tax_number: company_tax_number.into(),
            alias: String::new(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Effective base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.environment.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Supplier identity printed in `AccountingSupplierParty`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub name: String,
    pub tax_number: String,
    #[serde(default)]
    pub tax_office: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_zone: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

fn default_country() -> String {
    "Türkiye".to_string()
}

impl CompanyIdentity {
    pub fn new(name: impl Into<String>, tax_number: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_number: tax_number.into(),
            tax_office: None,
            street: None,
            city: city.into(),
            postal_zone: None,
            country: default_country(),
            phone: None,
            email: None,
            website: None,
        }
    }
}
