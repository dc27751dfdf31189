//! Configuration file and environment overrides
//!
//! Settings live in a TOML file (`~/.config/collateral-migrate/config.toml`
//! unless `--config` points elsewhere). Secrets may instead come from the
//! environment, which always wins over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{CredentialSet, ResilienceConfig};
use crate::docdb::ContainerRef;
use crate::migration::ClassificationMap;

pub const ENV_CLIENT_ID: &str = "CATALOG_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CATALOG_CLIENT_SECRET";
pub const ENV_DOCDB_KEY: &str = "DOCDB_KEY";

const DEFAULT_SCOPE: &str = "FullAccess";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub docdb: DocDbSection,
    #[serde(default)]
    pub execution: ExecutionSection,
    /// Replaces the built-in classification table when present
    #[serde(default)]
    pub classifications: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSection {
    pub api_url: Option<String>,
    /// Token endpoint host, defaults to `api_url`
    pub auth_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    /// Buyer whose SoldTo user groups are the salons
    pub buyer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocDbSection {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub database: Option<String>,
    pub container: Option<String>,
    pub partition_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_promotion_delay_ms")]
    pub promotion_delay_ms: u64,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_max_concurrent_requests() -> usize {
    20
}

fn default_promotion_delay_ms() -> u64 {
    100
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            promotion_delay_ms: default_promotion_delay_ms(),
            report_dir: default_report_dir(),
        }
    }
}

/// Value of a required setting, treating blank strings as unset
fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("Missing required config value '{}'", key),
    }
}

/// `~/.config/collateral-migrate/config.toml`
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("collateral-migrate")
        .join("config.toml")
}

impl Config {
    /// Load the config file and apply environment overrides.
    ///
    /// An explicit path must exist. A missing default file yields an empty
    /// config, so everything can come from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override secrets with non-empty values from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup(ENV_CLIENT_ID) {
            self.catalog.client_id = Some(v);
        }
        if let Some(v) = lookup(ENV_CLIENT_SECRET) {
            self.catalog.client_secret = Some(v);
        }
        if let Some(v) = lookup(ENV_DOCDB_KEY) {
            self.docdb.key = Some(v);
        }
    }

    pub fn catalog_url(&self) -> Result<&str> {
        require(&self.catalog.api_url, "catalog.api_url")
    }

    pub fn credentials(&self) -> Result<CredentialSet> {
        let api_url = self.catalog_url()?;
        Ok(CredentialSet {
            auth_url: self
                .catalog
                .auth_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(api_url)
                .to_string(),
            client_id: require(&self.catalog.client_id, "catalog.client_id")
                .with_context(|| format!("Set it in the config file or via {}", ENV_CLIENT_ID))?
                .to_string(),
            client_secret: require(&self.catalog.client_secret, "catalog.client_secret")
                .with_context(|| format!("Set it in the config file or via {}", ENV_CLIENT_SECRET))?
                .to_string(),
            scope: self
                .catalog
                .scope
                .clone()
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        })
    }

    pub fn buyer_id(&self) -> Result<&str> {
        require(&self.catalog.buyer_id, "catalog.buyer_id")
            .context("Run the `buyers` command to list the available ids")
    }

    pub fn container_ref(&self) -> Result<ContainerRef> {
        Ok(ContainerRef {
            endpoint: require(&self.docdb.endpoint, "docdb.endpoint")?.to_string(),
            database: require(&self.docdb.database, "docdb.database")?.to_string(),
            container: require(&self.docdb.container, "docdb.container")?.to_string(),
            partition_key: self
                .docdb
                .partition_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn docdb_key(&self) -> Result<&str> {
        require(&self.docdb.key, "docdb.key")
            .with_context(|| format!("Set it in the config file or via {}", ENV_DOCDB_KEY))
    }

    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig::builder()
            .max_concurrent_requests(self.execution.max_concurrent_requests)
            .throttle_delay(Duration::from_millis(self.execution.promotion_delay_ms))
            .build()
    }

    pub fn classification_map(&self) -> ClassificationMap {
        match &self.classifications {
            Some(entries) => ClassificationMap::from_entries(entries.clone()),
            None => ClassificationMap::builtin(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.execution.report_dir
    }
}
