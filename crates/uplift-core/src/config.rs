use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::auth::Credentials;
use crate::error::ErrorCode;
use crate::model::wire::DEFAULT_COMMENT;

/// Fully resolved dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL of the dashboard backend (serves `/analysis`, `/bugs`).
    pub backend_url: String,
    /// Base URL of the bug tracker REST API (serves `/bug`).
    pub bugzilla_url: String,
    /// Comment posted when the reviewer leaves the comment field empty.
    pub default_comment: String,
    #[serde(skip_serializing)]
    pub credentials: Option<Credentials>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            bugzilla_url: default_bugzilla_url(),
            default_comment: DEFAULT_COMMENT.to_string(),
            credentials: None,
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub fn backend(&self, path: &str) -> String {
        join_url(&self.backend_url, path)
    }

    #[must_use]
    pub fn tracker(&self, path: &str) -> String {
        join_url(&self.bugzilla_url, path)
    }
}

/// One source of settings; unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub bugzilla_url: Option<String>,
    #[serde(default)]
    pub default_comment: Option<String>,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl ConfigLayer {
    /// Fill unset fields of `self` from `lower`.
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        Self {
            backend_url: self.backend_url.or(lower.backend_url),
            bugzilla_url: self.bugzilla_url.or(lower.bugzilla_url),
            default_comment: self.default_comment.or(lower.default_comment),
            credentials: self.credentials.or(lower.credentials),
        }
    }

    /// Overrides from `UPLIFT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(|key| env::var(key).ok())
    }

    fn from_env_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let credentials = match (non_empty("UPLIFT_CLIENT_ID"), non_empty("UPLIFT_ACCESS_TOKEN")) {
            (Some(client_id), Some(access_token)) => Some(Credentials {
                client_id,
                access_token,
            }),
            _ => None,
        };
        Self {
            backend_url: non_empty("UPLIFT_BACKEND_URL"),
            bugzilla_url: non_empty("UPLIFT_BUGZILLA_URL"),
            default_comment: None,
            credentials,
        }
    }
}

fn load_layer(path: &Path) -> Result<ConfigLayer> {
    if !path.exists() {
        return Ok(ConfigLayer::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ConfigLayer>(&content).with_context(|| {
        format!(
            "{} ({}): {}",
            ErrorCode::ConfigParseError.message(),
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })
}

pub fn load_project_config(project_root: &Path) -> Result<ConfigLayer> {
    load_layer(&project_root.join(".uplift/config.toml"))
}

pub fn load_user_config() -> Result<ConfigLayer> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigLayer::default());
    };
    load_layer(&config_dir.join("uplift/config.toml"))
}

/// Resolve settings with precedence env > project > user > defaults.
pub fn resolve_config(project_root: &Path) -> Result<DashboardConfig> {
    let layered = ConfigLayer::from_env()
        .or(load_project_config(project_root)?)
        .or(load_user_config()?);
    finish(layered)
}

fn finish(layer: ConfigLayer) -> Result<DashboardConfig> {
    let defaults = DashboardConfig::default();
    let config = DashboardConfig {
        backend_url: normalize_url(layer.backend_url.unwrap_or(defaults.backend_url)),
        bugzilla_url: normalize_url(layer.bugzilla_url.unwrap_or(defaults.bugzilla_url)),
        default_comment: layer
            .default_comment
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(defaults.default_comment),
        credentials: layer.credentials,
    };

    if config.backend_url.is_empty() || config.bugzilla_url.is_empty() {
        bail!(
            "{} ({})",
            ErrorCode::MissingEndpoint.message(),
            ErrorCode::MissingEndpoint.code()
        );
    }
    Ok(config)
}

fn normalize_url(raw: String) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_bugzilla_url() -> String {
    "https://bugzilla.mozilla.org/rest".to_string()
}
