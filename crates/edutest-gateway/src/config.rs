//! Gateway configuration and factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use edutest_core::traits::TestGateway;

use crate::credentials::Credentials;
use crate::directory::DirectoryGateway;
use crate::http::{HttpGateway, DEFAULT_TIMEOUT_SECS};

/// Where test definitions come from.
///
/// Note: Custom Debug impl masks tokens to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayConfig {
    Http {
        base_url: String,
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default)]
        refresh_token: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    Directory {
        #[serde(default = "default_quiz_dir")]
        path: PathBuf,
    },
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayConfig::Http {
                base_url,
                access_token,
                refresh_token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("access_token", &access_token.as_ref().map(|_| "***"))
                .field("refresh_token", &refresh_token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            GatewayConfig::Directory { path } => {
                f.debug_struct("Directory").field("path", path).finish()
            }
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::Directory {
            path: default_quiz_dir(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_quiz_dir() -> PathBuf {
    PathBuf::from("./quizzes")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./edutest-results")
}

/// Top-level edutest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdutestConfig {
    /// Gateway to load tests through.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Where graded attempt reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for EdutestConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a gateway config. Tokens that resolve to nothing are
/// dropped.
fn resolve_gateway_config(config: &GatewayConfig) -> GatewayConfig {
    let resolve_token = |t: &Option<String>| {
        t.as_ref()
            .map(|t| resolve_env_vars(t))
            .filter(|t| !t.is_empty())
    };
    match config {
        GatewayConfig::Http {
            base_url,
            access_token,
            refresh_token,
            timeout_secs,
        } => GatewayConfig::Http {
            base_url: resolve_env_vars(base_url),
            access_token: resolve_token(access_token),
            refresh_token: resolve_token(refresh_token),
            timeout_secs: *timeout_secs,
        },
        GatewayConfig::Directory { path } => GatewayConfig::Directory {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `edutest.toml` in the current directory
/// 2. `~/.config/edutest/config.toml`
///
/// Environment variable overrides: `EDUTEST_API_URL`, `EDUTEST_TOKEN`.
pub fn load_config() -> Result<EdutestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<EdutestConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("edutest.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<EdutestConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => EdutestConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.gateway = resolve_gateway_config(&config.gateway);

    Ok(config)
}

fn apply_env_overrides(config: &mut EdutestConfig) {
    if let Ok(url) = std::env::var("EDUTEST_API_URL") {
        match &mut config.gateway {
            GatewayConfig::Http { base_url, .. } => *base_url = url,
            other => {
                *other = GatewayConfig::Http {
                    base_url: url,
                    access_token: None,
                    refresh_token: None,
                    timeout_secs: DEFAULT_TIMEOUT_SECS,
                };
            }
        }
    }

    if let Ok(token) = std::env::var("EDUTEST_TOKEN") {
        if let GatewayConfig::Http { access_token, .. } = &mut config.gateway {
            *access_token = Some(token);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("edutest"))
}

/// Create a gateway instance from its configuration.
pub fn create_gateway(config: &GatewayConfig) -> Result<Box<dyn TestGateway>> {
    match config {
        GatewayConfig::Http {
            base_url,
            access_token,
            refresh_token,
            timeout_secs,
        } => {
            let mut gateway = HttpGateway::new(base_url, Some(*timeout_secs))?;
            if let Some(token) = access_token {
                let mut creds = Credentials::new(token.clone());
                if let Some(refresh) = refresh_token {
                    creds = creds.with_refresh_token(refresh.clone());
                }
                gateway = gateway.with_credentials(creds);
            }
            Ok(Box::new(gateway))
        }
        GatewayConfig::Directory { path } => Ok(Box::new(DirectoryGateway::new(path.clone()))),
    }
}
