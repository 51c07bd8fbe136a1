// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates the session secret, admin accounts, and panel root before the server starts

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::{AdminAccount, MIN_COOKIE_PASSWORD_LEN};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub admins: Vec<AdminAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_branding")]
    pub branding: String,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    #[serde(default = "default_secure")]
    pub secure: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_root_path() -> String {
    "/admin".to_string()
}

fn default_branding() -> String {
    "Admin Panel".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_secure() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            branding: default_branding(),
            assets_dir: default_assets_dir(),
        }
    }
}

impl Config {
    /// Load from `PANEL_CONFIG_PATH` (or `config.toml`) with environment overrides
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("PANEL_CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load from a specific file. A missing file falls back to defaults so the
    /// whole configuration can come from the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PANEL_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PANEL_PORT") {
            self.server.port = val.parse().with_context(|| {
                format!("PANEL_PORT must be a valid port number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("PANEL_ROOT_PATH") {
            self.panel.root_path = val;
        }
        if let Ok(val) = std::env::var("PANEL_ASSETS_DIR") {
            self.panel.assets_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("PANEL_COOKIE_SECRET") {
            self.session.cookie_secret = Some(val);
        }
        if let Ok(val) = std::env::var("PANEL_COOKIE_NAME") {
            self.session.cookie_name = Some(val);
        }
        if let Ok(val) = std::env::var("PANEL_SECURE_COOKIE") {
            self.session.secure = val.parse().with_context(|| {
                format!("PANEL_SECURE_COOKIE must be true or false, got: {}", val)
            })?;
        }
        if let (Ok(email), Ok(password_hash)) = (
            std::env::var("PANEL_ADMIN_EMAIL"),
            std::env::var("PANEL_ADMIN_PASSWORD_HASH"),
        ) {
            self.admins.push(AdminAccount {
                email,
                password_hash,
                title: None,
            });
        }
        Ok(())
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if !self.panel.root_path.starts_with('/') {
            anyhow::bail!(
                "panel.root_path must start with '/', got: {}",
                self.panel.root_path
            );
        }

        let Some(secret) = self.session.cookie_secret.as_deref() else {
            anyhow::bail!(
                "session.cookie_secret is required (set in config.toml or PANEL_COOKIE_SECRET env var)"
            );
        };
        if secret.len() < MIN_COOKIE_PASSWORD_LEN {
            anyhow::bail!(
                "session.cookie_secret must be at least {} bytes",
                MIN_COOKIE_PASSWORD_LEN
            );
        }

        if self.admins.is_empty() {
            anyhow::bail!("at least one [[admins]] entry is required");
        }
        for admin in &self.admins {
            if admin.email.trim().is_empty() || !admin.password_hash.starts_with("$argon2") {
                anyhow::bail!(
                    "admin {:?} needs an email and an Argon2 password_hash (see `panel-mount hash-password`)",
                    admin.email
                );
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
