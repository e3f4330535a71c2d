use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct AccountConfig {
    pub id: &'static str,
    pub name: String,
    pub password: String,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Only accounts with a password set are enabled.
    pub accounts: Vec<AccountConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let jwt_secret = lookup("ENCORE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("ENCORE_JWT_SECRET is unset or still a placeholder");
        }

        let port = var("ENCORE_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("ENCORE_PORT is not a port number: {}", port))?;

        let accounts = [
            ("artist", "ENCORE_ARTIST_PASSWORD", "ENCORE_ARTIST_NAME", "Artist"),
            ("editor", "ENCORE_EDITOR_PASSWORD", "ENCORE_EDITOR_NAME", "Editor"),
        ]
        .into_iter()
        .filter_map(|(id, password_key, name_key, default_name)| {
            let password = lookup(password_key).filter(|p| !p.is_empty())?;
            Some(AccountConfig {
                id,
                name: var(name_key, default_name),
                password,
            })
        })
        .collect();

        Ok(Self {
            host: var("ENCORE_HOST", "0.0.0.0"),
            port,
            db_path: var("ENCORE_DB_PATH", "encore.db").into(),
            jwt_secret,
            accounts,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
