use url::Url;

use crate::error::Result;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Where the backend lives.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub gateway_url: Url,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let gateway_url = gateway_url_for(&base_url)?;
        Ok(Self {
            base_url,
            gateway_url,
        })
    }

    /// Reads `ENCORE_URL`, falling back to a local dev server.
    pub fn from_env() -> Result<Self> {
        let base = std::env::var("ENCORE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self::new(&base)
    }

    /// Absolute URL for an API path such as `/videos`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

fn gateway_url_for(base: &Url) -> Result<Url> {
    let mut url = base.clone();
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| crate::ClientError::Validation(format!("cannot derive gateway url from {}", base)))?;

    let path = format!("{}/gateway", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    Ok(url)
}
