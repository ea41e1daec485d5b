use super::RegistryLookup;
use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";

#[derive(Deserialize)]
struct PypiRelease {
    info: PypiInfo,
}

#[derive(Deserialize)]
struct PypiInfo {
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

/// Reads `requires_dist` from the PyPI JSON API
/// (`{base}/{name}/{version}/json`).
pub struct PypiRegistry {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl PypiRegistry {
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_PYPI_URL, Duration::from_secs(10), 3)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_settings(
            &config.registry_url,
            Duration::from_secs(config.request_timeout_secs),
            config.max_retries,
        )
    }

    pub fn with_settings(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let user_agent = format!("depscan/{}", env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
        })
    }

    fn release_url(&self, name: &str, version: &str) -> Result<String> {
        validate_url_component(name, "package name")?;
        validate_url_component(version, "version")?;
        Ok(format!("{}/{}/{}/json", self.base_url, name, version))
    }

    async fn fetch(&self, url: &str, name: &str, version: &str) -> Result<PypiRelease> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::PackageNotFound {
                name: name.to_string(),
                version: version.to_string(),
            }),
            status if !status.is_success() => Err(Error::Registry(format!(
                "PyPI returned status {} for {}",
                status, url
            ))),
            _ => Ok(response.json().await?),
        }
    }
}

#[async_trait]
impl RegistryLookup for PypiRegistry {
    async fn requirements(&self, name: &str, version: &str) -> Result<Vec<String>> {
        let url = self.release_url(name, version)?;
        let mut attempt = 1;

        loop {
            match self.fetch(&url, name, version).await {
                Ok(release) => return Ok(release.info.requires_dist.unwrap_or_default()),
                // Not-found is an answer, not a transient failure.
                Err(e @ Error::PackageNotFound { .. }) => return Err(e),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    debug!(url = %url, attempt, error = %e, "PyPI request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Rejects components that would change the request path.
fn validate_url_component(component: &str, kind: &str) -> Result<()> {
    if component.is_empty() {
        return Err(Error::Registry(format!("empty {}", kind)));
    }
    if component.contains(['/', '\\', '#', '?', '@']) || component.contains("..") {
        return Err(Error::Registry(format!(
            "{} '{}' contains characters not allowed in a registry path",
            kind, component
        )));
    }
    Ok(())
}
