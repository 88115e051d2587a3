//! Homebrew JSON API client with in-memory caching.
//!
//! [`BrewApi`] loads formula and cask definitions from the public JSON API
//! (`https://formulae.brew.sh/api` unless `HOMEBREW_API_DOMAIN` says
//! otherwise). The bump report only needs a narrow slice of each definition:
//! names, tap, version, lifecycle flags and, for casks, the per-platform
//! `variations` used to re-resolve a cask under another architecture.
//!
//! Lookups are cached for the lifetime of the client so a run that touches
//! the same package twice (formula/cask name collisions, `--installed` plus
//! explicit names) only fetches it once.

use crate::error::{MaintError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Homebrew formula metadata from JSON API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub tap: Option<String>,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub stable: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
}

/// Fields a cask overrides on a specific platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaskVariation {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

/// Cask metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cask {
    pub token: String,
    #[serde(default)]
    pub full_token: String,
    #[serde(default)]
    pub tap: Option<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub artifacts: Vec<serde_json::Value>,
    /// Keyed by bottle-style platform tag (`arm64_sonoma`, `sonoma`, ...)
    #[serde(default)]
    pub variations: BTreeMap<String, CaskVariation>,
}

/// Homebrew API client with in-memory caching
#[derive(Clone)]
pub struct BrewApi {
    client: reqwest::Client,
    base_url: String,
    formula_cache: moka::future::Cache<String, Formula>,
    cask_cache: moka::future::Cache<String, Cask>,
}

impl BrewApi {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("brewmaint/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            formula_cache: moka::future::Cache::new(1000),
            cask_cache: moka::future::Cache::new(500),
        })
    }

    /// Fetch metadata for a specific formula by name
    pub async fn fetch_formula(&self, name: &str) -> Result<Formula> {
        if let Some(cached) = self.formula_cache.get(name).await {
            return Ok(cached);
        }

        let url = format!("{}/formula/{}.json", self.base_url, name);
        tracing::debug!("Fetching {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MaintError::FormulaNotFound(name.to_string()));
        }

        let formula: Formula = response.error_for_status()?.json().await?;

        self.formula_cache
            .insert(name.to_string(), formula.clone())
            .await;

        Ok(formula)
    }

    /// Fetch specific cask by token
    pub async fn fetch_cask(&self, token: &str) -> Result<Cask> {
        if let Some(cached) = self.cask_cache.get(token).await {
            return Ok(cached);
        }

        let url = format!("{}/cask/{}.json", self.base_url, token);
        tracing::debug!("Fetching {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MaintError::CaskNotFound(token.to_string()));
        }

        let cask: Cask = response.error_for_status()?.json().await?;

        self.cask_cache
            .insert(token.to_string(), cask.clone())
            .await;

        Ok(cask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_formula() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/formula/wget.json")
            .with_status(200)
            .with_body(
                r#"{"name":"wget","full_name":"wget","tap":"homebrew/core",
                    "versions":{"stable":"1.25.0","head":"HEAD","bottle":true},
                    "revision":1,"deprecated":false,"disabled":false,"desc":"ignored"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let api = BrewApi::new(&server.url()).unwrap();
        let formula = api.fetch_formula("wget").await.unwrap();
        assert_eq!(formula.versions.stable.as_deref(), Some("1.25.0"));
        assert_eq!(formula.tap.as_deref(), Some("homebrew/core"));

        // Second lookup is served from the cache
        api.fetch_formula("wget").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_cask_variations() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cask/foo.json")
            .with_status(200)
            .with_body(
                r#"{"token":"foo","full_token":"foo","tap":"homebrew/cask","version":"2.0",
                    "variations":{"sonoma":{"version":"1.9","url":"https://example.com/x86"}}}"#,
            )
            .create_async()
            .await;

        let api = BrewApi::new(&server.url()).unwrap();
        let cask = api.fetch_cask("foo").await.unwrap();
        assert_eq!(cask.version.as_deref(), Some("2.0"));
        assert_eq!(cask.variations["sonoma"].version.as_deref(), Some("1.9"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/formula/nope.json")
            .with_status(404)
            .create_async()
            .await;

        let api = BrewApi::new(&server.url()).unwrap();
        assert!(matches!(
            api.fetch_formula("nope").await,
            Err(MaintError::FormulaNotFound(_))
        ));
    }
}
