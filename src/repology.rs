//! Repology - cross-distribution package version catalog

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://repology.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Newest version the catalog knows for `name`, trying each repository in
    /// turn. `Ok(None)` means not found.
    async fn latest_version(&self, name: &str, repositories: &[&str]) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct RepologyPackage {
    #[serde(default)]
    version: String,
    #[serde(default)]
    status: String,
}

pub struct RepologyClient {
    client: reqwest::Client,
    base_url: String,
}

impl RepologyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("brewmaint/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn query(&self, name: &str, repository: &str) -> Result<Option<String>> {
        let url = format!("{}/tools/project-by", self.base_url);
        debug!("Querying Repology for {} in {}", name, repository);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("repo", repository),
                ("name_type", "srcname"),
                ("target_page", "api_v1_project"),
                ("name", name),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let packages: Vec<RepologyPackage> = response.error_for_status()?.json().await?;
        Ok(newest_version(&packages))
    }
}

fn newest_version(packages: &[RepologyPackage]) -> Option<String> {
    packages
        .iter()
        .find(|p| p.status == "newest" && !p.version.is_empty())
        .map(|p| p.version.clone())
}

#[async_trait]
impl Catalog for RepologyClient {
    async fn latest_version(&self, name: &str, repositories: &[&str]) -> Result<Option<String>> {
        for repository in repositories {
            if let Some(version) = self.query(name, repository).await? {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }
}
