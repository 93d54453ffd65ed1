//! HTTP client for the IP intelligence service

use super::{IpInfo, IpIntelligenceProvider};
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// IP intelligence over HTTP: `GET {base_url}/{ip}` answering [`IpInfo`] JSON
pub struct HttpIpIntelligence {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpIpIntelligence {
    /// Create client with a request timeout
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::ProviderSetup(format!("http client: {}", e)))?;

        Ok(HttpIpIntelligence {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl IpIntelligenceProvider for HttpIpIntelligence {
    async fn lookup(&self, ip: &str) -> ProviderResult<IpInfo> {
        let url = format!("{}/{}", self.base_url, ip.trim());

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("ip {}", ip)));
        }
        if !status.is_success() {
            return Err(ProviderError::Backend(format!(
                "ip intelligence returned {} for {}",
                status, ip
            )));
        }

        let info: IpInfo = response.json().await?;
        debug!("IP {} resolved to {:?}/{:?}", ip, info.country, info.city);
        Ok(info)
    }
}
