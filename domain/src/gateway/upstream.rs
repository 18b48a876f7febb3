//! HTTP client for the upstream REST service that answers dashboard queries.

use crate::error::{config_source_error, upstream_status_error, Error};
use crate::fetcher::ResourceSource;
use crate::resource::ResourceDescriptor;
use async_trait::async_trait;
use log::*;
use serde_json::Value;

/// Reads one resource per request with a plain `GET {base_url}{path}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Fails when `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        reqwest::Url::parse(base_url).map_err(config_source_error)?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(format!("dashboard-relay/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, descriptor: &ResourceDescriptor) -> String {
        format!("{}{}", self.base_url, descriptor.path())
    }
}

#[async_trait]
impl ResourceSource for HttpSource {
    async fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<Value, Error> {
        let url = self.url_for(descriptor);
        trace!("GET {url}");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_status_error(status.as_u16(), &url));
        }

        Ok(response.json::<Value>().await?)
    }
}
