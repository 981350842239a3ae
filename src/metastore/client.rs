use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use super::{MetastoreApi, MetastoreError};
use crate::config::ConnectionConfig;
use crate::mount::entry::null_default;
use crate::mount::{ClusterInfo, MountEntry, MountTable};

/// Header carrying the router access token
pub const TOKEN_HEADER: &str = "token";

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Body of `POST /mount/list`
#[derive(Debug, Default, Deserialize)]
struct MountListResponse {
    #[serde(rename = "fsConfigs", default, deserialize_with = "null_default")]
    fs_configs: HashMap<String, String>,

    #[serde(rename = "Mounts", alias = "mounts", default, deserialize_with = "null_default")]
    mounts: Vec<MountEntry>,
}

/// HTTP client for the router metastore API
#[derive(Debug, Clone)]
pub struct RouterClient {
    http: Client,
    api_prefix: String,
    token: String,
}

impl RouterClient {
    /// Build a client from resolved connection settings
    pub fn new(config: &ConnectionConfig) -> Result<Self, MetastoreError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| MetastoreError::Request {
                url: config.server_url.clone(),
                source,
            })?;

        Ok(Self::from_client(http, config))
    }

    /// Build a client around an existing reqwest client (useful for testing)
    pub fn from_client(http: Client, config: &ConnectionConfig) -> Self {
        RouterClient {
            http,
            api_prefix: config.server_url.trim_end_matches('/').to_string(),
            token: config.server_token.clone(),
        }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        // A token that is not a valid header value is sent as nothing at all;
        // the router then rejects the request with its own status code.
        if let Ok(value) = HeaderValue::from_str(&self.token) {
            headers.insert(TOKEN_HEADER, value);
        } else {
            tracing::warn!("Server token contains characters not allowed in a header");
        }
        headers
    }

    /// Issue a request against `{api_prefix}{path}` and decode the JSON body
    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, MetastoreError> {
        let url = format!("{}{}", self.api_prefix, path);
        tracing::debug!(%method, %url, "Requesting router metastore");

        let request_error = |source| MetastoreError::Request {
            url: url.clone(),
            source,
        };

        let resp = self
            .http
            .request(method, &url)
            .headers(self.headers())
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        tracing::debug!(%url, status = status.as_u16(), "Router metastore responded");
        if status != StatusCode::OK {
            return Err(MetastoreError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&body).map_err(|source| MetastoreError::Decode { url, source })
    }
}

#[async_trait]
impl MetastoreApi for RouterClient {
    async fn list_mounts(&self) -> Result<MountTable, MetastoreError> {
        let resp: MountListResponse = self.call(Method::POST, "/mount/list").await?;
        tracing::debug!(
            mounts = resp.mounts.len(),
            fs_configs = resp.fs_configs.len(),
            "Fetched mount table"
        );
        Ok(MountTable::new(resp.mounts))
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, MetastoreError> {
        let clusters: Option<Vec<ClusterInfo>> = self.call(Method::GET, "/cluster/meta/list").await?;
        Ok(clusters.unwrap_or_default())
    }
}
