//! HTTP client for the Grafana dashboards API

use crate::dashboard::{parse_search_results, DashboardDocument, RemoteDashboardRef};
use crate::error::{StoreError, StoreResult};
use crate::slug::Slug;
use crate::store::DashboardStore;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use std::fmt;
use url::Url;

const SEARCH_PATH: &str = "/api/search";
const IMPORT_PATH: &str = "/api/dashboards/import";
const DASHBOARDS_PATH: &str = "/api/dashboards/db";

/// How requests authenticate against Grafana
#[derive(Clone, PartialEq, Eq)]
pub enum GrafanaAuth {
    /// `Authorization: Bearer <key>`
    ApiKey(String),
    /// HTTP basic auth
    Basic { username: String, password: String },
}

impl GrafanaAuth {
    pub fn api_key(key: impl Into<String>) -> StoreResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidCredentials(
                "an API key is required to authenticate against the Grafana API".into(),
            ));
        }
        Ok(Self::ApiKey(key))
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> StoreResult<Self> {
        let username = username.into();
        if username.is_empty() {
            return Err(StoreError::InvalidCredentials(
                "a username is required to authenticate against the Grafana API".into(),
            ));
        }
        Ok(Self::Basic {
            username,
            password: password.into(),
        })
    }

    /// Basic auth when a user name or password is given, the API key otherwise
    pub fn from_credentials(
        api_key: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> StoreResult<Self> {
        let username = username.unwrap_or_default();
        let password = password.unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            Self::api_key(api_key.unwrap_or_default())
        } else {
            Self::basic(username, password)
        }
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => request.bearer_auth(key),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

impl fmt::Debug for GrafanaAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// [`DashboardStore`] backed by the Grafana HTTP API
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    client: Client,
    base_url: String,
    auth: GrafanaAuth,
}

impl GrafanaClient {
    /// Create a client for the Grafana instance at `base_url`.
    ///
    /// The `reqwest::Client` is injected so timeouts, proxies and TLS
    /// settings stay with the caller.
    pub fn new(base_url: &str, auth: GrafanaAuth, client: Client) -> StoreResult<Self> {
        let parsed = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                base_url,
                parsed.scheme()
            )));
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        self.auth.authenticate(request)
    }

    async fn post_import(&self, dashboard: &DashboardDocument, overwrite: bool) -> StoreResult<()> {
        let response = self
            .request(reqwest::Method::POST, IMPORT_PATH)
            .json(&dashboard.import_payload(overwrite))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

/// Pass success responses through, turn everything else into [`StoreError::Api`]
async fn check_status(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DashboardStore for GrafanaClient {
    async fn search(&self, tags: &[String]) -> StoreResult<Vec<RemoteDashboardRef>> {
        let query: Vec<(&str, &str)> = tags.iter().map(|t| ("tag", t.as_str())).collect();
        let response = self
            .request(reqwest::Method::GET, SEARCH_PATH)
            .query(&query)
            .send()
            .await?;
        let body = check_status(response).await?.bytes().await?;
        let hits = parse_search_results(&body)?;

        tracing::debug!(tags = ?tags, hits = hits.len(), "Searched dashboards");
        Ok(hits)
    }

    async fn import(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        self.post_import(dashboard, false).await
    }

    async fn import_and_overwrite(&self, dashboard: &DashboardDocument) -> StoreResult<()> {
        self.post_import(dashboard, true).await
    }

    async fn delete(&self, slug: &Slug) -> StoreResult<()> {
        let path = format!("{}/{}", DASHBOARDS_PATH, slug);
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("dashboard {}", slug)));
        }
        check_status(response).await.map(|_| ())
    }
}
