//! Configuration for dashsyncd

use crate::error::{DaemonError, DaemonResult};
use dashsync_grafana::GrafanaAuth;
use dashsync_reconciler::ReconcilerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Grafana connection
    #[serde(default)]
    pub grafana: GrafanaConfig,

    /// Configuration document source
    #[serde(default)]
    pub source: SourceConfig,

    /// Reconciliation loop
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Grafana connection configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct GrafanaConfig {
    /// Base URL, e.g. `http://grafana:3000`
    #[serde(default)]
    pub url: String,

    /// API key sent as a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Basic auth user; takes precedence over the API key when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            username: None,
            password: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for GrafanaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("GrafanaConfig")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl GrafanaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Credentials to authenticate with
    pub fn auth(&self) -> DaemonResult<GrafanaAuth> {
        Ok(GrafanaAuth::from_credentials(
            self.api_key.as_deref(),
            self.username.as_deref(),
            self.password.as_deref(),
        )?)
    }
}

/// Where configuration documents come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Watch ConfigMaps through the Kubernetes API
    #[default]
    Kubernetes,
    /// Poll a directory the ConfigMaps are mounted into
    Directory,
}

/// Configuration document source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which source to read documents from
    #[serde(default)]
    pub kind: SourceKind,

    /// Namespace to watch; all namespaces when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Label selector the watched ConfigMaps must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Kubeconfig to connect with; inferred when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Directory the dashboard ConfigMaps are projected into
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Rescan interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            namespace: None,
            selector: None,
            kubeconfig: None,
            documents_dir: default_documents_dir(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_request_timeout() -> u64 {
    30
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("/etc/dashsync/dashboards")
}

fn default_poll_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line; `None` leaves the loaded value alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub grafana_url: Option<String>,
    pub grafana_api_key: Option<String>,
    pub grafana_username: Option<String>,
    pub grafana_password: Option<String>,
    pub marker_tag: Option<String>,
    pub source_kind: Option<SourceKind>,
    pub namespace: Option<String>,
    pub selector: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub documents_dir: Option<PathBuf>,
    pub dry_run: Option<bool>,
    pub log_level: Option<String>,
    pub json: Option<bool>,
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `DASHSYNC_` environment variables (`__` separates sections, e.g.
    /// `DASHSYNC_GRAFANA__URL`).
    pub fn load(path: Option<&str>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DASHSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Apply command line values on top of the loaded configuration
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.grafana_url {
            self.grafana.url = url;
        }
        if let Some(key) = overrides.grafana_api_key {
            self.grafana.api_key = Some(key);
        }
        if let Some(username) = overrides.grafana_username {
            self.grafana.username = Some(username);
        }
        if let Some(password) = overrides.grafana_password {
            self.grafana.password = Some(password);
        }
        if let Some(tag) = overrides.marker_tag {
            self.reconciler.marker_tag = tag;
        }
        if let Some(kind) = overrides.source_kind {
            self.source.kind = kind;
        }
        if let Some(namespace) = overrides.namespace {
            self.source.namespace = Some(namespace);
        }
        if let Some(selector) = overrides.selector {
            self.source.selector = Some(selector);
        }
        if let Some(kubeconfig) = overrides.kubeconfig {
            self.source.kubeconfig = Some(kubeconfig);
        }
        if let Some(dir) = overrides.documents_dir {
            self.source.documents_dir = dir;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.reconciler.dry_run = dry_run;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(json) = overrides.json {
            self.logging.json = json;
        }
    }

    /// Reject configurations the daemon cannot start with
    pub fn validate(&self) -> DaemonResult<()> {
        if self.grafana.url.trim().is_empty() {
            return Err(DaemonError::Config("a Grafana URL is required".into()));
        }
        if self.grafana.request_timeout_secs == 0 {
            return Err(DaemonError::Config(
                "request timeout must be at least one second".into(),
            ));
        }
        if self.source.poll_interval_secs == 0 {
            return Err(DaemonError::Config(
                "document poll interval must be at least one second".into(),
            ));
        }
        self.reconciler.validate()?;
        self.grafana.auth()?;
        Ok(())
    }
}
