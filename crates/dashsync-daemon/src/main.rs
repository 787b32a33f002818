//! Dashsync Daemon - Grafana dashboard reconciler
//!
//! Keeps the dashboards of a Grafana instance in line with the dashboards
//! declared in ConfigMaps, watched through the Kubernetes API or mounted
//! into the pod.

use clap::Parser;
use dashsync_daemon::{ConfigOverrides, DaemonConfig, DaemonResult, Server, SourceKind};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dashsync Daemon CLI
#[derive(Parser)]
#[command(name = "dashsyncd")]
#[command(about = "Dashsync Daemon - Grafana dashboard reconciler", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DASHSYNC_CONFIG")]
    config: Option<String>,

    /// Grafana base URL
    #[arg(long, env = "GRAFANA_URL")]
    grafana_url: Option<String>,

    /// Grafana API key
    #[arg(long, env = "GRAFANA_API_KEY", hide_env_values = true)]
    grafana_api_key: Option<String>,

    /// Grafana basic auth user
    #[arg(long, env = "GRAFANA_BASIC_AUTH_USERNAME")]
    grafana_user: Option<String>,

    /// Grafana basic auth password
    #[arg(long, env = "GRAFANA_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    grafana_password: Option<String>,

    /// Tag marking the dashboards this instance manages
    #[arg(long, env = "MARKER_TAG")]
    marker_tag: Option<String>,

    /// Where dashboard documents come from
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Namespace to watch for ConfigMaps (default: all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Label selector for dashboard ConfigMaps (default: everything)
    #[arg(long, env = "CONFIGMAP_SELECTOR")]
    selector: Option<String>,

    /// Path to a kubeconfig; in-cluster configuration otherwise
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Directory the dashboard ConfigMaps are mounted into
    #[arg(long, env = "DOCUMENTS_DIR")]
    documents_dir: Option<PathBuf>,

    /// Log planned changes instead of applying them
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SourceArg {
    Kubernetes,
    Directory,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Kubernetes => SourceKind::Kubernetes,
            SourceArg::Directory => SourceKind::Directory,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            grafana_url: self.grafana_url.clone(),
            grafana_api_key: self.grafana_api_key.clone(),
            grafana_username: self.grafana_user.clone(),
            grafana_password: self.grafana_password.clone(),
            marker_tag: self.marker_tag.clone(),
            source_kind: self.source.map(SourceKind::from),
            namespace: self.watch_namespace.clone(),
            selector: self.selector.clone(),
            kubeconfig: self.kubeconfig.clone(),
            documents_dir: self.documents_dir.clone(),
            dry_run: self.dry_run.then_some(true),
            log_level: self.log_level.clone(),
            json: self.json.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    config.apply_overrides(cli.overrides());

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        grafana = %config.grafana.url,
        source = ?config.source.kind,
        marker_tag = %config.reconciler.marker_tag,
        dry_run = config.reconciler.dry_run,
        "Starting dashsync daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
