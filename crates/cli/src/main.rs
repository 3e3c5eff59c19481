use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tindabot_clients::catalog::HttpCatalogStore;
use tindabot_clients::leads::HttpLeadStore;
use tindabot_clients::{CatalogStore, LeadStore};
use tindabot_core::config::AppConfig;
use tindabot_core::metrics::MetricsStore;
use tindabot_messenger::graph::GraphSendClient;
use tindabot_messenger::tokens::{PageTokenCache, StaticTokens};
use tindabot_messenger::{SendApi, TokenResolver};
use tindabot_pipeline::Orchestrator;
use tindabot_providers::responder::HttpResponseGenerator;
use tindabot_providers::vision::HttpReceiptAnalyzer;
use tindabot_providers::{ReceiptAnalyzer, ResponseGenerator};
use tindabot_server::Gateway;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "tindabot")]
#[command(version = VERSION)]
#[command(about = "Webhook ingestion and response orchestration for messaging pages")]
struct Cli {
    /// Path to the config file (default: ~/.tindabot/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".tindabot")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Audit events go to a daily JSONL file, everything else to stdout.
    let (non_blocking, _guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        config_dir().join("logs"),
        "audit.jsonl",
    ));

    let audit_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_level(false)
        .with_file(false)
        .with_line_number(false)
        .without_time() // Timestamp is in JSON
        .with_filter(tracing_subscriber::filter::Targets::new().with_target("audit", Level::INFO));

    let stdout_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(Level::INFO.into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(stdout_filter)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "audit"
        }));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(audit_layer)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.clone())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let port = cli.port.unwrap_or(config.server.port);

    let metrics = MetricsStore::new();

    let tokens: Arc<dyn TokenResolver> = Arc::new(PageTokenCache::new(
        Arc::new(StaticTokens::new(
            Some(config.messenger.default_token.clone()),
            config.messenger.page_tokens.clone(),
        )),
        Duration::from_secs(config.messenger.token_ttl_secs),
    ));
    let send: Arc<dyn SendApi> = Arc::new(GraphSendClient::new(
        config.messenger.api_base.clone(),
        tokens,
    ));
    let generator: Arc<dyn ResponseGenerator> = Arc::new(HttpResponseGenerator::new(
        config.responder.api_base.clone(),
        config.responder.api_key.clone(),
    ));
    let analyzer: Arc<dyn ReceiptAnalyzer> = Arc::new(HttpReceiptAnalyzer::new(
        config.vision.api_base.clone(),
        config.vision.api_key.clone(),
    ));
    let catalog: Arc<dyn CatalogStore> =
        Arc::new(HttpCatalogStore::new(config.catalog.api_base.clone()));
    let leads: Arc<dyn LeadStore> = Arc::new(HttpLeadStore::new(config.leads.api_base.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        metrics.clone(),
        send,
        generator,
        analyzer,
        catalog,
        leads,
        config.dedupe.max_tracked,
        Duration::from_secs(config.takeover.ttl_minutes * 60),
    ));

    info!(version = VERSION, port, "starting tindabot gateway");

    let gateway = Gateway::new(
        orchestrator,
        metrics,
        port,
        config.webhook.verify_token.clone(),
        config.webhook.app_secret.clone(),
    );
    gateway.start().await
}
