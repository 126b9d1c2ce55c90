use chat_relay::config::config_search_paths;
use chat_relay::providers::ProviderPreset;
use chat_relay::{build_router, AppState, RelayConfig, SharedJournal};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-relay",
    about = "Relay chat completions to an OpenAI-compatible provider with per-request keys",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Provider preset name (overrides config)
    #[arg(long)]
    provider: Option<String>,

    /// Journal file path
    #[arg(long, default_value = "chat-relay.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(provider) = cli.provider {
        if ProviderPreset::from_name(&provider).is_some() {
            // A preset switch should not keep the previous provider's endpoint.
            config.provider.base_url = None;
            config.provider.credential_header = None;
        }
        config.provider.name = provider;
    }

    // Validate config eagerly
    let base_url = config.effective_base_url()?;

    let journal = SharedJournal::open(&cli.log_file)?;

    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Provider:    {}", config.provider.name);
    info!("  Base URL:    {}", base_url);
    info!("  Key header:  {}", config.credential_header());
    info!("  Timeouts:    chat={}s models={}s", config.timeouts.chat_secs, config.timeouts.models_secs);
    info!("  Journal:     {}", cli.log_file.display());

    journal.info(
        "startup",
        format!(
            "Starting chat-relay provider={} base_url={} port={}",
            config.provider.name, base_url, config.port
        ),
    );

    // Timeouts are applied per call from config.
    let client = reqwest::Client::builder().build()?;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        client,
        journal,
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
