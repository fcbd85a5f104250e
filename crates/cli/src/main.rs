use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use caproxy_config::ProxyConfig;

#[derive(Parser)]
#[command(
    name = "caproxy",
    about = "caproxy — credential-injecting CodeArtifact proxy"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        /// Listen port (overrides PROXY_PORT).
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        Commands::Serve { bind, port } => {
            // Missing required settings abort here, before anything binds.
            let config = ProxyConfig::from_env()?;
            let port = port.unwrap_or(config.port);
            info!(%bind, port, "starting caproxy");
            caproxy_gateway::server::start(config, &bind, port).await
        },
    }
}
