mod auth_commands;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "strava-cli", about = "Strava from the command line", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/strava-cli/).
    #[arg(long, global = true, env = "STRAVA_CLI_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to Strava through the browser and store the credential.
    Login,
    /// Refresh the stored access token.
    Refresh {
        /// Refresh even if the current token is still valid.
        #[arg(long)]
        force: bool,
    },
    /// Show whether a credential is stored and how long it stays valid.
    Status,
    /// Delete the stored credential.
    Logout,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "strava-cli starting");

    if let Some(ref dir) = cli.config_dir {
        strava_config::set_config_dir(dir.clone());
    }
    let config = strava_config::discover_and_load();

    match cli.command {
        Commands::Login => auth_commands::login(&config).await,
        Commands::Refresh { force } => auth_commands::refresh(&config, force).await,
        Commands::Status => auth_commands::status(),
        Commands::Logout => auth_commands::logout(),
    }
}
