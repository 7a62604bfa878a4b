mod config;

use clap::{Args, Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError, MetricsConfig};
use event_relay::mixpanel::{AnalyticsClient, MixpanelClient};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(version, about = "Relays storefront analytics events to Mixpanel")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the relay
    Run(ConfigArgs),
    /// Load and validate the configuration, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML config file. Defaults plus environment are used when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not build Mixpanel client: {0}")]
    Client(#[from] event_relay::mixpanel::VendorError),
    #[error("could not install metrics exporter: {0}")]
    Metrics(String),
    #[error("relay stopped: {0}")]
    Relay(#[from] event_relay::errors::RelayError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Run(args) => run(args),
        CliCommand::CheckConfig(args) => check_config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<Config, ConfigError> {
    Config::load(args.config.as_deref(), |key| std::env::var(key).ok())
}

fn check_config(args: ConfigArgs) -> Result<(), CliError> {
    let config = load_config(&args)?;
    println!("Configuration is valid");
    println!(
        "Listener: {}:{}",
        config.relay.listener.host, config.relay.listener.port
    );
    println!(
        "Mixpanel token: {}",
        match config.relay.mixpanel.has_token() {
            true => "configured",
            false => "not configured",
        }
    );
    Ok(())
}

fn run(args: ConfigArgs) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let _sentry = init_logging(&config.common);

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config)?;
    }

    // Request handling is cooperative on a single thread
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), CliError> {
    let client: Arc<dyn AnalyticsClient> = Arc::new(MixpanelClient::new(&config.relay.mixpanel)?);

    tracing::info!(
        host = %config.relay.listener.host,
        port = config.relay.listener.port,
        "Starting event relay"
    );
    if client.is_configured() {
        tracing::info!("Mixpanel token configured");
    } else {
        tracing::warn!("Mixpanel token not configured, vendor calls will fail");
    }

    tokio::select! {
        result = event_relay::run(config.relay, client) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}

/// Installs the global subscriber. The returned guard flushes Sentry on drop.
fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let default_level = common.logging.level.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let guard = common.logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::describe_metrics!(event_relay::ALL_METRICS);
    Ok(())
}
