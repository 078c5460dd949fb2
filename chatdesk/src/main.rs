use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use store::Store;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod config;

const METRICS_PREFIX: &str = "chatdesk";

#[derive(Parser)]
#[command(name = "chatdesk", version, about = "Chat widget backend")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the HTTP API
    Serve(ConfigArgs),
    /// Load and validate a config file, then exit
    ValidateConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, default_value = "chatdesk.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid log filter: {0}")]
    LogFilter(String),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not open store: {0}")]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Api(#[from] api::ApiServiceError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chatdesk: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: CliCommand) -> Result<(), CliError> {
    match command {
        CliCommand::ValidateConfig(args) => {
            load_config(&args)?;
            println!("{} is valid", args.config.display());
            Ok(())
        }
        CliCommand::Serve(args) => {
            let config = load_config(&args)?;
            let _sentry = init_logging(config.common.logging.as_ref())?;
            if let Some(metrics) = &config.common.metrics {
                init_metrics(metrics)?;
            }

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(serve(config))
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<Config, ConfigError> {
    let config = Config::from_file(&args.config)?;
    config.validate()?;
    Ok(config)
}

async fn serve(config: Config) -> Result<(), CliError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting chatdesk");
    let store = Store::open(&config.store).await?;
    api::run(config.api, store).await?;
    tracing::info!("Stopped chatdesk");
    Ok(())
}

/// Installs the global subscriber. The returned guard flushes pending Sentry
/// events when dropped and must live until shutdown.
fn init_logging(
    logging: Option<&LoggingConfig>,
) -> Result<Option<sentry::ClientInitGuard>, CliError> {
    let level = logging
        .and_then(|logging| logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::LogFilter(e.to_string()))?,
    };

    let sentry_guard = logging
        .and_then(|logging| logging.sentry_dsn.as_deref())
        .filter(|dsn| !dsn.is_empty())
        .map(|dsn| {
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
        .with(
            sentry_guard
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    Ok(sentry_guard)
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    for defs in [api::metrics_defs::ALL_METRICS, upstream::metrics_defs::ALL_METRICS] {
        shared::metrics_defs::describe_all(defs);
    }
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Reporting metrics to statsd"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        let cli = Cli::try_parse_from(["chatdesk", "serve", "--config", "/etc/chatdesk.yaml"])
            .expect("parse serve");
        let CliCommand::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.config, PathBuf::from("/etc/chatdesk.yaml"));

        let cli = Cli::try_parse_from(["chatdesk", "validate-config"]).expect("parse validate");
        let CliCommand::ValidateConfig(args) = cli.command else {
            panic!("expected validate-config");
        };
        assert_eq!(args.config, PathBuf::from("chatdesk.yaml"));

        assert!(Cli::try_parse_from(["chatdesk", "locate"]).is_err());
    }

    #[test]
    fn validate_config_command() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        std::io::Write::write_all(&mut tmp, b"api:\n  listener:\n    host: 0.0.0.0\n    port: 0\n")
            .expect("write yaml");

        let result = run(CliCommand::ValidateConfig(ConfigArgs {
            config: tmp.path().to_path_buf(),
        }));
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::Invalid(_)))
        ));
    }
}
