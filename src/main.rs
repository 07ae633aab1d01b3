use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relayvisor::{
    Cli, GstLaunchEngine, KinesisVideoResolver, LogFormat, LogWriter, RelayConfig, RuntimeError,
    Supervisor, SupervisorConfig,
};

/// Structured logging; `RUST_LOG` overrides the default `info` level.
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(false)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let (relay, cfg) = match RelayConfig::from_cli(&cli)
        .and_then(|relay| Ok((relay, SupervisorConfig::from_cli(&cli)?)))
    {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, label = e.as_label(), "invalid configuration");
            return ExitCode::from(RuntimeError::CONFIGURATION_EXIT);
        }
    };
    let resolver = match KinesisVideoResolver::new(&relay) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            error!(error = %e, label = e.as_label(), "invalid configuration");
            return ExitCode::from(RuntimeError::CONFIGURATION_EXIT);
        }
    };
    let engine = Arc::new(GstLaunchEngine::new(&relay));

    info!(
        stream = %relay.stream_name,
        region = %relay.region,
        topology = ?relay.topology,
        access_key = %relay.credentials.redacted_key_id(),
        "starting relay"
    );

    let sup = Supervisor::builder(relay, cfg, resolver, engine)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    match sup.run_until_signal().await {
        Ok(()) => {
            info!("relay stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, label = e.as_label(), "relay stopped on fatal error");
            e.exit_code()
        }
    }
}
