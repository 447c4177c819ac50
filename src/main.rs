use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_lambda_exporter::config::{Cli, LogFormat};
use aws_lambda_exporter::invoke::LambdaConnector;
use aws_lambda_exporter::region::{ImdsMetadata, RegionResolver, DEFAULT_REGION};
use aws_lambda_exporter::registry::DescriptorRegistry;
use aws_lambda_exporter::server::{self, AppState};
use aws_lambda_exporter::stats::ExporterStats;
use aws_sdk_lambda::config::Region;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::from_default_env().add_directive("aws_lambda_exporter=info".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
    }

    let metadata = ImdsMetadata::new(&cli.metadata_endpoint, cli.metadata_timeout())?;
    let region = Arc::new(RegionResolver::new(
        Arc::new(metadata),
        std::env::var("AWS_REGION").ok(),
    ));

    // Each client overrides the region, the loader's own lookup is skipped.
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(DEFAULT_REGION));
    if let Some(endpoint) = &cli.lambda_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let connector = Arc::new(LambdaConnector::new(loader.load().await));

    let telemetry_path = cli.telemetry_path();
    let app = server::router(AppState {
        registry: Arc::new(DescriptorRegistry::new()),
        stats: Arc::new(ExporterStats::new()),
        region,
        connector,
        telemetry_path: telemetry_path.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&cli.listen_address).await?;
    info!(address = %cli.listen_address, %telemetry_path, "aws lambda exporter listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received CTRL+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
