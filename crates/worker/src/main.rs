use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use brandcfg_core::config::AppConfig;
use brandcfg_core::progress::{ProgressSink, ProgressStatus};
use brandcfg_core::types::DbId;
use brandcfg_events::{OperationEvent, ProgressBus};
use brandcfg_website::{CreateWebsiteRequest, WebsiteService};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "brandcfg-worker")]
#[command(about = "Create and remove brand websites", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a website from a JSON request file
    Create {
        /// Path to a `CreateWebsiteRequest` JSON document
        request: PathBuf,
    },
    /// Delete a website and, if it was the brand's last one, the brand
    Delete { client_id: DbId },
    /// Print every stored config row of a website
    Show { client_id: DbId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "brandcfg_worker=debug,brandcfg_saga=debug,brandcfg_website=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = Arc::new(AppConfig::from_env().context("Invalid configuration")?);
    tracing::info!(
        base_path = %config.files.base_path.display(),
        max_connections = config.max_connections,
        "Loaded configuration",
    );

    // --- Database ---
    let pool = brandcfg_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    brandcfg_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    brandcfg_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let service = WebsiteService::new(pool, Arc::new(config.files.clone()));

    // --- Progress ---
    let bus = Arc::new(ProgressBus::default());
    let logger = tokio::spawn(log_progress(bus.subscribe()));
    let sink: Arc<dyn ProgressSink> = Arc::new(bus.start_operation());
    drop(bus);

    // --- Cancellation ---
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling at the next step boundary");
            on_ctrl_c.cancel();
        }
    });

    let output = match cli.command {
        Command::Create { request } => {
            let text = tokio::fs::read_to_string(&request)
                .await
                .with_context(|| format!("Failed to read {}", request.display()))?;
            let req: CreateWebsiteRequest = serde_json::from_str(&text)
                .with_context(|| format!("Invalid request in {}", request.display()))?;
            let created = tokio::spawn(async move { service.create_website(req, Some(sink), cancel).await })
                .await
                .context("Create task failed")??;
            serde_json::to_string_pretty(&created)?
        }
        Command::Delete { client_id } => {
            let deleted =
                tokio::spawn(async move { service.delete_website(client_id, Some(sink), cancel).await })
                    .await
                    .context("Delete task failed")??;
            serde_json::to_string_pretty(&deleted)?
        }
        Command::Show { client_id } => {
            drop(sink);
            let website = service.website_config(client_id).await?;
            serde_json::to_string_pretty(&website)?
        }
    };

    signal.abort();
    // The last sender went away with the workflow; the logger drains and exits.
    let _ = tokio::time::timeout(Duration::from_secs(5), logger).await;

    println!("{output}");
    Ok(())
}

/// Mirror bus events into the log until every publisher is gone.
async fn log_progress(mut rx: broadcast::Receiver<OperationEvent>) {
    loop {
        match rx.recv().await {
            Ok(OperationEvent {
                operation_id,
                event,
                ..
            }) => match (event.status, event.percentage) {
                (ProgressStatus::Running, Some(pct)) => {
                    tracing::info!(%operation_id, pct, detail = %event.detail, "{}", event.text)
                }
                (ProgressStatus::Running, None) => {
                    tracing::debug!(%operation_id, "{}", event.text)
                }
                (ProgressStatus::Success, _) => {
                    tracing::info!(%operation_id, "{}", event.text)
                }
                (ProgressStatus::Failed, _) => {
                    tracing::error!(%operation_id, detail = %event.detail, "{}", event.text)
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Progress logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
