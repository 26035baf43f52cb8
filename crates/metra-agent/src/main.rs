use anyhow::Result;
use metra_agent::client::DeliveryClient;
use metra_agent::config::AgentConfig;
use metra_agent::scheduler::Scheduler;
use metra_collector::{Collector, RuntimeCollector, SystemCollector};
use metra_common::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("metra_agent=info".parse()?)
                .add_directive("metra_collector=info".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = AgentConfig::load(&config_path)?;

    tracing::info!(
        server = %config.http_base_url(),
        poll_secs = config.poll_interval_secs,
        report_secs = config.report_interval_secs,
        batch = config.batch_update,
        workers = config.workers,
        signed = config.sign_key.is_some(),
        gzip = config.gzip,
        "metra-agent starting"
    );

    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(RuntimeCollector::new()?),
        Box::new(SystemCollector::new()),
    ];

    let client = Arc::new(DeliveryClient::new(
        config.http_base_url(),
        config.sign_key.clone(),
        config.gzip,
        RetryPolicy::default(),
    )?);

    let scheduler = Scheduler::new(
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.report_interval_secs),
        config.batch_update,
        config.workers,
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down gracefully");
            shutdown.cancel();
        }
    });

    scheduler.run(collectors, client, cancel).await;
    tracing::info!("agent stopped");

    Ok(())
}
