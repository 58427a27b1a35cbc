use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use product_composite::config::{BackboneKind, GatewayConfig};
use product_composite::integration::HealthProber;
use product_composite::messaging::{
    EventBackbone, EventPublisher, InMemoryBackbone, PublishPool, RedpandaClient,
};
use product_composite::metrics::{self, Metrics};
use product_composite::CompositeGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::parse();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,product_composite=debug")),
        )
        .init();

    let urls = config.service_urls();
    tracing::info!("🚀 Starting product composite gateway");
    tracing::info!(
        product = %urls.product,
        recommendation = %urls.recommendation,
        review = %urls.review,
        "Core services"
    );

    // === 1. Metrics registry ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Backbone and publish pool ===
    let backbone: Arc<dyn EventBackbone> = match config.backbone {
        BackboneKind::Redpanda => {
            tracing::info!(brokers = %config.kafka_brokers, "Connecting to Redpanda");
            Arc::new(RedpandaClient::new(
                &config.kafka_brokers,
                config.kafka_message_timeout(),
            )?)
        }
        BackboneKind::InMemory => {
            tracing::warn!("Using the in-memory backbone, events stay in this process");
            Arc::new(InMemoryBackbone::new())
        }
    };

    let pool = Arc::new(PublishPool::new(
        config.publish_pool_threads,
        config.publish_queue_size,
    )?);
    let publisher = EventPublisher::new(backbone, pool.clone(), config.bindings(), metrics.clone());

    // === 3. Gateway ===
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;
    let prober = HealthProber::new(client.clone(), config.health_path.clone(), metrics.clone());
    let gateway = CompositeGateway::new(
        urls,
        client,
        prober,
        publisher,
        metrics.clone(),
        config.service_address.clone(),
    );

    let summary = gateway.health_summary().await;
    tracing::info!(status = ?summary.status, "Initial dependency health");

    // === 4. Metrics and health server in a background thread ===
    let registry = metrics.registry().clone();
    let server_gateway = gateway.clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(registry, server_gateway, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    tracing::info!("✅ Gateway ready, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    tracing::info!("⏳ Draining queued events...");
    pool.shutdown(config.publish_shutdown_grace()).await;

    tracing::info!("🎉 Shutdown complete");
    Ok(())
}
