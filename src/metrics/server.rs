use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::gateway::CompositeGateway;

/// Start the metrics and health HTTP server
/// This should be called in a separate thread/runtime to avoid conflicts
pub async fn start_metrics_server(
    registry: Registry,
    gateway: CompositeGateway,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    let registry = web::Data::new(registry);
    let gateway = web::Data::new(gateway);

    HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .app_data(gateway.clone())
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(registry: web::Data<Registry>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

/// Live probe of every core service; 503 once composite reads would fail.
async fn health_handler(gateway: web::Data<CompositeGateway>) -> impl Responder {
    let summary = gateway.health_summary().await;

    if summary.status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(summary)
    } else {
        HttpResponse::Ok().json(summary)
    }
}
