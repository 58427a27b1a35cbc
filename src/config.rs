use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::messaging::Bindings;

/// Which backbone published events go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackboneKind {
    Redpanda,
    InMemory,
}

/// Product composite gateway
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct GatewayConfig {
    #[arg(long, env = "PRODUCT_SERVICE_HOST", default_value = "localhost")]
    pub product_service_host: String,

    #[arg(long, env = "PRODUCT_SERVICE_PORT", default_value = "7001")]
    pub product_service_port: u16,

    #[arg(long, env = "RECOMMENDATION_SERVICE_HOST", default_value = "localhost")]
    pub recommendation_service_host: String,

    #[arg(long, env = "RECOMMENDATION_SERVICE_PORT", default_value = "7002")]
    pub recommendation_service_port: u16,

    #[arg(long, env = "REVIEW_SERVICE_HOST", default_value = "localhost")]
    pub review_service_host: String,

    #[arg(long, env = "REVIEW_SERVICE_PORT", default_value = "7003")]
    pub review_service_port: u16,

    /// Address this instance reports as `cmp` in composite responses
    #[arg(long, env = "SERVICE_ADDRESS", default_value = "product-composite")]
    pub service_address: String,

    /// Liveness path appended to each service's base URL
    #[arg(long, env = "HEALTH_PATH", default_value = "/actuator/health")]
    pub health_path: String,

    /// Per-request timeout for downstream reads and probes
    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value = "5000")]
    pub http_timeout_ms: u64,

    #[arg(long, value_enum, env = "BACKBONE", default_value = "redpanda")]
    pub backbone: BackboneKind,

    #[arg(long, env = "KAFKA_BROKERS", default_value = "127.0.0.1:9092")]
    pub kafka_brokers: String,

    #[arg(long, env = "KAFKA_MESSAGE_TIMEOUT_MS", default_value = "5000")]
    pub kafka_message_timeout_ms: u64,

    #[arg(long, env = "PRODUCTS_TOPIC", default_value = "products")]
    pub products_topic: String,

    #[arg(long, env = "RECOMMENDATIONS_TOPIC", default_value = "recommendations")]
    pub recommendations_topic: String,

    #[arg(long, env = "REVIEWS_TOPIC", default_value = "reviews")]
    pub reviews_topic: String,

    /// Worker threads (and ordered lanes) of the publish pool
    #[arg(long, env = "PUBLISH_POOL_THREADS", default_value = "10")]
    pub publish_pool_threads: usize,

    /// Pending events each publish lane holds before rejecting
    #[arg(long, env = "PUBLISH_QUEUE_SIZE", default_value = "100")]
    pub publish_queue_size: usize,

    /// How long shutdown waits for queued events
    #[arg(long, env = "PUBLISH_SHUTDOWN_GRACE_MS", default_value = "5000")]
    pub publish_shutdown_grace_ms: u64,

    /// Port of the /metrics and /health server
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    pub metrics_port: u16,
}

/// Base URLs of the three core services.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceUrls {
    pub product: String,
    pub recommendation: String,
    pub review: String,
}

impl GatewayConfig {
    pub fn service_urls(&self) -> ServiceUrls {
        ServiceUrls {
            product: format!("http://{}:{}", self.product_service_host, self.product_service_port),
            recommendation: format!(
                "http://{}:{}",
                self.recommendation_service_host, self.recommendation_service_port
            ),
            review: format!("http://{}:{}", self.review_service_host, self.review_service_port),
        }
    }

    pub fn bindings(&self) -> Bindings {
        Bindings {
            products: self.products_topic.clone(),
            recommendations: self.recommendations_topic.clone(),
            reviews: self.reviews_topic.clone(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn kafka_message_timeout(&self) -> Duration {
        Duration::from_millis(self.kafka_message_timeout_ms)
    }

    pub fn publish_shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.publish_shutdown_grace_ms)
    }
}
