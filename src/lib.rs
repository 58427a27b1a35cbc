//! Product composite gateway.
//!
//! Sits in front of the product, recommendation and review services.
//! Reads fan out to all three and are assembled into one aggregate, tolerating
//! outages of the two secondary services. Writes are published as ordered
//! events to a Kafka-compatible backbone instead of calling the services.

pub mod config;
pub mod error;
pub mod gateway;
pub mod integration;
pub mod messaging;
pub mod metrics;
pub mod models;

#[cfg(test)]
mod testing;

pub use config::{BackboneKind, GatewayConfig, ServiceUrls};
pub use error::{CompositeError, DownstreamFailure, PublishError};
pub use gateway::CompositeGateway;
