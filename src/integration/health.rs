use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

use super::Dependency;
use crate::metrics::Metrics;

// ============================================================================
// Health Probing
// ============================================================================
//
// A probe never fails: whatever goes wrong is folded into `up = false`.
// Nothing here is cached, every call goes to the network.
//
// ============================================================================

/// Health of one core service as seen by a single probe
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub name: String,
    pub up: bool,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DependencyHealth {
    pub fn up(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            up: true,
            checked_at: Utc::now(),
            details: None,
        }
    }

    pub fn down(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            up: false,
            checked_at: Utc::now(),
            details: Some(details.into()),
        }
    }
}

/// Overall status of the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, HealthStatus::Degraded(_))
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub dependencies: Vec<DependencyHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthSummary {
    /// A down primary fails every composite read; down secondaries only
    /// make them partial.
    pub fn from_probes(probes: Vec<(Dependency, DependencyHealth)>) -> Self {
        let mut primary_down = Vec::new();
        let mut secondary_down = Vec::new();

        for (dependency, health) in &probes {
            if health.up {
                continue;
            }
            if dependency.is_primary() {
                primary_down.push(dependency.name());
            } else {
                secondary_down.push(dependency.name());
            }
        }

        let status = if !primary_down.is_empty() {
            let mut down = primary_down;
            down.extend(secondary_down);
            HealthStatus::Unhealthy(format!("Down: {}", down.join(", ")))
        } else if !secondary_down.is_empty() {
            HealthStatus::Degraded(format!("Down: {}", secondary_down.join(", ")))
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            dependencies: probes.into_iter().map(|(_, health)| health).collect(),
            checked_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct HealthProber {
    client: Client,
    health_path: String,
    metrics: Arc<Metrics>,
}

impl HealthProber {
    pub fn new(client: Client, health_path: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            health_path: health_path.into(),
            metrics,
        }
    }

    /// Probe one service. Any 2xx with a JSON object body counts as up.
    pub async fn probe(&self, dependency: Dependency, base_url: &str) -> DependencyHealth {
        let url = format!("{}{}", base_url, self.health_path);
        tracing::debug!(dependency = %dependency, url = %url, "Will call the Health API");

        let health = match self.check(&url).await {
            Ok(()) => DependencyHealth::up(dependency.name()),
            Err(details) => DependencyHealth::down(dependency.name(), details),
        };

        self.metrics.set_dependency_up(dependency.name(), health.up);
        tracing::debug!(
            dependency = %dependency,
            up = health.up,
            details = ?health.details,
            "Probed dependency"
        );
        health
    }

    async fn check(&self, url: &str) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{} from GET {}", status, url));
        }

        response
            .json::<serde_json::Map<String, serde_json::Value>>()
            .await
            .map(|_| ())
            .map_err(|e| format!("Unreadable health body: {}", e))
    }
}
