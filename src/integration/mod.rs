// ============================================================================
// Integration Module
// ============================================================================
//
// Everything that talks to the core services over HTTP:
// - reader/     - generic downstream reader with a per-dependency failure policy
// - translator/ - maps failed reads to composite errors
// - health/     - liveness probes folded into a status value
//
// ============================================================================

mod health;
mod reader;
mod translator;

pub use health::{DependencyHealth, HealthProber, HealthStatus, HealthSummary};
pub use reader::{DownstreamReader, FailurePolicy};
pub use translator::{error_message, translate};

use std::fmt;

/// A core service this gateway composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Product,
    Recommendation,
    Review,
}

impl Dependency {
    pub fn name(&self) -> &'static str {
        match self {
            Dependency::Product => "product",
            Dependency::Recommendation => "recommendation",
            Dependency::Review => "review",
        }
    }

    /// Reads of the primary entity must fail the whole composite.
    pub fn is_primary(&self) -> bool {
        matches!(self, Dependency::Product)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
