use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;

use super::translator::translate;
use super::Dependency;
use crate::error::{CompositeError, DownstreamFailure};
use crate::metrics::Metrics;

// ============================================================================
// Downstream Reader - one per core service
// ============================================================================
//
// The same reader serves all three services. What differs is the base URL,
// the response type of each call and what happens when a call fails:
//
// - Propagate: the failure is translated and returned (primary entity)
// - Suppress:  the failure is logged and replaced by an empty collection,
//              so the composite can still be answered (secondary entities)
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Propagate,
    Suppress,
}

#[derive(Clone)]
pub struct DownstreamReader {
    dependency: Dependency,
    base_url: String,
    policy: FailurePolicy,
    client: Client,
    metrics: Arc<Metrics>,
}

impl DownstreamReader {
    pub fn new(
        dependency: Dependency,
        base_url: impl Into<String>,
        policy: FailurePolicy,
        client: Client,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            dependency,
            base_url: base_url.into(),
            policy,
            client,
            metrics,
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read a single entity. A single entity has no empty form, so failures
    /// are always translated and returned.
    pub async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, CompositeError> {
        let started = Instant::now();
        let outcome = self.get(path).await;
        self.record(if outcome.is_ok() { "success" } else { "error" }, started);
        outcome.map_err(translate)
    }

    /// Read a collection, applying this reader's failure policy.
    pub async fn fetch_many<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, CompositeError> {
        let started = Instant::now();
        match self.get(path).await {
            Ok(items) => {
                self.record("success", started);
                Ok(items)
            }
            Err(failure) => match self.policy {
                FailurePolicy::Propagate => {
                    self.record("error", started);
                    Err(translate(failure))
                }
                FailurePolicy::Suppress => {
                    self.record("suppressed", started);
                    tracing::debug!(
                        dependency = %self.dependency,
                        error = %failure,
                        "Returning an empty result so the composite can answer partially"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DownstreamFailure> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(dependency = %self.dependency, url = %url, "Will call downstream API");
        self.send(&url).await
    }

    async fn send<T: DeserializeOwned>(&self, url: &str) -> Result<T, DownstreamFailure> {
        let transport = |source: reqwest::Error| DownstreamFailure::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(DownstreamFailure::Status {
                status,
                url: url.to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| DownstreamFailure::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn record(&self, outcome: &str, started: Instant) {
        self.metrics.record_downstream(
            self.dependency.name(),
            outcome,
            started.elapsed().as_secs_f64(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Review};
    use crate::testing::{FakeBackend, UNREACHABLE_URL};

    fn reader(base_url: &str, policy: FailurePolicy) -> DownstreamReader {
        reader_with_metrics(base_url, policy, Arc::new(Metrics::new().unwrap()))
    }

    fn reader_with_metrics(
        base_url: &str,
        policy: FailurePolicy,
        metrics: Arc<Metrics>,
    ) -> DownstreamReader {
        DownstreamReader::new(Dependency::Review, base_url, policy, Client::new(), metrics)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_one_deserializes_entity() {
        let backend = FakeBackend::start()
            .route("/product/1", 200, r#"{"productId":1,"name":"n","weight":1,"originAddress":"a"}"#)
            .spawn()
            .await;

        let product: Product = reader(&backend.url, FailurePolicy::Propagate)
            .fetch_one("/product/1")
            .await
            .unwrap();

        assert_eq!(product.name, "n");
        assert_eq!(backend.hits(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_many_suppresses_status_errors() {
        let backend = FakeBackend::start()
            .route("/review", 500, r#"{"message":"boom"}"#)
            .spawn()
            .await;

        let reviews: Vec<Review> = reader(&backend.url, FailurePolicy::Suppress)
            .fetch_many("/review?productId=1")
            .await
            .unwrap();

        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_many_suppresses_unreachable_service() {
        let reviews: Vec<Review> = reader(UNREACHABLE_URL, FailurePolicy::Suppress)
            .fetch_many("/review?productId=1")
            .await
            .unwrap();

        assert!(reviews.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_many_suppresses_malformed_body() {
        let backend = FakeBackend::start()
            .route("/review", 200, r#"{"not":"an array"}"#)
            .spawn()
            .await;

        let reviews: Vec<Review> = reader(&backend.url, FailurePolicy::Suppress)
            .fetch_many("/review?productId=1")
            .await
            .unwrap();

        assert!(reviews.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_many_propagates_when_configured() {
        let backend = FakeBackend::start()
            .route("/review", 404, r#"{"message":"No reviews for 9"}"#)
            .spawn()
            .await;

        let result = reader(&backend.url, FailurePolicy::Propagate)
            .fetch_many::<Review>("/review?productId=9")
            .await;

        match result {
            Err(CompositeError::NotFound(message)) => assert_eq!(message, "No reviews for 9"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_suppressed_read_is_counted_and_timed() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let reader = reader_with_metrics(UNREACHABLE_URL, FailurePolicy::Suppress, metrics.clone());

        let _: Vec<Review> = reader.fetch_many("/review?productId=1").await.unwrap();

        assert_eq!(
            metrics
                .downstream_requests
                .with_label_values(&["review", "suppressed"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .downstream_duration
                .with_label_values(&["review"])
                .get_sample_count(),
            1
        );
    }

    #[tokio::test]
    async fn test_fetch_one_unreachable_is_unknown() {
        let result = reader(UNREACHABLE_URL, FailurePolicy::Propagate)
            .fetch_one::<Product>("/product/1")
            .await;

        assert!(matches!(
            result,
            Err(CompositeError::Unknown(DownstreamFailure::Transport { .. }))
        ));
    }
}
