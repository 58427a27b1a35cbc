use reqwest::Client;
use std::sync::Arc;

use crate::config::ServiceUrls;
use crate::error::{CompositeError, PublishError};
use crate::integration::{
    Dependency, DependencyHealth, DownstreamReader, FailurePolicy, HealthProber, HealthSummary,
};
use crate::messaging::{Channel, Event, EventPublisher};
use crate::metrics::Metrics;
use crate::models::{Product, ProductAggregate, Recommendation, Review};

// ============================================================================
// Composite Gateway
// ============================================================================
//
// Reads go to the core services, concurrently, and are assembled here.
// Writes never reach the core services: each one becomes an event on the
// entity's channel and the call returns once the event is queued.
//
// The gateway holds no mutable state. Cloning it shares the HTTP client,
// the publish pool and the metrics registry.
//
// ============================================================================

#[derive(Clone)]
pub struct CompositeGateway {
    product: DownstreamReader,
    recommendation: DownstreamReader,
    review: DownstreamReader,
    prober: HealthProber,
    publisher: EventPublisher,
    service_address: String,
}

impl CompositeGateway {
    pub fn new(
        urls: ServiceUrls,
        client: Client,
        prober: HealthProber,
        publisher: EventPublisher,
        metrics: Arc<Metrics>,
        service_address: impl Into<String>,
    ) -> Self {
        let reader = |dependency: Dependency, url: String, policy: FailurePolicy| {
            DownstreamReader::new(dependency, url, policy, client.clone(), metrics.clone())
        };

        Self {
            product: reader(Dependency::Product, urls.product, FailurePolicy::Propagate),
            recommendation: reader(
                Dependency::Recommendation,
                urls.recommendation,
                FailurePolicy::Suppress,
            ),
            review: reader(Dependency::Review, urls.review, FailurePolicy::Suppress),
            prober,
            publisher,
            service_address: service_address.into(),
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_product(&self, product_id: i32) -> Result<Product, CompositeError> {
        self.product
            .fetch_one(&format!("/product/{}", product_id))
            .await
    }

    pub async fn get_recommendations(
        &self,
        product_id: i32,
    ) -> Result<Vec<Recommendation>, CompositeError> {
        self.recommendation
            .fetch_many(&format!("/recommendation?productId={}", product_id))
            .await
    }

    pub async fn get_reviews(&self, product_id: i32) -> Result<Vec<Review>, CompositeError> {
        self.review
            .fetch_many(&format!("/review?productId={}", product_id))
            .await
    }

    /// Fetch the product and both collections concurrently and assemble them.
    ///
    /// Fails only when the product cannot be read. Dropping the returned
    /// future cancels every in-flight call.
    pub async fn read_composite(&self, product_id: i32) -> Result<ProductAggregate, CompositeError> {
        tracing::info!(product_id, "Will get composite product info");

        let (product, recommendations, reviews) = futures_util::future::join3(
            self.get_product(product_id),
            self.get_recommendations(product_id),
            self.get_reviews(product_id),
        )
        .await;

        let aggregate = ProductAggregate::assemble(
            product?,
            recommendations?,
            reviews?,
            &self.service_address,
        );

        tracing::debug!(
            product_id,
            recommendations = aggregate.recommendations.len(),
            reviews = aggregate.reviews.len(),
            "Composite product assembled"
        );
        Ok(aggregate)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    pub fn create_product(&self, product: Product) -> Result<Product, PublishError> {
        self.publisher
            .publish(Channel::Products, &Event::create(product.product_id, &product))?;
        Ok(product)
    }

    pub fn delete_product(&self, product_id: i32) -> Result<(), PublishError> {
        self.publisher
            .publish(Channel::Products, &Event::<Product>::delete(product_id))
    }

    pub fn create_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> Result<Recommendation, PublishError> {
        self.publisher.publish(
            Channel::Recommendations,
            &Event::create(recommendation.product_id, &recommendation),
        )?;
        Ok(recommendation)
    }

    pub fn delete_recommendations(&self, product_id: i32) -> Result<(), PublishError> {
        self.publisher.publish(
            Channel::Recommendations,
            &Event::<Recommendation>::delete(product_id),
        )
    }

    pub fn create_review(&self, review: Review) -> Result<Review, PublishError> {
        self.publisher
            .publish(Channel::Reviews, &Event::create(review.product_id, &review))?;
        Ok(review)
    }

    pub fn delete_reviews(&self, product_id: i32) -> Result<(), PublishError> {
        self.publisher
            .publish(Channel::Reviews, &Event::<Review>::delete(product_id))
    }

    /// Publish the product, then each recommendation and review, as CREATE
    /// events. Stops at the first event that cannot be queued.
    pub fn create_composite(&self, aggregate: &ProductAggregate) -> Result<(), PublishError> {
        tracing::info!(product_id = aggregate.product_id, "Will create a new composite entity");

        self.create_product(aggregate.product())?;
        for recommendation in aggregate.recommendation_entities() {
            self.create_recommendation(recommendation)?;
        }
        for review in aggregate.review_entities() {
            self.create_review(review)?;
        }
        Ok(())
    }

    /// Publish a DELETE on every channel for `product_id`.
    pub fn delete_composite(&self, product_id: i32) -> Result<(), PublishError> {
        tracing::info!(product_id, "Will delete a composite entity");

        self.delete_product(product_id)?;
        self.delete_recommendations(product_id)?;
        self.delete_reviews(product_id)
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    pub async fn product_health(&self) -> DependencyHealth {
        self.probe(&self.product).await
    }

    pub async fn recommendation_health(&self) -> DependencyHealth {
        self.probe(&self.recommendation).await
    }

    pub async fn review_health(&self) -> DependencyHealth {
        self.probe(&self.review).await
    }

    /// Probe all three services concurrently. A down service never keeps the
    /// others from being reported.
    pub async fn health_summary(&self) -> HealthSummary {
        let readers = [&self.product, &self.recommendation, &self.review];
        let probes = futures_util::future::join_all(
            readers
                .iter()
                .map(|reader| async move { (reader.dependency(), self.probe(reader).await) }),
        )
        .await;

        HealthSummary::from_probes(probes)
    }

    async fn probe(&self, reader: &DownstreamReader) -> DependencyHealth {
        self.prober.probe(reader.dependency(), reader.base_url()).await
    }
}
