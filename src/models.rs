use serde::{Deserialize, Serialize};

// ============================================================================
// Core Entities - as served by the product, recommendation and review services
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "id")]
    pub product_id: i32,
    pub name: String,
    pub weight: i32,
    #[serde(default, alias = "serviceAddress")]
    pub origin_address: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_id: i32,
    pub recommendation_id: i32,
    pub author: String,
    #[serde(alias = "rate")]
    pub rating: i32,
    pub content: String,
    #[serde(default, alias = "serviceAddress")]
    pub origin_address: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub product_id: i32,
    pub review_id: i32,
    pub author: String,
    pub subject: String,
    pub content: String,
    #[serde(default, alias = "serviceAddress")]
    pub origin_address: Option<String>,
}

// ============================================================================
// Error body returned by the core services on failure
// ============================================================================

#[derive(Deserialize, Clone, Debug, Default)]
pub struct HttpErrorInfo {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// A code or a reason name depending on the service, kept as sent.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

// ============================================================================
// Composite Aggregate
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductAggregate {
    pub product_id: i32,
    pub name: String,
    pub weight: i32,
    #[serde(default)]
    pub recommendations: Vec<RecommendationSummary>,
    #[serde(default)]
    pub reviews: Vec<ReviewSummary>,
    #[serde(default)]
    pub service_addresses: Option<ServiceAddresses>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub recommendation_id: i32,
    pub author: String,
    #[serde(alias = "rate")]
    pub rating: i32,
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub review_id: i32,
    pub author: String,
    pub subject: String,
    pub content: String,
}

/// Which instance served each part of an aggregate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ServiceAddresses {
    pub cmp: String,
    pub pro: String,
    pub rev: String,
    pub rec: String,
}

impl ProductAggregate {
    /// Assembles the composite from the three downstream results.
    pub fn assemble(
        product: Product,
        recommendations: Vec<Recommendation>,
        reviews: Vec<Review>,
        composite_address: &str,
    ) -> Self {
        let first_address = |address: Option<&Option<String>>| {
            address.and_then(|a| a.clone()).unwrap_or_default()
        };

        let service_addresses = ServiceAddresses {
            cmp: composite_address.to_string(),
            pro: product.origin_address.clone().unwrap_or_default(),
            rev: first_address(reviews.first().map(|r| &r.origin_address)),
            rec: first_address(recommendations.first().map(|r| &r.origin_address)),
        };

        Self {
            product_id: product.product_id,
            name: product.name,
            weight: product.weight,
            recommendations: recommendations
                .into_iter()
                .map(|r| RecommendationSummary {
                    recommendation_id: r.recommendation_id,
                    author: r.author,
                    rating: r.rating,
                    content: r.content,
                })
                .collect(),
            reviews: reviews
                .into_iter()
                .map(|r| ReviewSummary {
                    review_id: r.review_id,
                    author: r.author,
                    subject: r.subject,
                    content: r.content,
                })
                .collect(),
            service_addresses: Some(service_addresses),
        }
    }

    /// The core product carried by this aggregate.
    pub fn product(&self) -> Product {
        Product {
            product_id: self.product_id,
            name: self.name.clone(),
            weight: self.weight,
            origin_address: None,
        }
    }

    pub fn recommendation_entities(&self) -> Vec<Recommendation> {
        self.recommendations
            .iter()
            .map(|r| Recommendation {
                product_id: self.product_id,
                recommendation_id: r.recommendation_id,
                author: r.author.clone(),
                rating: r.rating,
                content: r.content.clone(),
                origin_address: None,
            })
            .collect()
    }

    pub fn review_entities(&self) -> Vec<Review> {
        self.reviews
            .iter()
            .map(|r| Review {
                product_id: self.product_id,
                review_id: r.review_id,
                author: r.author.clone(),
                subject: r.subject.clone(),
                content: r.content.clone(),
                origin_address: None,
            })
            .collect()
    }
}
