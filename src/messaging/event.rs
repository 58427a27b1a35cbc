use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Event - one mutation of one entity kind
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Create,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "CREATE",
            EventType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a mutation: `{eventType, key, data, eventCreatedAt}`.
///
/// `key` is always the product id, also for recommendation and review events,
/// so every event about one product lands on the same partition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    pub event_type: EventType,
    pub key: i32,
    pub data: Option<T>,
    pub event_created_at: DateTime<Utc>,
}

impl<T> Event<T> {
    pub fn create(key: i32, data: T) -> Self {
        Self {
            event_type: EventType::Create,
            key,
            data: Some(data),
            event_created_at: Utc::now(),
        }
    }

    pub fn delete(key: i32) -> Self {
        Self {
            event_type: EventType::Delete,
            key,
            data: None,
            event_created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Envelope - what the backbone actually receives
// ============================================================================

/// A serialized event plus its routing metadata.
///
/// `partition_key` is the string form of the event key. The backbone uses it
/// to deliver all events of one product, in order, to one partition.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub message_id: Uuid,
    pub partition_key: String,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
    pub payload: String,
}

impl Envelope {
    pub fn wrap<T: Serialize>(event: &Event<T>) -> serde_json::Result<Self> {
        Ok(Self {
            message_id: Uuid::new_v4(),
            partition_key: event.key.to_string(),
            event_type: event.event_type,
            created_at: event.event_created_at,
            payload: serde_json::to_string(event)?,
        })
    }

    /// Decode the payload back into an event, mostly useful to consumers and tests.
    pub fn event<T: for<'de> Deserialize<'de>>(&self) -> serde_json::Result<Event<T>> {
        serde_json::from_str(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    #[test]
    fn test_delete_event_wire_form() {
        let event: Event<Product> = Event::delete(7);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventType"], "DELETE");
        assert_eq!(json["key"], 7);
        assert!(json["data"].is_null());
        assert!(json["eventCreatedAt"].is_string());
    }

    #[test]
    fn test_envelope_carries_partition_key() {
        let product = Product {
            product_id: 5,
            name: "n".to_string(),
            weight: 1,
            origin_address: None,
        };
        let envelope = Envelope::wrap(&Event::create(5, product.clone())).unwrap();

        assert_eq!(envelope.partition_key, "5");
        assert_eq!(envelope.event_type, EventType::Create);

        let decoded: Event<Product> = envelope.event().unwrap();
        assert_eq!(decoded.data, Some(product));
        assert_eq!(decoded.key, 5);
    }

    #[test]
    fn test_envelopes_get_distinct_message_ids() {
        let event: Event<Product> = Event::delete(1);
        let first = Envelope::wrap(&event).unwrap();
        let second = Envelope::wrap(&event).unwrap();

        assert_ne!(first.message_id, second.message_id);
    }
}
