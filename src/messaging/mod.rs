// ============================================================================
// Messaging Module
// ============================================================================
//
// Writes never reach the core services directly. Each mutation becomes one
// event, handed to the messaging backbone from a dedicated publish pool.
//
// ============================================================================

mod backbone;
mod event;
mod publisher;
mod redpanda;

pub use backbone::{EventBackbone, InMemoryBackbone};
pub use event::{Envelope, Event, EventType};
pub use publisher::{Bindings, Channel, EventPublisher, PublishPool};
pub use redpanda::RedpandaClient;
