use reqwest::StatusCode;

// ============================================================================
// Downstream Failures - what went wrong talking to a core service
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DownstreamFailure {
    /// The service answered with a non-2xx status.
    #[error("{status} from GET {url}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 2xx, but the body did not match the expected shape.
    #[error("Malformed response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DownstreamFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DownstreamFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            DownstreamFailure::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

// ============================================================================
// Composite Errors - surfaced to callers of the gateway
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Unknown(DownstreamFailure),
}

// ============================================================================
// Publish Errors - handing an event to the publish pool
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Publish lane {lane} is full")]
    Saturated { lane: usize },

    #[error("Publish pool is shut down")]
    Closed,
}

impl PublishError {
    /// Label used for the `events_failed_total` reason.
    pub fn reason(&self) -> &'static str {
        match self {
            PublishError::Encode(_) => "encode",
            PublishError::Saturated { .. } => "saturated",
            PublishError::Closed => "closed",
        }
    }
}
