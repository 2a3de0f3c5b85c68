use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("queue store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode queue response: {source}; body: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("service key contains characters not allowed in an http header")]
    InvalidServiceKey,

    #[error("no key columns to try")]
    NoKeyCandidates,
}
