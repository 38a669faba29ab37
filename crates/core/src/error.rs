use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The document exists but does not carry the requested channel.
    #[error("Channel '{channel}' not found in {file}")]
    ChannelNotFound { channel: String, file: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
