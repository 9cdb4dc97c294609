use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// A storyboard item id that does not exist in the working document.
    #[error("Storyboard item not found: {0}")]
    ItemNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An upload exceeded the fixed size cap. `size` and `limit` are in bytes.
    #[error("File '{name}' is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}
