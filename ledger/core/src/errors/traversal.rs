use tangle_hashes::MessageId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    #[error("message {0} not found during traversal")]
    MissingMessage(MessageId),

    #[error("traversal was aborted")]
    Aborted,

    #[error("{0}")]
    Other(&'static str),
}

pub type TraversalResult<T> = std::result::Result<T, TraversalError>;
