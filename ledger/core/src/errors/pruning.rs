use crate::errors::store::StoreError;
use crate::errors::traversal::TraversalError;
use crate::milestone::MilestoneIndex;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PruningError {
    /// Fatal: the process state is corrupt without a snapshot record.
    #[error("no snapshot info found")]
    MissingSnapshotInfo,

    #[error("not enough history (limit index: {limit}, target index: {target})")]
    NotEnoughHistory { limit: MilestoneIndex, target: MilestoneIndex },

    #[error("no pruning needed (pruning index: {pruning}, target index: {target})")]
    NoPruningNeeded { pruning: MilestoneIndex, target: MilestoneIndex },

    #[error("pruning was aborted")]
    PruningAborted,

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PruningResult<T> = std::result::Result<T, PruningError>;
