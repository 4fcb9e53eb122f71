use crate::milestone::MilestoneIndex;

/// Extra milestones of history kept beyond the entry-point window. Cone walks
/// during entry-point recomputation can reach messages referenced from older
/// milestones, so pruning advances in steps of at most this many milestones
/// between entry-point refreshes.
pub const ADDITIONAL_PRUNING_THRESHOLD: MilestoneIndex = 50;
