use crate::milestone::MilestoneIndex;

/// Consensus-level pruning parameters.
#[derive(Clone, Copy, Debug)]
pub struct PruningParams {
    /// How far back behind a target index solid entry points may reach.
    pub solid_entry_point_check_threshold_past: MilestoneIndex,
}

impl Default for PruningParams {
    fn default() -> Self {
        Self { solid_entry_point_check_threshold_past: 50 }
    }
}
