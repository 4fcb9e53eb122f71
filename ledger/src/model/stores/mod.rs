pub mod bundles;
pub mod children;
pub mod ledger_diffs;
pub mod messages;
pub mod metadata;
pub mod milestones;
pub mod snapshot;
pub mod solid_entry_points;
pub mod unconfirmed;
