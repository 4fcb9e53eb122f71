mod processor;

pub use processor::{PruningEvents, PruningProcessingMessage, PruningProcessor};
