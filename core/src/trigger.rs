use triggered::{trigger, Listener, Trigger};

/// A single-use signal with any number of listeners.
///
/// The listener side is cloneable and can be both polled (`is_triggered`) from
/// blocking workers and awaited from async tasks, which is how the same value
/// serves as a pruning abort signal and as a service shutdown signal.
#[derive(Debug, Clone)]
pub struct SingleTrigger {
    pub trigger: Trigger,
    pub listener: Listener,
}

impl SingleTrigger {
    pub fn new() -> Self {
        let (trigger, listener) = trigger();
        Self { trigger, listener }
    }
}

impl Default for SingleTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::SingleTrigger;

    #[test]
    fn test_trigger_observed_by_all_listeners() {
        let shutdown = SingleTrigger::new();
        let listener = shutdown.listener.clone();
        assert!(!listener.is_triggered());
        shutdown.trigger.trigger();
        assert!(listener.is_triggered());
        assert!(shutdown.listener.is_triggered());
    }
}
