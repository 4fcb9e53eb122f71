use parking_lot::RwLock;

/// A synchronous fan-out of a single typed event.
///
/// Handlers are registered once during setup and are invoked in registration
/// order, on the thread that calls `trigger`. Handlers must not call back into
/// the request API of the component firing them: the firing thread is usually
/// that component's own event loop and such a call would deadlock it.
pub struct Event<T: ?Sized> {
    handlers: RwLock<Vec<Box<dyn Fn(&T) + Send + Sync>>>,
}

impl<T: ?Sized> Event<T> {
    pub fn new() -> Self {
        Self { handlers: RwLock::new(Vec::new()) }
    }

    /// Registers a handler. Registration order is invocation order.
    pub fn attach(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.handlers.write().push(Box::new(handler));
    }

    /// Invokes all handlers with `payload` on the calling thread.
    pub fn trigger(&self, payload: &T) {
        for handler in self.handlers.read().iter() {
            handler(payload);
        }
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.read().is_empty()
    }
}

impl<T: ?Sized> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_handlers_fire_in_registration_order() {
        let event: Event<u64> = Event::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3u64 {
            let seen = seen.clone();
            event.attach(move |payload| seen.lock().push((tag, *payload)));
        }

        event.trigger(&7);
        event.trigger(&8);
        assert_eq!(*seen.lock(), vec![(0, 7), (1, 7), (2, 7), (0, 8), (1, 8), (2, 8)]);
    }

    #[test]
    fn test_trigger_without_handlers_is_a_noop() {
        let event: Event<()> = Event::new();
        assert!(!event.has_handlers());
        event.trigger(&());
    }
}
