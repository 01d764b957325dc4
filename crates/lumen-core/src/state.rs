//! The single-writer actuator state store.
//!
//! The store owns the logical actuator value and its version counter.
//! Hardware and other side effects hang off it as [`StateObserver`]s and
//! are told about every write after the fact.

use tracing::{debug, trace};

/// Logical actuator value plus the number of writes that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    /// `true` when the actuator is on.
    pub value: bool,
    /// Incremented by exactly one on every write.
    pub version: u64,
}

/// Something that reacts to actuator writes.
///
/// Observers run synchronously inside [`StateStore::set`]. They must not
/// fail visibly; any error is theirs to log and swallow.
pub trait StateObserver: Send {
    /// Called after every write with the new state.
    fn state_changed(&mut self, state: ActuatorState);
}

/// A physical output driven by the logical state.
pub trait Actuator: Send {
    /// Drive the output on or off.
    fn apply(&mut self, on: bool);
}

/// A status display showing the logical state.
pub trait Display: Send {
    /// Redraw with the given value.
    fn render(&mut self, on: bool);
}

/// Adapts an [`Actuator`] into a [`StateObserver`].
#[derive(Debug)]
pub struct ActuatorHook<A>(pub A);

impl<A: Actuator> StateObserver for ActuatorHook<A> {
    fn state_changed(&mut self, state: ActuatorState) {
        self.0.apply(state.value);
    }
}

/// Adapts a [`Display`] into a [`StateObserver`].
#[derive(Debug)]
pub struct DisplayHook<D>(pub D);

impl<D: Display> StateObserver for DisplayHook<D> {
    fn state_changed(&mut self, state: ActuatorState) {
        self.0.render(state.value);
    }
}

/// Owner of the actuator state.
#[derive(Default)]
pub struct StateStore {
    state: ActuatorState,
    observers: Vec<Box<dyn StateObserver>>,
}

impl StateStore {
    /// Create a store holding `(false, 0)` with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn observe(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register an observer, builder style.
    #[must_use]
    pub fn with_observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observe(observer);
        self
    }

    /// Attach an actuator.
    #[must_use]
    pub fn with_actuator(self, actuator: impl Actuator + 'static) -> Self {
        self.with_observer(ActuatorHook(actuator))
    }

    /// Attach a display.
    #[must_use]
    pub fn with_display(self, display: impl Display + 'static) -> Self {
        self.with_observer(DisplayHook(display))
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> ActuatorState {
        self.state
    }

    /// Write a new value.
    ///
    /// The version is bumped even when `value` equals the current value,
    /// so every write is visible downstream. Observers are notified before
    /// this returns.
    pub fn set(&mut self, value: bool) -> ActuatorState {
        self.state = ActuatorState {
            value,
            version: self.state.version + 1,
        };
        debug!(
            value = self.state.value,
            version = self.state.version,
            "Actuator state written"
        );
        self.notify();
        self.state
    }

    /// Push the current state to every observer without writing.
    ///
    /// Used once at boot so outputs start in the logical state.
    pub fn sync_observers(&mut self) {
        self.notify();
    }

    fn notify(&mut self) {
        let state = self.state;
        for observer in &mut self.observers {
            observer.state_changed(state);
        }
        trace!(observers = self.observers.len(), "Observers notified");
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<ActuatorState>>>);

    impl StateObserver for Recorder {
        fn state_changed(&mut self, state: ActuatorState) {
            self.0.lock().unwrap().push(state);
        }
    }

    struct Pin(Arc<Mutex<Vec<bool>>>);

    impl Actuator for Pin {
        fn apply(&mut self, on: bool) {
            self.0.lock().unwrap().push(on);
        }
    }

    struct Panel(Arc<Mutex<Vec<bool>>>);

    impl Display for Panel {
        fn render(&mut self, on: bool) {
            self.0.lock().unwrap().push(on);
        }
    }

    #[test]
    fn test_initial_state() {
        let store = StateStore::new();
        assert_eq!(
            store.get(),
            ActuatorState {
                value: false,
                version: 0
            }
        );
    }

    #[test]
    fn test_version_increments_on_every_write() {
        let mut store = StateStore::new();

        let writes = [true, true, false, false, true];
        for (i, value) in writes.into_iter().enumerate() {
            let state = store.set(value);
            assert_eq!(state.value, value);
            assert_eq!(state.version, i as u64 + 1);
        }
        assert_eq!(store.get().version, 5);
    }

    #[test]
    fn test_observers_see_every_write_in_order() {
        let recorder = Recorder::default();
        let mut store = StateStore::new().with_observer(recorder.clone());

        store.set(true);
        store.set(true);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ActuatorState {
                    value: true,
                    version: 1
                },
                ActuatorState {
                    value: true,
                    version: 2
                },
            ]
        );
    }

    #[test]
    fn test_actuator_and_display_hooks() {
        let pin = Arc::new(Mutex::new(Vec::new()));
        let panel = Arc::new(Mutex::new(Vec::new()));
        let mut store = StateStore::new()
            .with_actuator(Pin(pin.clone()))
            .with_display(Panel(panel.clone()));
        assert_eq!(store.observer_count(), 2);

        store.sync_observers();
        store.set(true);

        assert_eq!(*pin.lock().unwrap(), vec![false, true]);
        assert_eq!(*panel.lock().unwrap(), vec![false, true]);
        // Syncing does not count as a write
        assert_eq!(store.get().version, 1);
    }
}
