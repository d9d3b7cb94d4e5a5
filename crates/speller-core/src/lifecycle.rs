//! In-process lifecycle notifications for the presentation layer.
//!
//! Unlike the event channel, these never leave the process: they let a UI show
//! instructions ("close your eyes", "focus on: A") without being wired into
//! the scheduling code. Callbacks run synchronously, in registration order, on
//! the session timeline.

use std::collections::HashMap;

/// A lifecycle notification with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    BaselineEyesOpenBegins,
    BaselineEyesClosedBegins,
    /// Training focuses on this symbol.
    FocusBegins(char),
    TrainingEnds,
    /// The classifier reported it is ready while the session is idle.
    ModelReady,
    /// The classifier predicted this symbol during testing.
    Predicted(char),
}

/// Registration key for [`Lifecycle`] events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    BaselineEyesOpenBegins,
    BaselineEyesClosedBegins,
    FocusBegins,
    TrainingEnds,
    ModelReady,
    Predicted,
}

impl Lifecycle {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            Lifecycle::BaselineEyesOpenBegins => LifecycleKind::BaselineEyesOpenBegins,
            Lifecycle::BaselineEyesClosedBegins => LifecycleKind::BaselineEyesClosedBegins,
            Lifecycle::FocusBegins(_) => LifecycleKind::FocusBegins,
            Lifecycle::TrainingEnds => LifecycleKind::TrainingEnds,
            Lifecycle::ModelReady => LifecycleKind::ModelReady,
            Lifecycle::Predicted(_) => LifecycleKind::Predicted,
        }
    }
}

type Callback = Box<dyn Fn(&Lifecycle) + Send + Sync>;

#[derive(Default)]
pub struct LifecycleDispatcher {
    callbacks: HashMap<LifecycleKind, Vec<Callback>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: LifecycleKind, callback: F)
    where
        F: Fn(&Lifecycle) + Send + Sync + 'static,
    {
        self.callbacks
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Invoke every callback registered for the event's kind.
    pub fn trigger(&self, event: &Lifecycle) {
        if let Some(callbacks) = self.callbacks.get(&event.kind()) {
            for callback in callbacks {
                callback(event);
            }
        }
    }

    pub fn listeners(&self, kind: LifecycleKind) -> usize {
        self.callbacks.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .callbacks
            .iter()
            .map(|(kind, cbs)| (*kind, cbs.len()))
            .collect();
        f.debug_struct("LifecycleDispatcher")
            .field("callbacks", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callbacks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = LifecycleDispatcher::new();
        for i in 0..3 {
            let log = Arc::clone(&log);
            dispatcher.on(LifecycleKind::FocusBegins, move |event| {
                log.lock().unwrap().push((i, *event));
            });
        }

        dispatcher.trigger(&Lifecycle::FocusBegins('Q'));

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (0, Lifecycle::FocusBegins('Q')),
                (1, Lifecycle::FocusBegins('Q')),
                (2, Lifecycle::FocusBegins('Q')),
            ]
        );
    }

    #[test]
    fn only_matching_kind_is_notified() {
        let hits = Arc::new(Mutex::new(0));
        let mut dispatcher = LifecycleDispatcher::new();
        {
            let hits = Arc::clone(&hits);
            dispatcher.on(LifecycleKind::TrainingEnds, move |_| *hits.lock().unwrap() += 1);
        }

        dispatcher.trigger(&Lifecycle::BaselineEyesOpenBegins);
        dispatcher.trigger(&Lifecycle::Predicted('A'));
        assert_eq!(*hits.lock().unwrap(), 0);

        dispatcher.trigger(&Lifecycle::TrainingEnds);
        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(dispatcher.listeners(LifecycleKind::TrainingEnds), 1);
        assert_eq!(dispatcher.listeners(LifecycleKind::ModelReady), 0);
    }

    #[test]
    fn trigger_without_listeners_is_a_no_op() {
        LifecycleDispatcher::new().trigger(&Lifecycle::ModelReady);
    }
}
