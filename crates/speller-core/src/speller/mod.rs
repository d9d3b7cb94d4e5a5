//! Speller session state machine.
//!
//! A [`Speller`] sequences calibration and testing on a single async timeline.
//! Commands that arrive from elsewhere (`stop`, `predict`) only flip a field;
//! the running sequence notices at its next checkpoint:
//!
//! - before each group flash of a round
//! - before each round of an unbounded test block
//! - every `durations.poll` ms after a bounded test block
//!
//! An in-flight flash or sleep always completes.
//!
//! ## Usage
//!
//! ```ignore
//! let speller = Arc::new(Speller::new(&config, HeadlessSurface, Arc::new(sink))?);
//! speller.attach().await?;
//! speller.train(None).await?;
//! let run = tokio::spawn({ let s = Arc::clone(&speller); async move { s.test().await } });
//! speller.predict_symbol('A'); // from the classifier
//! speller.stop();              // from the user
//! run.await??;
//! speller.dispose().await?;
//! ```

mod sequence;
mod status;
mod trial;

pub use status::SessionStatus;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

use crate::channel::{EventSink, ModelMessage};
use crate::config::{Config, SessionOptions};
use crate::error::{ConfigError, Result};
use crate::events::Event;
use crate::lifecycle::{Lifecycle, LifecycleDispatcher, LifecycleKind};
use crate::sampler::JitterRange;
use crate::scheduler::CooperativeScheduler;
use crate::surface::StimulusSurface;
use status::SessionState;

/// Characters of prediction feedback kept by [`Speller::spelled`].
pub const FEEDBACK_LENGTH: usize = 30;

pub struct Speller {
    options: Arc<SessionOptions>,
    sink: Arc<dyn EventSink>,
    scheduler: CooperativeScheduler,
    lifecycle: LifecycleDispatcher,
    state: Arc<Mutex<SessionState>>,
    rng: Mutex<Mcg128Xsl64>,
    spelled: Mutex<String>,
    attached: AtomicBool,
    ended: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Speller {
    /// Validate `config` and start the scheduler that owns `surface`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new<S>(config: &Config, surface: S, sink: Arc<dyn EventSink>) -> Result<Self, ConfigError>
    where
        S: StimulusSurface + 'static,
    {
        let options = config.resolve()?;
        let rng = match options.config().seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        tracing::debug!(
            symbols = options.alphabet().len(),
            groups = options.groups(),
            "speller created"
        );
        Ok(Self {
            options: Arc::new(options),
            sink,
            scheduler: CooperativeScheduler::start(Box::new(surface)),
            lifecycle: LifecycleDispatcher::new(),
            state: Arc::new(Mutex::new(SessionState::new())),
            rng: Mutex::new(rng),
            spelled: Mutex::new(String::new()),
            attached: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }

    /// Register a presentation-layer callback. Register before sharing the
    /// speller between tasks.
    pub fn on<F>(&mut self, kind: LifecycleKind, callback: F)
    where
        F: Fn(&Lifecycle) + Send + Sync + 'static,
    {
        self.lifecycle.on(kind, callback);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        lock(&self.state).status
    }

    pub fn target(&self) -> Option<usize> {
        lock(&self.state).target
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The most recent predictions, oldest first.
    pub fn spelled(&self) -> String {
        lock(&self.spelled).clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Build the grid and announce the session with its options.
    ///
    /// Only the first call has an effect.
    pub async fn attach(&self) -> Result<()> {
        if self.attached.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let options = Arc::clone(&self.options);
        self.scheduler
            .enqueue(move |surface| surface.attach(options.alphabet()))
            .await??;
        self.emit(Event::SessionBegins(Box::new(self.options.config().clone())))?;
        Ok(())
    }

    /// End the session: emit `session_ends`, release the surface, and stop
    /// the scheduler. Only the first call on an attached session has an
    /// effect. Dropping an attached speller does the same without waiting.
    pub async fn dispose(&self) -> Result<()> {
        if !self.attached.load(Ordering::SeqCst) || self.ended.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.emit(Event::SessionEnds)?;
        self.scheduler.enqueue(|surface| surface.dispose()).await?;
        self.scheduler.shutdown().await;
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// End testing. The running cycle finishes at its next checkpoint.
    ///
    /// No effect unless testing.
    pub fn stop(&self) {
        if self.transition(SessionStatus::Testing, SessionStatus::Idle) {
            tracing::debug!("testing stopped");
        } else {
            tracing::debug!(status = ?self.status(), "stop ignored");
        }
    }

    /// Record a predicted symbol index. No effect unless testing.
    pub fn predict(&self, symbol: usize) {
        if symbol >= self.options.alphabet().len() {
            tracing::warn!(symbol, "prediction outside the alphabet ignored");
            return;
        }
        let mut state = lock(&self.state);
        if state.status == SessionStatus::Testing {
            state.target = Some(symbol);
            tracing::debug!(symbol, "prediction recorded");
        }
    }

    /// Record a predicted symbol by character.
    pub fn predict_symbol(&self, symbol: char) {
        match self.options.alphabet().index_of(symbol) {
            Some(index) => self.predict(index),
            None => tracing::warn!(%symbol, "predicted symbol is not in the alphabet"),
        }
    }

    /// Route a message from the classifier.
    pub fn handle_model_message(&self, message: &ModelMessage) {
        match *message {
            ModelMessage::Ready => {
                if self.status() == SessionStatus::Idle {
                    self.lifecycle.trigger(&Lifecycle::ModelReady);
                }
            }
            ModelMessage::Predict { target } => {
                if self.status() != SessionStatus::Testing {
                    return;
                }
                {
                    let mut spelled = lock(&self.spelled);
                    spelled.push(target);
                    let excess = spelled.chars().count().saturating_sub(FEEDBACK_LENGTH);
                    if excess > 0 {
                        let cut = spelled
                            .char_indices()
                            .nth(excess)
                            .map_or(spelled.len(), |(i, _)| i);
                        spelled.drain(..cut);
                    }
                }
                self.lifecycle.trigger(&Lifecycle::Predicted(target));
                self.predict_symbol(target);
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&self, event: Event) -> Result<()> {
        self.sink.emit(event)?;
        Ok(())
    }

    fn transition(&self, from: SessionStatus, to: SessionStatus) -> bool {
        let changed = lock(&self.state).transition(from, to);
        if changed {
            tracing::debug!(?from, ?to, "status changed");
        }
        changed
    }

    fn set_status(&self, status: SessionStatus) {
        lock(&self.state).status = status;
        tracing::debug!(?status, "status changed");
    }

    fn set_target(&self, target: Option<usize>) {
        lock(&self.state).target = target;
    }

    fn interrupted(&self) -> bool {
        lock(&self.state).interrupted()
    }

    fn sample(&self, range: &JitterRange) -> Duration {
        range.sample(&mut *lock(&self.rng))
    }
}

impl Drop for Speller {
    fn drop(&mut self) {
        if !self.attached.load(Ordering::SeqCst) || self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.sink.emit(Event::SessionEnds) {
            tracing::warn!("failed to emit session_ends on drop: {e}");
        }
        if self.scheduler.submit(|surface| surface.dispose()).is_err() {
            tracing::warn!("surface not disposed: scheduler already closed");
        }
    }
}

impl std::fmt::Debug for Speller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *lock(&self.state);
        f.debug_struct("Speller")
            .field("status", &state.status)
            .field("target", &state.target)
            .field("groups", &self.options.groups())
            .finish_non_exhaustive()
    }
}
