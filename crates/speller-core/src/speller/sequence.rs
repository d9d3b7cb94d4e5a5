//! Calibration and testing sequences.

use std::time::Duration;

use tokio::time::sleep;

use super::{SessionStatus, Speller};
use crate::error::Result;
use crate::events::Event;
use crate::lifecycle::Lifecycle;

impl Speller {
    /// Calibrate on `targets`, or on the configured training string.
    ///
    /// Runs the optional baselines, then for each target a focus period and a
    /// training block. Ends in `Idle`. No effect unless the session is
    /// `Ready`.
    ///
    /// # Errors
    ///
    /// Returns a validation error, before anything is emitted, if a target is
    /// not in the alphabet. Collaborator failures abort the sequence.
    pub async fn train(&self, targets: Option<&str>) -> Result<()> {
        if self.status() != SessionStatus::Ready {
            tracing::debug!(status = ?self.status(), "train ignored");
            return Ok(());
        }
        let targets = targets
            .unwrap_or(self.options.config().targets.as_str())
            .to_uppercase();
        let indices = self.options.alphabet().indices(&targets)?;

        if !self.transition(SessionStatus::Ready, SessionStatus::Calibrating) {
            return Ok(());
        }
        self.emit(Event::CalibrationBegins)?;

        let durations = self.options.durations();
        if durations.baseline_eyes_open > 0 {
            self.lifecycle.trigger(&Lifecycle::BaselineEyesOpenBegins);
            self.emit(Event::BaselineEyesOpenBegins)?;
            sleep(durations.baseline_eyes_open()).await;
            self.emit(Event::BaselineEyesOpenEnds)?;
        }
        if durations.baseline_eyes_closed > 0 {
            self.lifecycle.trigger(&Lifecycle::BaselineEyesClosedBegins);
            self.emit(Event::BaselineEyesClosedBegins)?;
            sleep(durations.baseline_eyes_closed()).await;
            self.emit(Event::BaselineEyesClosedEnds)?;
        }

        self.emit(Event::TrainingBegins {
            targets: targets.clone(),
        })?;
        let repetitions = self.options.repetitions().train;
        for (symbol, target) in targets.chars().zip(indices) {
            self.set_target(Some(target));
            self.lifecycle.trigger(&Lifecycle::FocusBegins(symbol));
            self.focus_period(target).await?;
            sleep(durations.inter_block()).await;
            self.emit(Event::BlockBegins {
                target: Some(target),
            })?;
            self.block(repetitions).await?;
            self.emit(Event::BlockEnds)?;
        }
        self.set_target(None);

        self.lifecycle.trigger(&Lifecycle::TrainingEnds);
        self.emit(Event::TrainingEnds)?;
        self.set_status(SessionStatus::Idle);
        self.emit(Event::CalibrationEnds)?;
        Ok(())
    }

    /// Run test cycles until [`stop`](Speller::stop) is called.
    ///
    /// The cycle in flight when testing stops always completes, including the
    /// focus on a prediction it already received. No effect unless the session
    /// is `Idle`.
    pub async fn test(&self) -> Result<()> {
        if !self.transition(SessionStatus::Idle, SessionStatus::Testing) {
            tracing::debug!(status = ?self.status(), "test ignored");
            return Ok(());
        }
        self.emit(Event::TestingBegins)?;

        let durations = self.options.durations();
        let repetitions = self.options.repetitions().test;
        while self.status() == SessionStatus::Testing {
            sleep(durations.inter_block()).await;
            self.test_cycle(repetitions).await?;
        }

        self.emit(Event::TestingEnds)?;
        Ok(())
    }

    /// One test block, then the focus on whatever was predicted.
    ///
    /// With `repetitions == 0` rounds repeat until interrupted. Otherwise a
    /// full block of `repetitions` rounds runs, and the cycle then polls every
    /// `durations.poll` ms until interrupted. Nothing interrupts it while
    /// `Ready` or `Calibrating`; [`test`](Speller::test) is the intended caller.
    pub async fn test_cycle(&self, repetitions: u32) -> Result<()> {
        self.emit(Event::BlockBegins { target: None })?;
        if repetitions == 0 {
            while !self.interrupted() {
                self.round().await?;
            }
            self.emit(Event::BlockEnds)?;
        } else {
            self.block(repetitions).await?;
            self.emit(Event::BlockEnds)?;
            self.wait_for_interruption(self.options.durations().poll())
                .await;
        }

        if let Some(target) = self.target() {
            self.focus_period(target).await?;
            self.set_target(None);
        }
        Ok(())
    }

    async fn wait_for_interruption(&self, poll: Duration) {
        while !self.interrupted() {
            sleep(poll).await;
        }
    }
}
