//! Flashes, focus periods, rounds and blocks.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::{lock, Speller};
use crate::error::Result;
use crate::events::Event;
use crate::groups;

impl Speller {
    /// Flash every symbol of `group` for `duration`.
    ///
    /// Marking and unmarking each run as one scheduler task together with
    /// their `flash_begins` / `flash_ends` event.
    pub(crate) async fn flash(&self, group: &[usize], duration: Duration) -> Result<()> {
        let style = self.options.stim();
        let members = group.to_vec();
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        self.scheduler
            .enqueue(move |surface| -> Result<()> {
                surface.flash(&members, style)?;
                let includes_target = lock(&state).includes_target(&members);
                sink.emit(Event::FlashBegins {
                    group: members,
                    includes_target,
                })?;
                Ok(())
            })
            .await??;

        tracing::trace!(?group, ms = duration.as_millis() as u64, "flashing");
        sleep(duration).await;

        let members = group.to_vec();
        let sink = Arc::clone(&self.sink);
        self.scheduler
            .enqueue(move |surface| -> Result<()> {
                surface.unflash(&members, style)?;
                sink.emit(Event::FlashEnds)?;
                Ok(())
            })
            .await??;
        Ok(())
    }

    /// Highlight one symbol for `duration`.
    pub(crate) async fn focus(&self, symbol: usize, duration: Duration) -> Result<()> {
        self.scheduler
            .enqueue(move |surface| surface.focus(symbol))
            .await??;
        sleep(duration).await;
        self.scheduler
            .enqueue(move |surface| surface.unfocus(symbol))
            .await??;
        Ok(())
    }

    /// Focus on `symbol` for the configured duration, between
    /// `focus_begins` and `focus_ends`.
    pub(crate) async fn focus_period(&self, symbol: usize) -> Result<()> {
        self.emit(Event::FocusBegins { target: symbol })?;
        self.focus(symbol, self.options.durations().focus()).await?;
        self.emit(Event::FocusEnds)?;
        Ok(())
    }

    /// Draw fresh groups and flash each of them once.
    ///
    /// Stops flashing as soon as the session is interrupted; `round_ends` is
    /// emitted either way.
    pub async fn round(&self) -> Result<()> {
        let groups = groups::allocate(
            &mut *lock(&self.rng),
            self.options.alphabet().len(),
            self.options.groups(),
        );
        self.emit(Event::RoundBegins {
            groups: groups.clone(),
        })?;

        let durations = self.options.durations();
        for group in &groups {
            if self.interrupted() {
                tracing::debug!("round interrupted");
                break;
            }
            let flash = self.sample(&durations.flash);
            self.flash(group, flash).await?;
            let gap = self.sample(&durations.inter_flash);
            sleep(gap).await;
        }

        self.emit(Event::RoundEnds)?;
        Ok(())
    }

    /// Run `repetitions` rounds back to back.
    pub async fn block(&self, repetitions: u32) -> Result<()> {
        for _ in 0..repetitions {
            self.round().await?;
        }
        Ok(())
    }
}
