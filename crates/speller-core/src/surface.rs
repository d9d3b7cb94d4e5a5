//! The rendering collaborator.
//!
//! Grid construction, sizing and styling live behind [`StimulusSurface`]. The
//! session never touches a surface directly: the cooperative scheduler owns it
//! and every call below runs as a queued task.

use std::sync::{Arc, Mutex, PoisonError};

use crate::alphabet::Alphabet;
use crate::config::StimulusStyle;
use crate::error::SurfaceError;

pub trait StimulusSurface: Send {
    /// Build the grid. Called once when the session attaches.
    fn attach(&mut self, _alphabet: &Alphabet) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn focus(&mut self, symbol: usize) -> Result<(), SurfaceError>;

    fn unfocus(&mut self, symbol: usize) -> Result<(), SurfaceError>;

    fn flash(&mut self, group: &[usize], style: StimulusStyle) -> Result<(), SurfaceError>;

    fn unflash(&mut self, group: &[usize], style: StimulusStyle) -> Result<(), SurfaceError>;

    /// Release whatever `attach` acquired.
    fn dispose(&mut self) {}
}

/// Surface that draws nothing.
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl StimulusSurface for HeadlessSurface {
    fn focus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        tracing::trace!(symbol, "focus on");
        Ok(())
    }

    fn unfocus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        tracing::trace!(symbol, "focus off");
        Ok(())
    }

    fn flash(&mut self, group: &[usize], _style: StimulusStyle) -> Result<(), SurfaceError> {
        tracing::trace!(?group, "flash on");
        Ok(())
    }

    fn unflash(&mut self, group: &[usize], _style: StimulusStyle) -> Result<(), SurfaceError> {
        tracing::trace!(?group, "flash off");
        Ok(())
    }
}

/// One call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Attach { symbols: usize },
    Focus(usize),
    Unfocus(usize),
    Flash(Vec<usize>),
    Unflash(Vec<usize>),
    Dispose,
}

/// Surface that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    ops: Arc<Mutex<Vec<SurfaceOp>>>,
    fail_after: Option<usize>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation once `n` operations have been recorded.
    pub fn failing_after(n: usize) -> Self {
        Self {
            ops: Arc::default(),
            fail_after: Some(n),
        }
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, op: SurfaceOp) -> Result<(), SurfaceError> {
        let mut ops = self.ops.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|n| ops.len() >= n) {
            return Err(SurfaceError::Render(format!("refused {op:?}")));
        }
        ops.push(op);
        Ok(())
    }
}

impl StimulusSurface for RecordingSurface {
    fn attach(&mut self, alphabet: &Alphabet) -> Result<(), SurfaceError> {
        self.record(SurfaceOp::Attach {
            symbols: alphabet.len(),
        })
    }

    fn focus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        self.record(SurfaceOp::Focus(symbol))
    }

    fn unfocus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        self.record(SurfaceOp::Unfocus(symbol))
    }

    fn flash(&mut self, group: &[usize], _style: StimulusStyle) -> Result<(), SurfaceError> {
        self.record(SurfaceOp::Flash(group.to_vec()))
    }

    fn unflash(&mut self, group: &[usize], _style: StimulusStyle) -> Result<(), SurfaceError> {
        self.record(SurfaceOp::Unflash(group.to_vec()))
    }

    fn dispose(&mut self) {
        let _ = self.record(SurfaceOp::Dispose);
    }
}
