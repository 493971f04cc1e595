//! entry -> resolved state machine
//!
//! the phase is never stored on its own: the game is resolved exactly when a
//! winning circle has been committed, and there is no way back.

use crate::error::{Error, Result};
use crate::types::{Limits, Phase, WinningCircle};

#[derive(Clone, Debug, Default)]
pub struct PhaseController {
    circle: Option<WinningCircle>,
}

impl PhaseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match self.circle {
            Some(_) => Phase::Resolved,
            None => Phase::Entry,
        }
    }

    pub fn circle(&self) -> Option<&WinningCircle> {
        self.circle.as_ref()
    }

    pub fn require_entry(&self) -> Result<()> {
        match self.phase() {
            Phase::Entry => Ok(()),
            actual => Err(Error::WrongPhase {
                expected: Phase::Entry,
                actual,
            }),
        }
    }

    pub fn require_resolved(&self) -> Result<&WinningCircle> {
        self.circle.as_ref().ok_or(Error::WinningCircleNotSet)
    }

    /// one-shot transition to `Resolved`
    ///
    /// authority checks belong to the caller; this only guards the state.
    pub fn commit(&mut self, circle: WinningCircle, limits: &Limits) -> Result<()> {
        if self.circle.is_some() {
            return Err(Error::WinningCircleAlreadySet);
        }
        limits.check_circle(&circle)?;
        self.circle = Some(circle);
        Ok(())
    }
}
