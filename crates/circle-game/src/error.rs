//! error types for circle-game
//!
//! every variant is a rejected operation: game state is exactly as it was
//! before the call.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::types::{Address, Axis, Phase};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // === construction ===
    #[error("authority must not be the zero address")]
    ZeroAuthority,

    #[error("payout token must not be the zero address")]
    ZeroTokenHandle,

    #[error("whitelist root must not be zero")]
    ZeroWhitelistRoot,

    #[error("ledger moves token {actual}, game pays out {expected}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error("axis and radius maxima must be non-zero")]
    InvalidLimits,

    #[error("payout amount must be non-zero")]
    ZeroPayout,

    // === authorization ===
    #[error("{caller} is not the game authority")]
    AuthorityRequired { caller: Address },

    #[error("{0} is not whitelisted")]
    NotWhitelisted(Address),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid signing key")]
    InvalidSigningKey,

    // === phase ===
    #[error("operation needs the {expected} phase, game is {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("winning circle is already set")]
    WinningCircleAlreadySet,

    #[error("winning circle has not been set yet")]
    WinningCircleNotSet,

    // === positions ===
    #[error("{0} already has a position")]
    PositionAlreadySet(Address),

    #[error("position (0, 0) is reserved")]
    ZeroCoordinate,

    #[error("{axis} = {value} is outside [1, {max}]")]
    CoordinateOutOfBounds { axis: Axis, value: u32, max: u32 },

    #[error("position ({x}, {y}) is already taken")]
    PositionNotUnique { x: u32, y: u32 },

    // === payouts ===
    #[error("custody holds {available}, batch needs {needed}")]
    InsufficientCustody { needed: u128, available: u128 },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
