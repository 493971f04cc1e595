//! circle-game: whitelisted two-phase positional game
//!
//! participants on a merkle whitelist each claim one unique (x, y) position,
//! either directly or through a relayer carrying their secp256k1 signature.
//! once the authority commits the winning circle the game is resolved: no
//! more entries, and anyone can trigger payouts to entrants inside the circle.
//!
//! ```text
//!   Entry ──set_winning_position──▶ Resolved
//!     │ enter / gasless_enter          │ claim
//!     ▼                                ▼
//!   PositionRegistry              ClaimResolver ──▶ TokenLedger
//! ```
//!
//! ## usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use circle_game::{build_tree, Game, GameParams, InMemoryLedger, Position, WinningCircle};
//!
//! let tree = build_tree(&[alice, bob]);
//! let ledger = Arc::new(InMemoryLedger::new(token));
//! let game = Game::new(GameParams::new(authority, token, tree.root().unwrap()), ledger.clone())?;
//! ledger.mint(&game.address(), game.payout_amount())?;
//!
//! game.enter(&alice, Position::new(40, 40), &tree.proof(alice.as_bytes()).unwrap())?;
//! game.set_winning_position(&authority, WinningCircle::new(50, 50, 20))?;
//! let receipt = game.claim(&anyone, &[alice, bob])?;
//! ```

pub mod claim;
pub mod config;
pub mod error;
pub mod game;
pub mod ledger;
pub mod phase;
pub mod registry;
pub mod relay;
pub mod signature;
pub mod types;
pub mod whitelist;

pub use claim::{is_inside, ClaimReceipt, ClaimResolver, Payout, PayoutPolicy, SkipReason, Skipped};
pub use config::{ConfigError, GameConfig};
pub use error::{Error, Result};
pub use game::{Game, GameParams, DEFAULT_PAYOUT};
pub use ledger::{InMemoryLedger, LedgerError, TokenLedger};
pub use phase::PhaseController;
pub use registry::PositionRegistry;
pub use relay::EntryRelay;
pub use signature::{entry_digest, recover, EntrySigner, SIGNATURE_LEN};
pub use types::{
    format_hash, parse_hash, Address, Axis, Hash, Limits, ParseAddressError, Phase, Position,
    WinningCircle, MAX_AXIS, MAX_RADIUS,
};
pub use whitelist::{build_tree, is_whitelisted, require_whitelisted};
