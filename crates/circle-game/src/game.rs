//! the game instance
//!
//! deployment parameters are fixed at construction. everything that changes
//! (phase, positions, paid markers) sits behind one mutex, and every mutating
//! call holds it for its whole check-then-write sequence. two relays racing
//! for the same coordinate therefore cannot both pass the uniqueness check,
//! and a claim batch either pays every winner or nobody.
//!
//! signature recovery and proof checks are pure, so they run before the lock
//! is taken.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use tracing::{debug, info, warn};
use whitelist_merkle::ZERO_HASH;

use crate::claim::{is_inside, ClaimReceipt, ClaimResolver, Payout, PayoutPolicy};
use crate::config::{ConfigError, GameConfig};
use crate::error::{Error, Result};
use crate::ledger::{LedgerError, TokenLedger};
use crate::phase::PhaseController;
use crate::registry::PositionRegistry;
use crate::relay::EntryRelay;
use crate::signature::entry_digest;
use crate::types::{Address, Hash, Limits, Phase, Position, WinningCircle};
use crate::whitelist::require_whitelisted;

/// 200 whole tokens at 18 decimals
pub const DEFAULT_PAYOUT: u128 = 200 * 10u128.pow(18);

const INSTANCE_DOMAIN: &[u8] = b"circle-game:instance:v1";

/// deployments made by this process, mixed into every instance address
static DEPLOY_NONCE: AtomicU64 = AtomicU64::new(0);

/// everything fixed at deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameParams {
    pub authority: Address,
    pub token: Address,
    pub whitelist_root: Hash,
    /// caller-chosen extra input to the instance address
    pub salt: u64,
    pub payout_amount: u128,
    pub payout_policy: PayoutPolicy,
    pub limits: Limits,
}

impl GameParams {
    pub fn new(authority: Address, token: Address, whitelist_root: Hash) -> Self {
        Self {
            authority,
            token,
            whitelist_root,
            salt: 0,
            payout_amount: DEFAULT_PAYOUT,
            payout_policy: PayoutPolicy::default(),
            limits: Limits::default(),
        }
    }
}

#[derive(Default)]
struct GameState {
    phase: PhaseController,
    registry: PositionRegistry,
    paid: HashSet<Address>,
}

pub struct Game {
    address: Address,
    nonce: u64,
    authority: Address,
    token: Address,
    whitelist_root: Hash,
    payout_amount: u128,
    payout_policy: PayoutPolicy,
    limits: Limits,
    relay: EntryRelay,
    ledger: Arc<dyn TokenLedger>,
    state: Mutex<GameState>,
}

impl Game {
    pub fn new(params: GameParams, ledger: Arc<dyn TokenLedger>) -> Result<Self> {
        if params.authority.is_zero() {
            return Err(Error::ZeroAuthority);
        }
        if params.token.is_zero() {
            return Err(Error::ZeroTokenHandle);
        }
        if params.whitelist_root == ZERO_HASH {
            return Err(Error::ZeroWhitelistRoot);
        }
        if ledger.token() != params.token {
            return Err(Error::TokenMismatch {
                expected: params.token,
                actual: ledger.token(),
            });
        }
        params.limits.validate()?;
        if params.payout_amount == 0 {
            return Err(Error::ZeroPayout);
        }

        let nonce = DEPLOY_NONCE.fetch_add(1, Ordering::Relaxed);
        let address = Self::derive_address(
            &params.authority,
            &params.token,
            &params.whitelist_root,
            params.salt,
            nonce,
        );

        info!(
            game = %address,
            nonce,
            authority = %params.authority,
            token = %params.token,
            payout = params.payout_amount,
            policy = ?params.payout_policy,
            "game deployed"
        );

        Ok(Self {
            address,
            nonce,
            authority: params.authority,
            token: params.token,
            whitelist_root: params.whitelist_root,
            payout_amount: params.payout_amount,
            payout_policy: params.payout_policy,
            limits: params.limits,
            relay: EntryRelay::new(address, params.whitelist_root),
            ledger,
            state: Mutex::new(GameState::default()),
        })
    }

    pub fn from_config(
        config: &GameConfig,
        ledger: Arc<dyn TokenLedger>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(config.to_params()?, ledger)?)
    }

    /// instance address: last 20 bytes of a domain-separated keccak over the
    /// deployment parameters and the deployment nonce
    ///
    /// the nonce is unique per `Game::new` in a process, so two games built
    /// from equal parameters never share an address or a custody account.
    pub fn derive_address(
        authority: &Address,
        token: &Address,
        root: &Hash,
        salt: u64,
        nonce: u64,
    ) -> Address {
        let mut hasher = Keccak256::new();
        hasher.update(INSTANCE_DOMAIN);
        hasher.update(authority.as_bytes());
        hasher.update(token.as_bytes());
        hasher.update(root);
        hasher.update(salt.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let hash: Hash = hasher.finalize().into();

        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Address(out)
    }

    // === entry ===

    /// direct entry by an authenticated `caller`
    pub fn enter(&self, caller: &Address, position: Position, proof: &[Hash]) -> Result<()> {
        require_whitelisted(&self.whitelist_root, caller, proof)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let phase = state.phase.phase();
        state.registry.assign(*caller, position, phase, &self.limits)?;

        info!(game = %self.address, participant = %caller, %position, "entered");
        Ok(())
    }

    /// entry submitted by `relayer`, authorized by the participant's signature
    ///
    /// returns the participant the position was assigned to
    pub fn gasless_enter(
        &self,
        relayer: &Address,
        position: Position,
        signature: &[u8],
        proof: &[Hash],
    ) -> Result<Address> {
        let identity = self.relay.authorize(&position, signature, proof).map_err(|e| {
            if e == Error::InvalidSignature {
                warn!(game = %self.address, %relayer, "relayed entry with invalid signature");
            }
            e
        })?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let phase = state.phase.phase();
        state.registry.assign(identity, position, phase, &self.limits)?;

        info!(
            game = %self.address,
            participant = %identity,
            %relayer,
            %position,
            "entered via relay"
        );
        Ok(identity)
    }

    // === resolution ===

    pub fn set_winning_position(&self, caller: &Address, circle: WinningCircle) -> Result<()> {
        if *caller != self.authority {
            warn!(game = %self.address, %caller, "non-authority tried to set the winning circle");
            return Err(Error::AuthorityRequired { caller: *caller });
        }

        let mut state = self.state.lock();
        state.phase.commit(circle, &self.limits)?;

        info!(
            game = %self.address,
            %circle,
            entrants = state.registry.len(),
            "winning circle committed"
        );
        Ok(())
    }

    /// pay every winner in `identities`; anyone may call
    ///
    /// all or nothing: custody is checked up front and the payouts go to the
    /// ledger as one batch. paid markers are recorded only once it commits.
    pub fn claim(&self, caller: &Address, identities: &[Address]) -> Result<ClaimReceipt> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let circle = *state.phase.require_resolved()?;

        let plan = ClaimResolver::new(&circle, &state.registry, self.payout_policy, &state.paid)
            .plan(identities);

        let needed = u128::try_from(plan.winners.len())
            .ok()
            .and_then(|n| n.checked_mul(self.payout_amount))
            .ok_or(LedgerError::Overflow)?;
        let available = self.ledger.balance_of(&self.address);
        if needed > available {
            return Err(Error::InsufficientCustody { needed, available });
        }

        let transfers: Vec<(Address, u128)> = plan
            .winners
            .iter()
            .map(|winner| (*winner, self.payout_amount))
            .collect();
        self.ledger.transfer_batch(&self.address, &transfers)?;

        if self.payout_policy == PayoutPolicy::OncePerWinner {
            state.paid.extend(plan.winners.iter().copied());
        }

        let receipt = ClaimReceipt {
            paid: transfers
                .into_iter()
                .map(|(winner, amount)| Payout { winner, amount })
                .collect(),
            skipped: plan.skipped,
        };

        for payout in &receipt.paid {
            debug!(game = %self.address, winner = %payout.winner, amount = payout.amount, "paid");
        }

        for skip in &receipt.skipped {
            debug!(game = %self.address, identity = %skip.identity, reason = ?skip.reason, "skipped");
        }

        info!(
            game = %self.address,
            %caller,
            requested = identities.len(),
            paid = receipt.paid.len(),
            total = receipt.total(),
            "claim processed"
        );
        Ok(receipt)
    }

    // === queries ===

    pub fn position_of(&self, identity: &Address) -> Option<Position> {
        self.state.lock().registry.position_of(identity)
    }

    pub fn is_position_unique(&self, position: &Position) -> bool {
        self.state.lock().registry.is_unique(position)
    }

    /// false until the circle is committed
    pub fn is_winner(&self, identity: &Address) -> bool {
        let state = self.state.lock();
        match (state.phase.circle(), state.registry.position_of(identity)) {
            (Some(circle), Some(position)) => is_inside(circle, &position),
            _ => false,
        }
    }

    pub fn current_winning_circle(&self) -> Option<WinningCircle> {
        self.state.lock().phase.circle().copied()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase.phase()
    }

    pub fn entrant_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// (participant, position) in entry order
    pub fn entries(&self) -> Vec<(Address, Position)> {
        self.state.lock().registry.entries().collect()
    }

    pub fn has_been_paid(&self, identity: &Address) -> bool {
        self.state.lock().paid.contains(identity)
    }

    pub fn custody_balance(&self) -> u128 {
        self.ledger.balance_of(&self.address)
    }

    /// digest a participant signs for a relayed entry into this game
    pub fn entry_digest(&self, position: &Position) -> Hash {
        entry_digest(position, &self.address)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// deployment nonce mixed into `address`
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn whitelist_root(&self) -> Hash {
        self.whitelist_root
    }

    pub fn payout_amount(&self) -> u128 {
        self.payout_amount
    }

    pub fn payout_policy(&self) -> PayoutPolicy {
        self.payout_policy
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }
}
