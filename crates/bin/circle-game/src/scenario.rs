//! scripted game run over the in-memory ledger
//!
//! ```toml
//! authority = "0x..."
//! token = "0x..."
//! circle = { x = 50, y = 50, radius = 20 }
//!
//! [[participant]]
//! key = "0x01..."
//! x = 40
//! y = 40
//! gasless = true
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use circle_game::{
    build_tree, Address, ClaimReceipt, EntrySigner, Game, GameConfig, InMemoryLedger, Limits,
    PayoutPolicy, Position, WinningCircle,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

fn default_payout() -> u64 {
    200
}

fn default_decimals() -> u32 {
    18
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub authority: Address,
    pub token: Address,
    /// submits relayed entries and claims; defaults to the authority
    pub relayer: Option<Address>,
    #[serde(default)]
    pub salt: u64,
    #[serde(default = "default_payout")]
    pub payout: u64,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default)]
    pub payout_policy: PayoutPolicy,
    #[serde(default)]
    pub limits: Limits,
    /// whole tokens minted into custody, one payout per participant if unset
    pub fund: Option<u64>,
    #[serde(default, rename = "participant")]
    pub participants: Vec<Participant>,
    pub circle: WinningCircle,
    /// identities named in the claim, every participant if unset
    pub claim: Option<Vec<Address>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Participant {
    /// secp256k1 secret key, hex
    pub key: String,
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub gasless: bool,
    #[serde(default = "default_true")]
    pub whitelisted: bool,
}

#[derive(Debug, Serialize)]
pub struct EntryOutcome {
    pub participant: Address,
    pub position: Position,
    pub gasless: bool,
    /// rejection reason, `None` when the entry was accepted
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Balance {
    pub account: Address,
    pub amount: u128,
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub game: Address,
    pub whitelist_root: String,
    pub entries: Vec<EntryOutcome>,
    pub circle: WinningCircle,
    pub receipt: ClaimReceipt,
    pub balances: Vec<Balance>,
}

impl Scenario {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid scenario")
    }

    fn config(&self, whitelist: Vec<Address>) -> GameConfig {
        GameConfig {
            authority: Some(self.authority),
            token: self.token,
            whitelist_root: None,
            whitelist: Some(whitelist),
            salt: self.salt,
            payout: self.payout,
            decimals: self.decimals,
            payout_policy: self.payout_policy,
            limits: self.limits,
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let signers = self
            .participants
            .iter()
            .enumerate()
            .map(|(i, p)| {
                EntrySigner::from_hex(&p.key).with_context(|| format!("participant {i}: bad key"))
            })
            .collect::<Result<Vec<_>>>()?;

        let whitelist: Vec<Address> = self
            .participants
            .iter()
            .zip(&signers)
            .filter(|(p, _)| p.whitelisted)
            .map(|(_, s)| s.address())
            .collect();
        if whitelist.is_empty() {
            bail!("scenario needs at least one whitelisted participant");
        }
        let tree = build_tree(&whitelist);

        let config = self.config(whitelist);
        let ledger = Arc::new(InMemoryLedger::new(self.token));
        let game = Game::from_config(&config, ledger.clone())?;
        let relayer = self.relayer.unwrap_or(self.authority);

        let custody = match self.fund {
            Some(whole) => 10u128
                .checked_pow(self.decimals)
                .and_then(|scale| u128::from(whole).checked_mul(scale))
                .context("fund overflows u128")?,
            None => u128::try_from(signers.len())?
                .checked_mul(game.payout_amount())
                .context("fund overflows u128")?,
        };
        ledger.mint(&game.address(), custody)?;
        info!(game = %game.address(), custody, "custody funded");

        let mut entries = Vec::with_capacity(signers.len());
        for (participant, signer) in self.participants.iter().zip(&signers) {
            let identity = signer.address();
            let position = Position::new(participant.x, participant.y);
            let proof = tree.proof(identity.as_bytes()).unwrap_or_default();

            let result = if participant.gasless {
                let signature = signer.sign_entry(&position, &game.address())?;
                game.gasless_enter(&relayer, position, &signature, &proof).map(|_| ())
            } else {
                game.enter(&identity, position, &proof)
            };

            if let Err(e) = &result {
                warn!(participant = %identity, %position, error = %e, "entry rejected");
            }
            entries.push(EntryOutcome {
                participant: identity,
                position,
                gasless: participant.gasless,
                error: result.err().map(|e| e.to_string()),
            });
        }

        game.set_winning_position(&self.authority, self.circle)?;

        let claim = match &self.claim {
            Some(list) => list.clone(),
            None => signers.iter().map(EntrySigner::address).collect(),
        };
        let receipt = game.claim(&relayer, &claim)?;

        let balances = ledger
            .balances()
            .into_iter()
            .map(|(account, amount)| Balance { account, amount })
            .collect();

        Ok(Outcome {
            game: game.address(),
            whitelist_root: circle_game::format_hash(&game.whitelist_root()),
            entries,
            circle: self.circle,
            receipt,
            balances,
        })
    }
}
