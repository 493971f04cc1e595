//! token ledger seam
//!
//! the game never owns token balances itself. it commands a ledger to move
//! the payout unit out of its custody account (the game's own address).
//!
//! implementations:
//! - [`InMemoryLedger`]: hashmap-backed, for tests, simulation and dev setups

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{account} holds {balance}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        balance: u128,
        needed: u128,
    },

    #[error("balance overflow")]
    Overflow,

    #[error("ledger backend: {0}")]
    Backend(String),
}

/// fungible token ledger capability
pub trait TokenLedger: Send + Sync {
    /// token this ledger moves
    fn token(&self) -> Address;

    fn balance_of(&self, account: &Address) -> u128;

    /// move `amount` from `from` to `to`, all or nothing
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError>;

    /// apply every `(to, amount)` debit from `from` in order, or none of them
    fn transfer_batch(&self, from: &Address, transfers: &[(Address, u128)]) -> Result<(), LedgerError>;
}

/// in-memory ledger for a single token
pub struct InMemoryLedger {
    token: Address,
    balances: RwLock<HashMap<Address, u128>>,
}

impl InMemoryLedger {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            balances: RwLock::new(HashMap::new()),
        }
    }

    pub fn mint(&self, to: &Address, amount: u128) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        let balance = balances.entry(*to).or_default();
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// non-zero balances sorted by address
    pub fn balances(&self) -> Vec<(Address, u128)> {
        let mut out: Vec<_> = self
            .balances
            .read()
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(addr, amount)| (*addr, *amount))
            .collect();
        out.sort_unstable();
        out
    }
}

impl TokenLedger for InMemoryLedger {
    fn token(&self) -> Address {
        self.token
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.read().get(account).copied().unwrap_or(0)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        self.transfer_batch(from, &[(*to, amount)])
    }

    fn transfer_batch(&self, from: &Address, transfers: &[(Address, u128)]) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();

        // stage every balance first, write only once the whole batch fits
        let mut staged: HashMap<Address, u128> = HashMap::new();
        let current = |staged: &HashMap<Address, u128>, account: &Address| {
            staged
                .get(account)
                .or_else(|| balances.get(account))
                .copied()
                .unwrap_or(0)
        };

        for (to, amount) in transfers {
            let balance = current(&staged, from);
            let debited = balance
                .checked_sub(*amount)
                .ok_or(LedgerError::InsufficientBalance {
                    account: *from,
                    balance,
                    needed: *amount,
                })?;
            staged.insert(*from, debited);

            let credited = current(&staged, to)
                .checked_add(*amount)
                .ok_or(LedgerError::Overflow)?;
            staged.insert(*to, credited);
        }

        balances.extend(staged);
        Ok(())
    }
}
