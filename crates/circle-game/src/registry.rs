//! position registry
//!
//! one position per participant, one participant per position. positions are
//! never removed, so uniqueness holds against every position ever assigned.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{Address, Limits, Phase, Position};

#[derive(Clone, Debug, Default)]
pub struct PositionRegistry {
    by_identity: HashMap<Address, Position>,
    by_position: HashMap<Position, Address>,
    /// entrants in the order they were accepted
    order: Vec<Address>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// record `identity -> position`
    ///
    /// checks run before anything is written: phase, existing entry, bounds,
    /// then coordinate uniqueness.
    pub fn assign(
        &mut self,
        identity: Address,
        position: Position,
        phase: Phase,
        limits: &Limits,
    ) -> Result<()> {
        if phase != Phase::Entry {
            return Err(Error::WrongPhase {
                expected: Phase::Entry,
                actual: phase,
            });
        }
        if self.by_identity.contains_key(&identity) {
            return Err(Error::PositionAlreadySet(identity));
        }
        limits.check_position(&position)?;
        if !self.is_unique(&position) {
            return Err(Error::PositionNotUnique {
                x: position.x,
                y: position.y,
            });
        }

        self.by_identity.insert(identity, position);
        self.by_position.insert(position, identity);
        self.order.push(identity);
        Ok(())
    }

    pub fn is_unique(&self, position: &Position) -> bool {
        !self.by_position.contains_key(position)
    }

    pub fn position_of(&self, identity: &Address) -> Option<Position> {
        self.by_identity.get(identity).copied()
    }

    pub fn occupant(&self, position: &Position) -> Option<Address> {
        self.by_position.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// (identity, position) in entry order
    pub fn entries(&self) -> impl Iterator<Item = (Address, Position)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.by_identity.get(id).map(|pos| (*id, *pos)))
    }
}
