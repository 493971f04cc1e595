//! claim resolution
//!
//! eligibility is an exact integer test: `dx^2 + dy^2 <= r^2` in u128, so
//! the boundary is inclusive and no input can overflow.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::registry::PositionRegistry;
use crate::types::{Address, Position, WinningCircle};

/// whether a winner can be paid by more than one claim
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayoutPolicy {
    /// a paid marker is recorded; later claims skip the winner
    #[default]
    OncePerWinner,
    /// every claim that names a winner pays again
    EveryClaim,
}

pub fn distance_squared(a: &Position, b: &Position) -> u128 {
    let dx = u128::from(a.x.abs_diff(b.x));
    let dy = u128::from(a.y.abs_diff(b.y));
    dx * dx + dy * dy
}

pub fn is_inside(circle: &WinningCircle, position: &Position) -> bool {
    let r = u128::from(circle.radius);
    distance_squared(&circle.center(), position) <= r * r
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NotEntered,
    OutsideCircle,
    AlreadyPaid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub winner: Address,
    pub amount: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub identity: Address,
    pub reason: SkipReason,
}

/// outcome of one claim batch, in input order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub paid: Vec<Payout>,
    pub skipped: Vec<Skipped>,
}

impl ClaimReceipt {
    pub fn total(&self) -> u128 {
        self.paid.iter().map(|p| p.amount).sum()
    }

    pub fn paid_to(&self, winner: &Address) -> u128 {
        self.paid
            .iter()
            .filter(|p| p.winner == *winner)
            .map(|p| p.amount)
            .sum()
    }
}

/// winners to pay and identities to skip, before any transfer happens
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimPlan {
    pub winners: Vec<Address>,
    pub skipped: Vec<Skipped>,
}

/// decides who gets paid for a batch
pub struct ClaimResolver<'a> {
    circle: &'a WinningCircle,
    registry: &'a PositionRegistry,
    policy: PayoutPolicy,
    paid: &'a HashSet<Address>,
}

impl<'a> ClaimResolver<'a> {
    pub fn new(
        circle: &'a WinningCircle,
        registry: &'a PositionRegistry,
        policy: PayoutPolicy,
        paid: &'a HashSet<Address>,
    ) -> Self {
        Self { circle, registry, policy, paid }
    }

    pub fn is_winner(&self, identity: &Address) -> bool {
        self.registry
            .position_of(identity)
            .is_some_and(|pos| is_inside(self.circle, &pos))
    }

    fn already_paid(&self, identity: &Address, in_batch: &mut HashSet<Address>) -> bool {
        match self.policy {
            PayoutPolicy::EveryClaim => false,
            PayoutPolicy::OncePerWinner => {
                self.paid.contains(identity) || !in_batch.insert(*identity)
            }
        }
    }

    /// walk the batch in order; nothing here can fail
    pub fn plan(&self, identities: &[Address]) -> ClaimPlan {
        let mut plan = ClaimPlan::default();
        let mut in_batch = HashSet::new();

        for identity in identities {
            let reason = match self.registry.position_of(identity) {
                None => Some(SkipReason::NotEntered),
                Some(pos) if !is_inside(self.circle, &pos) => Some(SkipReason::OutsideCircle),
                Some(_) => self
                    .already_paid(identity, &mut in_batch)
                    .then_some(SkipReason::AlreadyPaid),
            };

            match reason {
                Some(reason) => plan.skipped.push(Skipped { identity: *identity, reason }),
                None => plan.winners.push(*identity),
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Limits, Phase};
    use proptest::prelude::*;

    const A: Address = Address([0xa; 20]);
    const B: Address = Address([0xb; 20]);
    const C: Address = Address([0xc; 20]);

    fn registry(entries: &[(Address, u32, u32)]) -> PositionRegistry {
        let mut reg = PositionRegistry::new();
        for (id, x, y) in entries {
            reg.assign(*id, Position::new(*x, *y), Phase::Entry, &Limits::default()).unwrap();
        }
        reg
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // 3-4-5 triangle: exactly on the rim
        let circle = WinningCircle::new(50, 50, 5);
        assert!(is_inside(&circle, &Position::new(53, 54)));
        assert!(is_inside(&circle, &Position::new(47, 46)));
        assert!(is_inside(&circle, &Position::new(55, 50)));
        // one unit beyond
        assert!(!is_inside(&circle, &Position::new(56, 50)));
        assert!(!is_inside(&circle, &Position::new(53, 55)));
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let circle = WinningCircle::new(1, 1, u32::MAX);
        assert!(is_inside(&circle, &Position::new(u32::MAX, 1)));
        assert!(!is_inside(&circle, &Position::new(u32::MAX, u32::MAX)));
        assert_eq!(
            distance_squared(&Position::new(0, 0), &Position::new(u32::MAX, u32::MAX)),
            2 * u128::from(u32::MAX) * u128::from(u32::MAX)
        );
    }

    #[test]
    fn test_plan_skips_without_failing() {
        let reg = registry(&[(A, 40, 40), (B, 80, 80)]);
        let circle = WinningCircle::new(50, 50, 20);
        let paid = HashSet::new();
        let resolver = ClaimResolver::new(&circle, &reg, PayoutPolicy::OncePerWinner, &paid);

        let plan = resolver.plan(&[A, B, C]);
        assert_eq!(plan.winners, vec![A]);
        assert_eq!(
            plan.skipped,
            vec![
                Skipped { identity: B, reason: SkipReason::OutsideCircle },
                Skipped { identity: C, reason: SkipReason::NotEntered },
            ]
        );
        assert!(resolver.plan(&[]).winners.is_empty());
    }

    #[test]
    fn test_once_per_winner_skips_paid_and_repeats() {
        let reg = registry(&[(A, 50, 50)]);
        let circle = WinningCircle::new(50, 50, 1);

        let paid = HashSet::new();
        let resolver = ClaimResolver::new(&circle, &reg, PayoutPolicy::OncePerWinner, &paid);
        let plan = resolver.plan(&[A, A]);
        assert_eq!(plan.winners, vec![A]);
        assert_eq!(plan.skipped, vec![Skipped { identity: A, reason: SkipReason::AlreadyPaid }]);

        let paid: HashSet<Address> = [A].into_iter().collect();
        let resolver = ClaimResolver::new(&circle, &reg, PayoutPolicy::OncePerWinner, &paid);
        assert!(resolver.plan(&[A]).winners.is_empty());
    }

    #[test]
    fn test_every_claim_pays_each_mention() {
        let reg = registry(&[(A, 50, 50)]);
        let circle = WinningCircle::new(50, 50, 1);
        let paid: HashSet<Address> = [A].into_iter().collect();
        let resolver = ClaimResolver::new(&circle, &reg, PayoutPolicy::EveryClaim, &paid);

        assert_eq!(resolver.plan(&[A, A]).winners, vec![A, A]);
    }

    #[test]
    fn test_policy_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: PayoutPolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"every-claim\"").unwrap();
        assert_eq!(w.policy, PayoutPolicy::EveryClaim);
        let w: Wrapper = toml::from_str("policy = \"once-per-winner\"").unwrap();
        assert_eq!(w.policy, PayoutPolicy::OncePerWinner);
    }

    proptest! {
        #[test]
        fn prop_inside_matches_wide_arithmetic(
            cx in 1u32..=100_000, cy in 1u32..=100_000, r in 1u32..=100_000,
            x in 1u32..=100_000, y in 1u32..=100_000,
        ) {
            let circle = WinningCircle::new(cx, cy, r);
            let dx = i128::from(x) - i128::from(cx);
            let dy = i128::from(y) - i128::from(cy);
            let expected = dx * dx + dy * dy <= i128::from(r) * i128::from(r);
            prop_assert_eq!(is_inside(&circle, &Position::new(x, y)), expected);
        }

        #[test]
        fn prop_rim_point_on_axis_wins_and_next_loses(c in 2u32..50_000, r in 1u32..1_000) {
            let circle = WinningCircle::new(c, c, r);
            prop_assert!(is_inside(&circle, &Position::new(c + r, c)));
            prop_assert!(!is_inside(&circle, &Position::new(c + r + 1, c)));
        }
    }
}
