//! gasless entry relay
//!
//! whoever submits a relayed entry pays for it; the participant authorizes it
//! by signing the entry digest. the submitter plays no part in authorization.

use tracing::debug;

use crate::error::Result;
use crate::registry::PositionRegistry;
use crate::signature::{entry_digest, recover};
use crate::types::{Address, Hash, Limits, Phase, Position};
use crate::whitelist::require_whitelisted;

/// validates delegated entries for one game instance
#[derive(Clone, Copy, Debug)]
pub struct EntryRelay {
    instance: Address,
    root: Hash,
}

impl EntryRelay {
    pub fn new(instance: Address, root: Hash) -> Self {
        Self { instance, root }
    }

    /// recover the signer and check whitelist membership
    pub fn authorize(&self, position: &Position, signature: &[u8], proof: &[Hash]) -> Result<Address> {
        let digest = entry_digest(position, &self.instance);
        let identity = recover(&digest, signature)?;
        require_whitelisted(&self.root, &identity, proof)?;
        debug!(%identity, %position, "relayed entry authorized");
        Ok(identity)
    }

    /// authorize, then assign; inherits every registry failure
    pub fn relay_entry(
        &self,
        registry: &mut PositionRegistry,
        phase: Phase,
        limits: &Limits,
        position: Position,
        signature: &[u8],
        proof: &[Hash],
    ) -> Result<Address> {
        let identity = self.authorize(&position, signature, proof)?;
        registry.assign(identity, position, phase, limits)?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::signature::EntrySigner;
    use crate::whitelist::build_tree;

    const INSTANCE: Address = Address([0x77; 20]);

    struct Fixture {
        alice: EntrySigner,
        mallory: EntrySigner,
        relay: EntryRelay,
        alice_proof: Vec<Hash>,
    }

    fn fixture() -> Fixture {
        let alice = EntrySigner::from_bytes(&[1; 32]).unwrap();
        let bob = EntrySigner::from_bytes(&[2; 32]).unwrap();
        let mallory = EntrySigner::from_bytes(&[3; 32]).unwrap();

        let tree = build_tree(&[alice.address(), bob.address()]);
        let alice_proof = tree.proof(alice.address().as_bytes()).unwrap();
        let relay = EntryRelay::new(INSTANCE, tree.root().unwrap());

        Fixture { alice, mallory, relay, alice_proof }
    }

    #[test]
    fn test_relay_assigns_signer() {
        let f = fixture();
        let mut reg = PositionRegistry::new();
        let pos = Position::new(40, 40);
        let sig = f.alice.sign_entry(&pos, &INSTANCE).unwrap();

        let who = f
            .relay
            .relay_entry(&mut reg, Phase::Entry, &Limits::default(), pos, &sig, &f.alice_proof)
            .unwrap();

        assert_eq!(who, f.alice.address());
        assert_eq!(reg.position_of(&who), Some(pos));
    }

    #[test]
    fn test_non_member_rejected() {
        let f = fixture();
        let pos = Position::new(5, 5);
        let sig = f.mallory.sign_entry(&pos, &INSTANCE).unwrap();

        assert_eq!(
            f.relay.authorize(&pos, &sig, &f.alice_proof),
            Err(Error::NotWhitelisted(f.mallory.address()))
        );
    }

    #[test]
    fn test_signature_for_other_position_rejected() {
        let f = fixture();
        let sig = f.alice.sign_entry(&Position::new(5, 5), &INSTANCE).unwrap();

        // recovers to an unrelated address, which is not on the whitelist
        let result = f.relay.authorize(&Position::new(5, 6), &sig, &f.alice_proof);
        assert!(matches!(result, Err(Error::NotWhitelisted(_)) | Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_signature_for_other_instance_rejected() {
        let f = fixture();
        let pos = Position::new(5, 5);
        let sig = f.alice.sign_entry(&pos, &Address([0x78; 20])).unwrap();

        let result = f.relay.authorize(&pos, &sig, &f.alice_proof);
        assert!(matches!(result, Err(Error::NotWhitelisted(_)) | Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_garbage_signature() {
        let f = fixture();
        let result = f.relay.authorize(&Position::new(1, 1), &[0u8; 12], &f.alice_proof);
        assert_eq!(result, Err(Error::InvalidSignature));
    }

    #[test]
    fn test_registry_errors_propagate() {
        let f = fixture();
        let mut reg = PositionRegistry::new();
        let pos = Position::new(0, 0);
        let sig = f.alice.sign_entry(&pos, &INSTANCE).unwrap();

        let result =
            f.relay.relay_entry(&mut reg, Phase::Entry, &Limits::default(), pos, &sig, &f.alice_proof);
        assert_eq!(result, Err(Error::ZeroCoordinate));
        assert!(reg.is_empty());
    }
}
