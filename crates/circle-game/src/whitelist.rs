//! address whitelist over `whitelist-merkle`
//!
//! leaves are keccak256 of the 20 raw address bytes.

use whitelist_merkle::WhitelistTree;

use crate::error::{Error, Result};
use crate::types::{Address, Hash};

/// tree over a list of addresses (order does not matter)
pub fn build_tree(addresses: &[Address]) -> WhitelistTree {
    WhitelistTree::new(addresses)
}

pub fn is_whitelisted(root: &Hash, identity: &Address, proof: &[Hash]) -> bool {
    whitelist_merkle::verify(root, identity.as_bytes(), proof)
}

pub fn require_whitelisted(root: &Hash, identity: &Address, proof: &[Hash]) -> Result<()> {
    if is_whitelisted(root, identity, proof) {
        Ok(())
    } else {
        Err(Error::NotWhitelisted(*identity))
    }
}
