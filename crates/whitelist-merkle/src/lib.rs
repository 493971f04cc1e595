// src/lib.rs
//! Sorted-pair keccak merkle tree for whitelist membership
//!
//! Leaves are `keccak256(identity)`. Before the tree is built the leaves are
//! sorted and deduplicated, and every pair is sorted before it is hashed, so
//! the root depends only on the *set* of identities. An odd node at the end
//! of a layer is promoted to the next layer unchanged.
//!
//! Proofs are the sibling hashes from leaf to root. Because pairs are sorted
//! a proof carries no left/right flags; the verifier folds siblings in order.
//!
//! ```text
//!            root
//!          /      \
//!       h(ab)     h(cd)        each h(..) = keccak(min || max)
//!       /  \      /  \
//!      a    b    c    d        a..d = sorted keccak(identity)
//! ```

use sha3::{Digest, Keccak256};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub type Hash = [u8; 32];

pub const ZERO_HASH: Hash = [0u8; 32];

/// leaf sets at least this large are hashed on the rayon pool
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 64;

pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash an identity (for addresses: the 20 raw bytes) into a leaf
pub fn hash_leaf(identity: &[u8]) -> Hash {
    keccak256(identity)
}

/// Hash two siblings, smaller first
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

fn hash_leaves<I: AsRef<[u8]> + Sync>(identities: &[I]) -> Vec<Hash> {
    #[cfg(feature = "parallel")]
    {
        if identities.len() >= PARALLEL_THRESHOLD {
            return identities
                .par_iter()
                .map(|id| hash_leaf(id.as_ref()))
                .collect();
        }
    }
    identities.iter().map(|id| hash_leaf(id.as_ref())).collect()
}

fn next_layer(layer: &[Hash]) -> Vec<Hash> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => hash_pair(a, b),
            [single] => *single,
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Complete tree over a whitelist, every layer kept for proof generation
#[derive(Clone, Debug)]
pub struct WhitelistTree {
    /// layers[0] are the sorted leaves, the last layer holds the root
    layers: Vec<Vec<Hash>>,
}

impl WhitelistTree {
    /// Build from raw identities (order does not matter)
    pub fn new<I: AsRef<[u8]> + Sync>(identities: &[I]) -> Self {
        Self::from_leaves(hash_leaves(identities))
    }

    /// Build from pre-hashed leaves (order does not matter)
    pub fn from_leaves(mut leaves: Vec<Hash>) -> Self {
        if leaves.is_empty() {
            return Self { layers: vec![] };
        }

        leaves.sort_unstable();
        leaves.dedup();

        let mut layers = vec![leaves];
        while layers[layers.len() - 1].len() > 1 {
            let next = next_layer(&layers[layers.len() - 1]);
            layers.push(next);
        }

        Self { layers }
    }

    pub fn root(&self) -> Option<Hash> {
        self.layers.last().and_then(|layer| layer.first()).copied()
    }

    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Number of distinct leaves
    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, identity: &[u8]) -> bool {
        self.leaf_index(&hash_leaf(identity)).is_some()
    }

    fn leaf_index(&self, leaf: &Hash) -> Option<usize> {
        self.layers.first()?.binary_search(leaf).ok()
    }

    /// Sibling path for an identity, leaf to root
    ///
    /// Returns `None` when the identity is not in the tree. Levels where the
    /// node was promoted without a sibling contribute nothing, so the path can
    /// be shorter than `depth()`.
    pub fn proof(&self, identity: &[u8]) -> Option<Vec<Hash>> {
        self.proof_for_leaf(&hash_leaf(identity))
    }

    pub fn proof_for_leaf(&self, leaf: &Hash) -> Option<Vec<Hash>> {
        let mut index = self.leaf_index(leaf)?;
        let mut siblings = Vec::with_capacity(self.depth());

        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = index ^ 1;
            if sibling < layer.len() {
                siblings.push(layer[sibling]);
            }
            index /= 2;
        }

        Some(siblings)
    }

    pub fn membership_proof(&self, identity: &[u8]) -> Option<MembershipProof> {
        let leaf = hash_leaf(identity);
        let siblings = self.proof_for_leaf(&leaf)?;
        Some(MembershipProof { leaf, siblings })
    }
}

/// Root of the tree over `identities`, `None` for an empty list
pub fn build_root<I: AsRef<[u8]> + Sync>(identities: &[I]) -> Option<Hash> {
    WhitelistTree::new(identities).root()
}

/// Check that `identity` is committed to by `root`
///
/// Never panics: a wrong or malformed proof simply yields `false`. An empty
/// proof only succeeds when the identity's leaf is the root itself.
pub fn verify(root: &Hash, identity: &[u8], proof: &[Hash]) -> bool {
    verify_leaf(root, &hash_leaf(identity), proof)
}

pub fn verify_leaf(root: &Hash, leaf: &Hash, proof: &[Hash]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
    computed == *root
}

/// Leaf plus sibling path, as handed to a participant off-line
///
/// With the `serde` feature every hash is encoded as a `0x`-prefixed hex
/// string.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MembershipProof {
    #[cfg_attr(feature = "serde", serde(with = "hex_hash"))]
    pub leaf: Hash,
    #[cfg_attr(feature = "serde", serde(with = "hex_hash::seq"))]
    pub siblings: Vec<Hash>,
}

#[cfg(feature = "serde")]
mod hex_hash {
    use super::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    fn encode(hash: &Hash) -> String {
        format!("0x{}", hex::encode(hash))
    }

    fn decode<E: Error>(s: &str) -> Result<Hash, E> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out).map_err(E::custom)?;
        Ok(out)
    }

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s)
    }

    pub mod seq {
        use super::{decode, encode, Hash};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(hashes: &[Hash], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(hashes.iter().map(encode))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Hash>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|s| decode(s))
                .collect()
        }
    }
}

impl MembershipProof {
    pub fn verify(&self, root: &Hash) -> bool {
        verify_leaf(root, &self.leaf, &self.siblings)
    }

    /// Siblings as `0x`-prefixed hex, the format whitelist tooling exchanges
    pub fn siblings_hex(&self) -> Vec<String> {
        self.siblings
            .iter()
            .map(|h| format!("0x{}", hex::encode(h)))
            .collect()
    }
}
