//! secp256k1 signature recovery for delegated entries
//!
//! signatures are 65 bytes `r || s || v` with `v` in {0, 1, 27, 28}. high-s
//! encodings are rejected so a signature has exactly one accepted form.
//!
//! the signed digest is the personal-message envelope over
//! `keccak256(x_be32 || y_be32 || instance)`, which binds both coordinates and
//! the game instance.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use whitelist_merkle::keccak256;

use crate::error::{Error, Result};
use crate::types::{Address, Hash, Position};

pub const SIGNATURE_LEN: usize = 65;

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// address of a public key: last 20 bytes of keccak(uncompressed point)
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

/// personal-message envelope over a 32-byte hash
pub fn personal_message_hash(inner: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX);
    hasher.update(inner);
    hasher.finalize().into()
}

/// digest a participant signs to authorize `position` in game `instance`
pub fn entry_digest(position: &Position, instance: &Address) -> Hash {
    let mut payload = [0u8; 84];
    payload[28..32].copy_from_slice(&position.x.to_be_bytes());
    payload[60..64].copy_from_slice(&position.y.to_be_bytes());
    payload[64..].copy_from_slice(instance.as_bytes());
    personal_message_hash(&keccak256(&payload))
}

/// recover the signer of `digest`
///
/// fails closed with `InvalidSignature` on wrong length, unknown `v`,
/// out-of-range scalars, high `s`, or a point that does not recover.
pub fn recover(digest: &Hash, signature: &[u8]) -> Result<Address> {
    let bytes: &[u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| Error::InvalidSignature)?;

    let v = match bytes[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(Error::InvalidSignature),
    };

    let sig = Signature::from_slice(&bytes[..64]).map_err(|_| Error::InvalidSignature)?;
    // normalize_s returns a new signature only when s was in the high half
    if sig.normalize_s().is_some() {
        return Err(Error::InvalidSignature);
    }

    let recid = RecoveryId::from_byte(v).ok_or(Error::InvalidSignature)?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| Error::InvalidSignature)?;

    Ok(address_of(&key))
}

/// participant-side signer for gasless entries
pub struct EntrySigner {
    key: SigningKey,
    address: Address,
}

impl EntrySigner {
    /// from a 32-byte secret scalar
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(secret).map_err(|_| Error::InvalidSigningKey)?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    /// from hex, 0x prefix optional
    pub fn from_hex(secret: &str) -> Result<Self> {
        let digits = secret.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let bytes = hex::decode(digits).map_err(|_| Error::InvalidSigningKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// sign a prehashed digest, low-s with `v` in {27, 28}
    pub fn sign_digest(&self, digest: &Hash) -> Result<[u8; SIGNATURE_LEN]> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|_| Error::InvalidSignature)?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(out)
    }

    pub fn sign_entry(&self, position: &Position, instance: &Address) -> Result<[u8; SIGNATURE_LEN]> {
        self.sign_digest(&entry_digest(position, instance))
    }
}
