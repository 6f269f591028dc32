//! Account keys, reveal signatures and sealed outputs.
//!
//! Accounts sign with ed25519; an account's [`Address`] is its verifying key,
//! so any address can check signatures made by its owner. Contract addresses
//! (pool, tokens) are seed-derived hashes and never sign.
//!
//! Reveal keys are X25519. Sealing is ephemeral Diffie–Hellman, HKDF-SHA256,
//! then AES-256-GCM. Layout of a [`SealedValue`]:
//! ```text
//! ephemeral(32)  nonce(12)  ciphertext+tag(n + 16)
//! ```

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

// ─── Constants ────────────────────────────────────────────────────────────────

const SEAL_INFO: &[u8] = b"confidential-cfmm/seal-x25519-v1";

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Low-order reveal key: the exchange would not depend on our secret.
    #[error("reveal key is not a usable X25519 public key")]
    InvalidPublicKey,

    #[error("sealing failed")]
    Seal,

    /// Wrong key, tampered payload, or a payload that is not a sealed word.
    #[error("sealed value could not be opened")]
    Open,
}

// ─── Address ──────────────────────────────────────────────────────────────────

/// 32-byte account or contract identifier, displayed in base-58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Derive a contract address from seeds, the way a program-derived
    /// address is built from its seed list.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut h = Sha256::new();
        for seed in seeds {
            h.update(seed);
        }
        Address(h.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_string();
        write!(f, "Address({}…{})", &s[..4], &s[s.len() - 4..])
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let bytes = bs58::decode(&s)
            .into_vec()
            .map_err(|e| format!("invalid base-58 address '{s}': {e}"))?;
        let b: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| format!("address must be 32 bytes, got {}", v.len()))?;
        Ok(Address(b))
    }
}

impl From<VerifyingKey> for Address {
    fn from(key: VerifyingKey) -> Self {
        Address(key.to_bytes())
    }
}

impl Address {
    /// Check an ed25519 signature made by this account. Contract addresses
    /// and non-curve bytes never verify.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        key.verify_strict(message, &signature.0).is_ok()
    }
}

// ─── Keys ─────────────────────────────────────────────────────────────────────

/// X25519 reveal key: the target a value is re-encrypted to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", bs58::encode(self.0).into_string())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub ed25519_dalek::Signature);

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &bs58::encode(self.to_bytes()).into_string()[..8])
    }
}

/// An account: an ed25519 signing key plus the X25519 key its reveals are
/// sealed to by default.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
    reveal: StaticSecret,
}

impl Keypair {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing: SigningKey::generate(&mut rng),
            reveal: StaticSecret::random_from_rng(&mut rng),
        }
    }

    /// Deterministic keypair from arbitrary seed bytes (scenario files,
    /// fixtures). Not for production keys.
    pub fn from_seed(seed: &[u8]) -> Self {
        let digest = Sha512::digest(seed);
        let mut signing = [0u8; 32];
        let mut reveal = [0u8; 32];
        signing.copy_from_slice(&digest[..32]);
        reveal.copy_from_slice(&digest[32..]);
        Self {
            signing: SigningKey::from_bytes(&signing),
            reveal: StaticSecret::from(reveal),
        }
    }

    /// Reveal key for values sealed to this account.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(X25519PublicKey::from(&self.reveal).to_bytes())
    }

    pub fn address(&self) -> Address {
        Address::from(self.signing.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing.sign(message))
    }

    /// Open a value sealed to this keypair's reveal key.
    pub fn open(&self, sealed: &SealedValue) -> Result<u128, CryptoError> {
        let shared = self.reveal.diffie_hellman(&X25519PublicKey::from(sealed.ephemeral));
        let cipher = seal_cipher(shared.as_bytes()).map_err(|_| CryptoError::Open)?;
        let plain = cipher
            .decrypt((&sealed.nonce).into(), sealed.ciphertext.as_slice())
            .map_err(|_| CryptoError::Open)?;
        let word: [u8; 16] = plain.try_into().map_err(|_| CryptoError::Open)?;
        Ok(u128::from_le_bytes(word))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("address", &self.address()).finish_non_exhaustive()
    }
}

// ─── Sealing ──────────────────────────────────────────────────────────────────

/// A 128-bit word encrypted to one reveal key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub ephemeral: [u8; 32],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Serialized layout, see the module docs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(44 + self.ciphertext.len());
        out.extend_from_slice(&self.ephemeral);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

impl fmt::Debug for SealedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedValue({} bytes)", 44 + self.ciphertext.len())
    }
}

/// Encrypt `word` so that only the holder of `recipient`'s secret can read it.
pub fn seal(recipient: &PublicKey, word: u128) -> Result<SealedValue, CryptoError> {
    let recipient = X25519PublicKey::from(recipient.0);
    let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_public = X25519PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }
    let cipher = seal_cipher(shared.as_bytes())?;

    let mut nonce = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), &word.to_le_bytes()[..])
        .map_err(|_| CryptoError::Seal)?;

    Ok(SealedValue { ephemeral: ephemeral_public.to_bytes(), nonce, ciphertext })
}

fn seal_cipher(shared: &[u8; 32]) -> Result<Aes256Gcm, CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared);
    let mut okm = [0u8; 32];
    hk.expand(SEAL_INFO, &mut okm).map_err(|_| CryptoError::Seal)?;
    Aes256Gcm::new_from_slice(&okm).map_err(|_| CryptoError::Seal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_only_for_signer_and_message() {
        let alice = Keypair::from_seed(b"alice");
        let bob = Keypair::from_seed(b"bob");
        let sig = alice.sign(b"reveal");

        assert!(alice.address().verify(b"reveal", &sig));
        assert!(!alice.address().verify(b"revea1", &sig));
        assert!(!bob.address().verify(b"reveal", &sig));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let alice = Keypair::from_seed(b"alice");
        let mut bytes = alice.sign(b"reveal").to_bytes();
        bytes[40] ^= 1;
        let sig = Signature(ed25519_dalek::Signature::from_bytes(&bytes));
        assert!(!alice.address().verify(b"reveal", &sig));
    }

    #[test]
    fn contract_address_never_verifies() {
        let pool = Address::derive(&[b"pool", b"x"]);
        let alice = Keypair::from_seed(b"alice");
        let sig = alice.sign(b"m");
        assert!(!pool.verify(b"m", &sig));
    }

    #[test]
    fn sealed_value_opens_with_matching_key_only() {
        let carol = Keypair::from_seed(b"carol");
        let mallory = Keypair::from_seed(b"mallory");
        let sealed = seal(&carol.public_key(), 895).unwrap();

        assert_eq!(carol.open(&sealed).unwrap(), 895);
        assert_eq!(mallory.open(&sealed), Err(CryptoError::Open));
    }

    #[test]
    fn seal_rejects_low_order_key() {
        let identity = PublicKey([0; 32]);
        assert_eq!(seal(&identity, 1), Err(CryptoError::InvalidPublicKey));
    }

    #[test]
    fn seeded_keypairs_are_deterministic() {
        let a = Keypair::from_seed(b"erin");
        let b = Keypair::from_seed(b"erin");
        assert_eq!(a.address(), b.address());
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.address().0, a.public_key().0);
    }

    #[test]
    fn address_base58_round_trips_through_serde_string() {
        let a = Keypair::from_seed(b"dana").address();
        let s: String = a.into();
        assert_eq!(Address::try_from(s).unwrap(), a);
        assert!(Address::try_from("not-base58-0OIl".to_string()).is_err());
    }
}
