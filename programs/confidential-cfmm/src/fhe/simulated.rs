//! In-process FHE backend for tests, the CLI and local simulation.
//!
//! Ciphertexts are opaque 32-byte handles. Plaintext words live only inside
//! the backend's tables, so code outside this module can neither read nor
//! forge them. Arithmetic wraps at 2^128 the way fixed-width ciphertext
//! arithmetic does.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use super::{Checkpoint, FheError, FheOps, FheResult, PublicDecrypt};
use crate::crypto::{seal, PublicKey, SealedValue};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle([u8; 32]);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_string();
        write!(f, "{}…", &s[..6.min(s.len())])
    }
}

/// Encrypted unsigned word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Euint(Handle);

/// Encrypted boolean.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ebool(Handle);

impl Euint {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl Ebool {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

/// Position in a [`SimulatedFhe`] handle sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedMark(u64);

/// Handle `i` is `sha256(domain ‖ i)`, so the handles minted after a mark can
/// be recomputed and dropped without a journal.
#[derive(Debug, Clone)]
pub struct SimulatedFhe {
    words: HashMap<Handle, u128>,
    bits: HashMap<Handle, bool>,
    counter: u64,
    domain: [u8; 32],
}

impl Default for SimulatedFhe {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFhe {
    pub fn new() -> Self {
        Self::with_domain(b"simulated-fhe")
    }

    /// Backends with different domains never produce colliding handles.
    pub fn with_domain(label: &[u8]) -> Self {
        Self {
            words: HashMap::new(),
            bits: HashMap::new(),
            counter: 0,
            domain: Sha256::digest(label).into(),
        }
    }

    /// Number of ciphertexts produced so far. Every operation mints exactly
    /// one, so this doubles as an operation counter.
    pub fn operation_count(&self) -> u64 {
        self.counter
    }

    /// Trusted-party decryption. Only tests and the local simulator call this;
    /// the pool engine has no path to it.
    pub fn decrypt(&self, value: &Euint) -> FheResult<u128> {
        self.word(value)
    }

    /// Ciphertexts currently held.
    pub fn live_handles(&self) -> usize {
        self.words.len() + self.bits.len()
    }

    fn handle_at(&self, index: u64) -> Handle {
        let mut h = Sha256::new();
        h.update(self.domain);
        h.update(index.to_le_bytes());
        Handle(h.finalize().into())
    }

    fn next_handle(&mut self) -> Handle {
        let handle = self.handle_at(self.counter);
        self.counter += 1;
        handle
    }

    fn word(&self, value: &Euint) -> FheResult<u128> {
        self.words
            .get(&value.0)
            .copied()
            .ok_or_else(|| FheError::UnknownHandle(value.0.to_string()))
    }

    fn bit(&self, value: &Ebool) -> FheResult<bool> {
        self.bits
            .get(&value.0)
            .copied()
            .ok_or_else(|| FheError::UnknownHandle(value.0.to_string()))
    }

    fn store_word(&mut self, value: u128) -> Euint {
        let handle = self.next_handle();
        self.words.insert(handle, value);
        Euint(handle)
    }

    fn store_bit(&mut self, value: bool) -> Ebool {
        let handle = self.next_handle();
        self.bits.insert(handle, value);
        Ebool(handle)
    }

    fn binary(
        &mut self,
        lhs: &Euint,
        rhs: &Euint,
        op: impl FnOnce(u128, u128) -> u128,
    ) -> FheResult<Euint> {
        let (a, b) = (self.word(lhs)?, self.word(rhs)?);
        Ok(self.store_word(op(a, b)))
    }

    fn compare(
        &mut self,
        lhs: &Euint,
        rhs: &Euint,
        op: impl FnOnce(u128, u128) -> bool,
    ) -> FheResult<Ebool> {
        let (a, b) = (self.word(lhs)?, self.word(rhs)?);
        Ok(self.store_bit(op(a, b)))
    }
}

impl FheOps for SimulatedFhe {
    type Cipher = Euint;
    type Bool = Ebool;

    fn encrypt(&mut self, value: u128) -> Euint {
        self.store_word(value)
    }

    fn add(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Euint> {
        self.binary(lhs, rhs, u128::wrapping_add)
    }

    fn sub(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Euint> {
        self.binary(lhs, rhs, u128::wrapping_sub)
    }

    fn mul(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Euint> {
        self.binary(lhs, rhs, u128::wrapping_mul)
    }

    fn mul_scalar(&mut self, lhs: &Euint, rhs: u128) -> FheResult<Euint> {
        let a = self.word(lhs)?;
        Ok(self.store_word(a.wrapping_mul(rhs)))
    }

    fn div_scalar(&mut self, lhs: &Euint, rhs: u128) -> FheResult<Euint> {
        if rhs == 0 {
            return Err(FheError::DivisionByZero);
        }
        let a = self.word(lhs)?;
        Ok(self.store_word(a / rhs))
    }

    fn ge(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Ebool> {
        self.compare(lhs, rhs, |a, b| a >= b)
    }

    fn le(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Ebool> {
        self.compare(lhs, rhs, |a, b| a <= b)
    }

    fn eq(&mut self, lhs: &Euint, rhs: &Euint) -> FheResult<Ebool> {
        self.compare(lhs, rhs, |a, b| a == b)
    }

    fn select(&mut self, cond: &Ebool, if_true: &Euint, if_false: &Euint) -> FheResult<Euint> {
        let c = self.bit(cond)?;
        let (t, f) = (self.word(if_true)?, self.word(if_false)?);
        Ok(self.store_word(if c { t } else { f }))
    }

    fn reencrypt(&self, value: &Euint, key: &PublicKey) -> FheResult<SealedValue> {
        let word = self.word(value)?;
        Ok(seal(key, word)?)
    }
}

impl Checkpoint for SimulatedFhe {
    type Mark = SimulatedMark;

    fn checkpoint(&self) -> SimulatedMark {
        SimulatedMark(self.counter)
    }

    fn rollback(&mut self, mark: SimulatedMark) {
        for index in mark.0..self.counter {
            let handle = self.handle_at(index);
            self.words.remove(&handle);
            self.bits.remove(&handle);
        }
        self.counter = self.counter.min(mark.0);
    }
}

impl PublicDecrypt for SimulatedFhe {
    fn decrypt_bool(&self, value: &Ebool) -> FheResult<bool> {
        self.bit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn handles_are_fresh_per_operation() {
        let mut fhe = SimulatedFhe::new();
        let a = fhe.encrypt(5);
        let b = fhe.encrypt(5);
        assert_ne!(a, b);
        assert_eq!(fhe.operation_count(), 2);
    }

    #[test]
    fn select_result_is_a_new_handle() {
        let mut fhe = SimulatedFhe::new();
        let (a, b) = (fhe.encrypt(1), fhe.encrypt(2));
        let yes = fhe.le(&a, &b).unwrap();
        let picked = fhe.select(&yes, &a, &b).unwrap();
        assert_ne!(picked, a);
        assert_eq!(fhe.decrypt(&picked).unwrap(), 1);
    }

    #[test]
    fn sub_wraps() {
        let mut fhe = SimulatedFhe::new();
        let (a, b) = (fhe.encrypt(1), fhe.encrypt(2));
        let d = fhe.sub(&a, &b).unwrap();
        assert_eq!(fhe.decrypt(&d).unwrap(), u128::MAX);
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let mut ours = SimulatedFhe::with_domain(b"ours");
        let mut theirs = SimulatedFhe::with_domain(b"theirs");
        let foreign = theirs.encrypt(9);
        let local = ours.encrypt(1);
        assert!(matches!(ours.add(&local, &foreign), Err(FheError::UnknownHandle(_))));
    }

    #[test]
    fn rolled_back_handle_is_unknown() {
        let mut fhe = SimulatedFhe::new();
        let early = fhe.encrypt(2);
        let mark = fhe.checkpoint();
        let late = fhe.encrypt(3);
        let sum = fhe.add(&early, &late).unwrap();
        let _ = fhe.le(&early, &sum).unwrap();

        fhe.rollback(mark);
        assert!(fhe.decrypt(&late).is_err());
        assert!(fhe.decrypt(&sum).is_err());
        assert_eq!(fhe.decrypt(&early).unwrap(), 2);
        assert_eq!(fhe.live_handles(), 1);
        assert_eq!(fhe.operation_count(), 1);
    }

    #[test]
    fn handles_after_rollback_do_not_collide_with_kept_ones() {
        let mut fhe = SimulatedFhe::new();
        let kept = fhe.encrypt(10);
        let mark = fhe.checkpoint();
        let dropped = fhe.encrypt(11);
        fhe.rollback(mark);
        let reused = fhe.encrypt(12);
        // the sequence resumes at the mark
        assert_eq!(reused, dropped);
        assert_ne!(reused, kept);
        assert_eq!(fhe.decrypt(&reused).unwrap(), 12);
    }

    #[test]
    fn div_scalar_by_zero_errors() {
        let mut fhe = SimulatedFhe::new();
        let a = fhe.encrypt(10);
        assert_eq!(fhe.div_scalar(&a, 0), Err(FheError::DivisionByZero));
    }

    #[test]
    fn reencrypt_opens_for_target_key() {
        let mut fhe = SimulatedFhe::new();
        let dana = Keypair::from_seed(b"dana");
        let v = fhe.encrypt(7025);
        let sealed = fhe.reencrypt(&v, &dana.public_key()).unwrap();
        assert_eq!(dana.open(&sealed).unwrap(), 7025);
    }
}
