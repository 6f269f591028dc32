//! Encrypted arithmetic capability.
//!
//! Every pool computation on reserves, shares and fees goes through
//! [`FheOps`]. Conditionals are expressed with [`FheOps::select`] only; the
//! engine never learns the value behind a `Bool`, so its control flow and its
//! external call pattern cannot depend on one.

use std::fmt;

use crate::crypto::{CryptoError, PublicKey, SealedValue};

pub mod oblivious;
pub mod simulated;

pub use simulated::{SimulatedFhe, SimulatedMark};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FheError {
    /// The handle was not produced by this backend (or was rolled back).
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(String),

    #[error("division by a zero plaintext divisor")]
    DivisionByZero,

    #[error("re-encryption failed: {0}")]
    Crypto(#[from] CryptoError),
}

pub type FheResult<T> = std::result::Result<T, FheError>;

/// Homomorphic operations over 128-bit encrypted words.
///
/// `sub` wraps on underflow like the underlying ciphertext arithmetic; use
/// [`oblivious::clamp_sub`] wherever an underflow could depend on a secret.
pub trait FheOps {
    type Cipher: Clone + fmt::Debug;
    type Bool: Clone + fmt::Debug;

    /// Encrypt a client input or lift a public constant.
    fn encrypt(&mut self, value: u128) -> Self::Cipher;

    fn add(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Cipher>;
    fn sub(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Cipher>;
    fn mul(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Cipher>;
    fn mul_scalar(&mut self, lhs: &Self::Cipher, rhs: u128) -> FheResult<Self::Cipher>;
    /// Floor division by a public divisor.
    fn div_scalar(&mut self, lhs: &Self::Cipher, rhs: u128) -> FheResult<Self::Cipher>;

    fn ge(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Bool>;
    fn le(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Bool>;
    fn eq(&mut self, lhs: &Self::Cipher, rhs: &Self::Cipher) -> FheResult<Self::Bool>;

    /// Oblivious conditional: the returned ciphertext does not reveal which
    /// branch was taken.
    fn select(
        &mut self,
        cond: &Self::Bool,
        if_true: &Self::Cipher,
        if_false: &Self::Cipher,
    ) -> FheResult<Self::Cipher>;

    /// Re-encrypt `value` so that only the holder of `key` can read it.
    fn reencrypt(&self, value: &Self::Cipher, key: &PublicKey) -> FheResult<SealedValue>;
}

/// Undo support for atomic calls.
///
/// A mark taken before a call lets the caller drop every ciphertext the call
/// produced, at a cost proportional to the call rather than to the backend's
/// history.
pub trait Checkpoint {
    type Mark: Copy;

    fn checkpoint(&self) -> Self::Mark;
    /// Forget every ciphertext produced since `mark`.
    fn rollback(&mut self, mark: Self::Mark);
}

/// Public decryption of a boolean.
///
/// Reserved for collaborator tokens, whose allowance and balance checks
/// concern the caller's own pre-existing funds and fail publicly. The pool
/// engine is written against [`FheOps`] alone.
pub trait PublicDecrypt: FheOps {
    fn decrypt_bool(&self, value: &Self::Bool) -> FheResult<bool>;
}
