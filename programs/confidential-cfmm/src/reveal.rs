//! Authenticated reveal requests.
//!
//! A caller proves control of its account by signing
//! ```text
//! REVEAL_DOMAIN ‖ contract(32) ‖ caller(32) ‖ reveal_key(32)
//! ```
//! with the account key. The verifying contract is part of the message, so a
//! signature made for the pool cannot be replayed against a token and vice
//! versa.

use serde::{Deserialize, Serialize};

use crate::constants::REVEAL_DOMAIN;
use crate::crypto::{Address, Keypair, PublicKey, Signature};

/// Transient, per-call proof that `caller` wants a value re-encrypted to
/// `public_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub caller: Address,
    pub public_key: PublicKey,
    pub signature: Signature,
}

pub fn reveal_message(contract: &Address, caller: &Address, public_key: &PublicKey) -> Vec<u8> {
    let mut msg = Vec::with_capacity(REVEAL_DOMAIN.len() + 96);
    msg.extend_from_slice(REVEAL_DOMAIN);
    msg.extend_from_slice(contract.as_bytes());
    msg.extend_from_slice(caller.as_bytes());
    msg.extend_from_slice(&public_key.0);
    msg
}

impl RevealRequest {
    /// Build a request for `contract` signed by `account`.
    pub fn sign(account: &Keypair, contract: &Address, public_key: PublicKey) -> Self {
        let caller = account.address();
        let signature = account.sign(&reveal_message(contract, &caller, &public_key));
        Self { caller, public_key, signature }
    }

    /// True when the signature was made by `caller`'s key for `contract`.
    pub fn verify(&self, contract: &Address) -> bool {
        let msg = reveal_message(contract, &self.caller, &self.public_key);
        self.caller.verify(&msg, &self.signature)
    }
}
