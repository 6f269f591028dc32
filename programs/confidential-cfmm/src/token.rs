//! Confidential token collaborators.
//!
//! The pool talks to its two tokens only through [`ConfidentialToken`].
//! [`LocalToken`] is an in-process implementation used by the runtime, the
//! CLI and the tests.

use std::collections::BTreeMap;

use crate::constants::TOKEN_SEED;
use crate::crypto::{seal, Address, SealedValue};
use crate::fhe::{FheError, FheOps, PublicDecrypt};
use crate::reveal::RevealRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("insufficient allowance")]
    InsufficientAllowance,

    #[error("only the token owner may mint")]
    NotOwner,

    #[error("mint would exceed the maximum supply")]
    SupplyOverflow,

    #[error("balance request signature is invalid")]
    InvalidSignature,

    #[error(transparent)]
    Fhe(#[from] FheError),
}

pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Encrypted ERC-20-style token surface.
///
/// Transfers return `Ok(false)` when the token declines without an error;
/// callers treat that as a rejection.
pub trait ConfidentialToken<F: FheOps> {
    fn address(&self) -> Address;

    fn transfer(
        &mut self,
        fhe: &mut F,
        from: Address,
        to: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        fhe: &mut F,
        spender: Address,
        from: Address,
        to: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool>;

    fn approve(
        &mut self,
        fhe: &mut F,
        owner: Address,
        spender: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool>;

    /// `account`'s balance sealed to the request's key.
    fn balance_of(
        &self,
        fhe: &F,
        account: Address,
        request: &RevealRequest,
    ) -> TokenResult<SealedValue>;
}

/// In-process confidential token.
///
/// Balance and allowance checks decrypt a single boolean about the sender's
/// own funds and fail publicly on a shortfall.
#[derive(Debug, Clone)]
pub struct LocalToken<F: FheOps> {
    address: Address,
    symbol: String,
    owner: Address,
    /// Sum of all mints; mint amounts are public
    total_supply: u128,
    balances: BTreeMap<Address, F::Cipher>,
    allowances: BTreeMap<(Address, Address), F::Cipher>,
}

impl<F: PublicDecrypt> LocalToken<F> {
    pub fn new(symbol: &str, owner: Address) -> Self {
        Self {
            address: Address::derive(&[TOKEN_SEED, symbol.as_bytes(), owner.as_bytes()]),
            symbol: symbol.to_string(),
            owner,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Raw balance ciphertext, if the account was ever credited.
    pub fn balance_handle(&self, account: &Address) -> Option<&F::Cipher> {
        self.balances.get(account)
    }

    /// Owner-only. The total supply stays within one word, which bounds
    /// every balance and every sum of balances the pool forms.
    pub fn mint(&mut self, fhe: &mut F, caller: Address, to: Address, amount: u128) -> TokenResult<()> {
        if caller != self.owner {
            return Err(TokenError::NotOwner);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        let minted = fhe.encrypt(amount);
        self.credit(fhe, to, &minted)?;
        self.total_supply = supply;
        log::debug!("{}: minted {} to {}", self.symbol, amount, to);
        Ok(())
    }

    fn balance_or_zero(&self, fhe: &mut F, account: &Address) -> F::Cipher {
        match self.balances.get(account) {
            Some(b) => b.clone(),
            None => fhe.encrypt(0),
        }
    }

    fn credit(&mut self, fhe: &mut F, to: Address, amount: &F::Cipher) -> TokenResult<()> {
        let held = self.balance_or_zero(fhe, &to);
        let updated = fhe.add(&held, amount)?;
        self.balances.insert(to, updated);
        Ok(())
    }

    fn move_funds(
        &mut self,
        fhe: &mut F,
        from: Address,
        to: Address,
        amount: &F::Cipher,
    ) -> TokenResult<()> {
        let held = self.balance_or_zero(fhe, &from);
        let covered = fhe.ge(&held, amount)?;
        if !fhe.decrypt_bool(&covered)? {
            return Err(TokenError::InsufficientBalance);
        }
        let remaining = fhe.sub(&held, amount)?;
        self.balances.insert(from, remaining);
        self.credit(fhe, to, amount)
    }
}

impl<F: PublicDecrypt> ConfidentialToken<F> for LocalToken<F> {
    fn address(&self) -> Address {
        self.address
    }

    fn transfer(
        &mut self,
        fhe: &mut F,
        from: Address,
        to: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool> {
        self.move_funds(fhe, from, to, amount)?;
        Ok(true)
    }

    fn transfer_from(
        &mut self,
        fhe: &mut F,
        spender: Address,
        from: Address,
        to: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool> {
        let key = (from, spender);
        let allowed = match self.allowances.get(&key) {
            Some(a) => a.clone(),
            None => fhe.encrypt(0),
        };
        let covered = fhe.ge(&allowed, amount)?;
        if !fhe.decrypt_bool(&covered)? {
            return Err(TokenError::InsufficientAllowance);
        }
        self.move_funds(fhe, from, to, amount)?;
        let remaining = fhe.sub(&allowed, amount)?;
        self.allowances.insert(key, remaining);
        Ok(true)
    }

    /// Replaces any previous allowance.
    fn approve(
        &mut self,
        _fhe: &mut F,
        owner: Address,
        spender: Address,
        amount: &F::Cipher,
    ) -> TokenResult<bool> {
        self.allowances.insert((owner, spender), amount.clone());
        Ok(true)
    }

    fn balance_of(
        &self,
        fhe: &F,
        account: Address,
        request: &RevealRequest,
    ) -> TokenResult<SealedValue> {
        if request.caller != account || !request.verify(&self.address) {
            return Err(TokenError::InvalidSignature);
        }
        let sealed = match self.balances.get(&account) {
            Some(b) => fhe.reencrypt(b, &request.public_key)?,
            // Never credited: seal a zero directly, no ciphertext to re-encrypt.
            None => seal(&request.public_key, 0).map_err(FheError::from)?,
        };
        Ok(sealed)
    }
}
