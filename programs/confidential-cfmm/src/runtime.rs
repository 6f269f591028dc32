//! Atomic execution environment.
//!
//! The [`Runtime`] owns the encryption backend and the registered tokens and
//! applies calls one at a time. A call that returns an error leaves no trace:
//! backend, tokens and the call's target are restored to their state before
//! the call. The backend is rewound to a [`Checkpoint`] mark, so undo costs
//! what the call produced; token and target snapshots hold only current
//! entries.

use std::collections::BTreeMap;

use crate::crypto::{Address, SealedValue};
use crate::error::{CfmmError, Result};
use crate::fhe::{Checkpoint, FheOps, SimulatedFhe};
use crate::reveal::RevealRequest;
use crate::token::{ConfidentialToken, LocalToken, TokenResult};

/// Runtime over the in-process backend and tokens.
pub type LocalRuntime = Runtime<SimulatedFhe, LocalToken<SimulatedFhe>>;

/// Per-call view of the environment handed to every entry point.
pub struct Context<'a, F: FheOps, T> {
    /// Account that submitted the call
    pub caller: Address,
    pub fhe: &'a mut F,
    tokens: &'a mut BTreeMap<Address, T>,
}

impl<'a, F: FheOps, T: ConfidentialToken<F>> Context<'a, F, T> {
    pub fn is_registered(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Run `f` against a registered token with the backend and caller.
    pub fn with_token<R>(
        &mut self,
        token: Address,
        f: impl FnOnce(&mut T, &mut F, Address) -> TokenResult<R>,
    ) -> Result<R> {
        let t = self
            .tokens
            .get_mut(&token)
            .ok_or(CfmmError::TokenNotRegistered(token))?;
        Ok(f(t, &mut *self.fhe, self.caller)?)
    }

    /// Pull `amount` of `token` from `from` into `to`, spending `to`'s
    /// allowance.
    pub fn pull(&mut self, token: Address, from: Address, to: Address, amount: &F::Cipher) -> Result<()> {
        let ok = self.with_token(token, |t, fhe, _| t.transfer_from(fhe, to, from, to, amount))?;
        if !ok {
            return Err(CfmmError::TransferRejected(token));
        }
        Ok(())
    }

    /// Push `amount` of `token` held by `from` to `to`.
    pub fn push(&mut self, token: Address, from: Address, to: Address, amount: &F::Cipher) -> Result<()> {
        let ok = self.with_token(token, |t, fhe, _| t.transfer(fhe, from, to, amount))?;
        if !ok {
            return Err(CfmmError::TransferRejected(token));
        }
        Ok(())
    }

    /// Caller approves `spender` for `amount` of `token`.
    pub fn approve(&mut self, token: Address, spender: Address, amount: &F::Cipher) -> Result<()> {
        let ok = self.with_token(token, |t, fhe, caller| t.approve(fhe, caller, spender, amount))?;
        if !ok {
            return Err(CfmmError::TransferRejected(token));
        }
        Ok(())
    }

    /// Caller sends `amount` of `token` to `to`.
    pub fn transfer(&mut self, token: Address, to: Address, amount: &F::Cipher) -> Result<()> {
        let caller = self.caller;
        self.push(token, caller, to, amount)
    }

    /// Caller's own token balance, sealed to the request's key.
    pub fn balance_of(&self, token: Address, request: &RevealRequest) -> Result<SealedValue> {
        let t = self
            .tokens
            .get(&token)
            .ok_or(CfmmError::TokenNotRegistered(token))?;
        Ok(t.balance_of(&*self.fhe, self.caller, request)?)
    }
}

#[derive(Debug, Clone)]
pub struct Runtime<F, T> {
    fhe: F,
    tokens: BTreeMap<Address, T>,
}

impl<F, T> Runtime<F, T>
where
    F: FheOps + Checkpoint,
    T: ConfidentialToken<F> + Clone,
{
    pub fn new(fhe: F) -> Self {
        Self { fhe, tokens: BTreeMap::new() }
    }

    /// Register a token under its own address. Re-registering replaces it.
    pub fn register_token(&mut self, token: T) -> Address {
        let address = token.address();
        self.tokens.insert(address, token);
        address
    }

    pub fn fhe(&self) -> &F {
        &self.fhe
    }

    pub fn fhe_mut(&mut self) -> &mut F {
        &mut self.fhe
    }

    pub fn token(&self, address: &Address) -> Option<&T> {
        self.tokens.get(address)
    }

    /// Apply a call that touches only the backend and tokens.
    pub fn execute<R>(
        &mut self,
        caller: Address,
        op: impl FnOnce(&mut Context<'_, F, T>) -> Result<R>,
    ) -> Result<R> {
        let mark = self.fhe.checkpoint();
        let tokens_snapshot = self.tokens.clone();

        let mut ctx = Context { caller, fhe: &mut self.fhe, tokens: &mut self.tokens };
        let result = op(&mut ctx);
        if let Err(e) = &result {
            log::debug!("call by {} rolled back: {}", caller, e);
            self.fhe.rollback(mark);
            self.tokens = tokens_snapshot;
        }
        result
    }

    /// Apply a call to `target` (typically a pool). On error the target is
    /// restored along with the backend and tokens.
    pub fn transact<S: Clone, R>(
        &mut self,
        caller: Address,
        target: &mut S,
        op: impl FnOnce(&mut S, &mut Context<'_, F, T>) -> Result<R>,
    ) -> Result<R> {
        let target_snapshot = target.clone();
        let result = self.execute(caller, |ctx| op(target, ctx));
        if result.is_err() {
            *target = target_snapshot;
        }
        result
    }

    /// Run a read-only call. Scratch ciphertexts it creates are discarded.
    pub fn view<R>(
        &mut self,
        caller: Address,
        op: impl FnOnce(&mut Context<'_, F, T>) -> Result<R>,
    ) -> Result<R> {
        let mark = self.fhe.checkpoint();
        let tokens_snapshot = self.tokens.clone();

        let mut ctx = Context { caller, fhe: &mut self.fhe, tokens: &mut self.tokens };
        let result = op(&mut ctx);
        self.fhe.rollback(mark);
        self.tokens = tokens_snapshot;
        result
    }
}

impl LocalRuntime {
    /// Create and register a [`LocalToken`] owned by `owner`.
    pub fn create_token(&mut self, symbol: &str, owner: Address) -> Address {
        self.register_token(LocalToken::new(symbol, owner))
    }

    /// Owner-only mint of a public amount.
    pub fn mint(&mut self, caller: Address, token: Address, to: Address, amount: u128) -> Result<()> {
        self.execute(caller, |ctx| {
            ctx.with_token(token, |t, fhe, caller| t.mint(fhe, caller, to, amount))
        })
    }
}
