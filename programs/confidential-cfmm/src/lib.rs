//! Confidential CFMM: a two-token constant-product pool whose reserves,
//! liquidity shares and accrued fees stay encrypted end to end.
//!
//! Entry points on [`ConfidentialPool`]:
//!   initialize             deploy over two registered tokens; caller becomes owner
//!   add_liquidity          deposit both tokens and mint shares
//!   remove_liquidity       burn shares, withdraw the pro-rata reserves
//!   trade                  constant-product swap with the fee routed to the owner
//!   withdraw_fee           owner collects accrued fees
//!   pause / unpause        owner circuit breaker
//!   get_user_balance_of_token  caller's claim on a reserve, sealed to a key
//!   get_balance_of_token   pool reserve, sealed to a key
//!   get_share_balance      caller's shares, sealed to a key
//!   get_fee_balance        accrued fee, sealed to the owner's key
//!
//! No entry point branches on an encrypted value: shortfalls are clamped with
//! oblivious selects and every error is a public condition. Calls run inside
//! a [`Runtime`], which rolls back all state when a call fails.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod fhe;
pub mod instructions;
pub mod reveal;
pub mod runtime;
pub mod state;
pub mod token;

pub use crypto::{Address, Keypair, PublicKey, SealedValue, Signature};
pub use error::{CfmmError, Result};
pub use fhe::{Checkpoint, FheOps, SimulatedFhe};
pub use reveal::RevealRequest;
pub use runtime::{Context, LocalRuntime, Runtime};
pub use state::{ConfidentialPool, PoolConfig, Side};
pub use token::{ConfidentialToken, LocalToken};

use instructions::*;

impl<F: FheOps> ConfidentialPool<F> {
    /// Deploy a pool. Fee rate 1–1000 bps; tokens must be distinct and registered.
    pub fn initialize<T: ConfidentialToken<F>>(
        ctx: &mut Context<'_, F, T>,
        config: &PoolConfig,
        token_a: Address,
        token_b: Address,
    ) -> Result<Self> {
        initialize_pool::handler(ctx, config, token_a, token_b)
    }

    /// Deposit `(amount_a, amount_b)` and receive shares. The caller must
    /// have approved the pool on both tokens.
    pub fn add_liquidity<T: ConfidentialToken<F>>(
        &mut self,
        ctx: &mut Context<'_, F, T>,
        amount_a: &F::Cipher,
        amount_b: &F::Cipher,
    ) -> Result<()> {
        provide_liquidity::handler(self, ctx, amount_a, amount_b)
    }

    /// Burn `share_amount` shares; burns nothing if the caller holds fewer.
    pub fn remove_liquidity<T: ConfidentialToken<F>>(
        &mut self,
        ctx: &mut Context<'_, F, T>,
        share_amount: &F::Cipher,
    ) -> Result<()> {
        remove_liquidity::handler(self, ctx, share_amount)
    }

    /// Sell `amount_in` of `token_in` for the other pool token.
    pub fn trade<T: ConfidentialToken<F>>(
        &mut self,
        ctx: &mut Context<'_, F, T>,
        token_in: Address,
        amount_in: &F::Cipher,
    ) -> Result<()> {
        swap::handler(self, ctx, token_in, amount_in)
    }

    /// Owner only. Pays `min(amount, accrued)`.
    pub fn withdraw_fee<T: ConfidentialToken<F>>(
        &mut self,
        ctx: &mut Context<'_, F, T>,
        token: Address,
        amount: &F::Cipher,
    ) -> Result<()> {
        withdraw_fee::handler(self, ctx, token, amount)
    }

    pub fn pause<T: ConfidentialToken<F>>(&mut self, ctx: &mut Context<'_, F, T>) -> Result<()> {
        circuit_breaker::handler(self, ctx, true)
    }

    pub fn unpause<T: ConfidentialToken<F>>(&mut self, ctx: &mut Context<'_, F, T>) -> Result<()> {
        circuit_breaker::handler(self, ctx, false)
    }

    pub fn get_user_balance_of_token<T: ConfidentialToken<F>>(
        &self,
        ctx: &mut Context<'_, F, T>,
        token: Address,
        public_key: PublicKey,
        signature: &Signature,
    ) -> Result<SealedValue> {
        reveal_balance::user_balance_of_token(self, ctx, token, public_key, signature)
    }

    pub fn get_balance_of_token<T: ConfidentialToken<F>>(
        &self,
        ctx: &mut Context<'_, F, T>,
        token: Address,
        public_key: PublicKey,
        signature: &Signature,
    ) -> Result<SealedValue> {
        reveal_balance::balance_of_token(self, ctx, token, public_key, signature)
    }

    pub fn get_share_balance<T: ConfidentialToken<F>>(
        &self,
        ctx: &mut Context<'_, F, T>,
        public_key: PublicKey,
        signature: &Signature,
    ) -> Result<SealedValue> {
        reveal_balance::share_balance(self, ctx, public_key, signature)
    }

    pub fn get_fee_balance<T: ConfidentialToken<F>>(
        &self,
        ctx: &mut Context<'_, F, T>,
        token: Address,
        public_key: PublicKey,
        signature: &Signature,
    ) -> Result<SealedValue> {
        reveal_balance::fee_balance(self, ctx, token, public_key, signature)
    }
}
