use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{FEE_RATE_DEFAULT_BPS, MAX_FEE_RATE_BPS};
use crate::crypto::Address;
use crate::error::{CfmmError, Result};
use crate::fhe::{FheOps, FheResult};

// ─── Side ──────────────────────────────────────────────────────────────────
// Which of the pool's two tokens an operation refers to. Token addresses are
// public, so resolving a side is a plaintext lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

// ─── PoolConfig ────────────────────────────────────────────────────────────
// Public deployment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Trading fee rate in basis points (e.g. 30 = 0.30 %)
    pub fee_rate_bps: u16,
    /// Whether the owner may pause the pool
    pub stoppable: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { fee_rate_bps: FEE_RATE_DEFAULT_BPS, stoppable: true }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fee_rate_bps == 0 || self.fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(CfmmError::InvalidFeeRate(self.fee_rate_bps));
        }
        Ok(())
    }
}

// ─── LiquidityLedger ───────────────────────────────────────────────────────
// Encrypted share balance per provider plus the encrypted total supply.
// Entries are created on first deposit and never removed.
#[derive(Debug, Clone)]
pub struct LiquidityLedger<F: FheOps> {
    shares: BTreeMap<Address, F::Cipher>,
    total_shares: F::Cipher,
}

impl<F: FheOps> LiquidityLedger<F> {
    pub fn new(fhe: &mut F) -> Self {
        Self { shares: BTreeMap::new(), total_shares: fhe.encrypt(0) }
    }

    pub fn shares_of(&self, account: &Address) -> Option<&F::Cipher> {
        self.shares.get(account)
    }

    /// Shares held by `account`, or a fresh encryption of zero.
    pub fn shares_or_zero(&self, fhe: &mut F, account: &Address) -> F::Cipher {
        match self.shares.get(account) {
            Some(held) => held.clone(),
            None => fhe.encrypt(0),
        }
    }

    /// Whether `account` has ever provided liquidity. Public: the set of
    /// depositors is visible from the transaction log.
    pub fn has_entry(&self, account: &Address) -> bool {
        self.shares.contains_key(account)
    }

    pub fn total_shares(&self) -> &F::Cipher {
        &self.total_shares
    }

    pub fn providers(&self) -> impl Iterator<Item = (&Address, &F::Cipher)> {
        self.shares.iter()
    }

    /// Mint: credit `amount` to `account` and to the total.
    pub fn credit(&mut self, fhe: &mut F, account: Address, amount: &F::Cipher) -> FheResult<()> {
        let held = self.shares_or_zero(fhe, &account);
        let updated = fhe.add(&held, amount)?;
        self.shares.insert(account, updated);
        self.total_shares = fhe.add(&self.total_shares, amount)?;
        Ok(())
    }

    /// Burn: debit `amount` from `account` and from the total.
    ///
    /// `amount` must already be clamped to the account's balance. Accounts
    /// without an entry can only burn an encrypted zero, so they are left
    /// without one.
    pub fn debit(&mut self, fhe: &mut F, account: &Address, amount: &F::Cipher) -> FheResult<()> {
        if let Some(held) = self.shares.get(account) {
            let updated = fhe.sub(held, amount)?;
            self.shares.insert(*account, updated);
        }
        self.total_shares = fhe.sub(&self.total_shares, amount)?;
        Ok(())
    }
}

// ─── FeeLedger ─────────────────────────────────────────────────────────────
// Accrued trading fees per token, withdrawable by the owner.
#[derive(Debug, Clone)]
pub struct FeeLedger<F: FheOps> {
    fee_a: F::Cipher,
    fee_b: F::Cipher,
}

impl<F: FheOps> FeeLedger<F> {
    pub fn new(fhe: &mut F) -> Self {
        Self { fee_a: fhe.encrypt(0), fee_b: fhe.encrypt(0) }
    }

    pub fn accrued(&self, side: Side) -> &F::Cipher {
        match side {
            Side::A => &self.fee_a,
            Side::B => &self.fee_b,
        }
    }

    fn accrued_mut(&mut self, side: Side) -> &mut F::Cipher {
        match side {
            Side::A => &mut self.fee_a,
            Side::B => &mut self.fee_b,
        }
    }

    pub fn credit(&mut self, fhe: &mut F, side: Side, amount: &F::Cipher) -> FheResult<()> {
        let slot = self.accrued_mut(side);
        *slot = fhe.add(slot, amount)?;
        Ok(())
    }

    /// `amount` must already be clamped to the accrued balance.
    pub fn debit(&mut self, fhe: &mut F, side: Side, amount: &F::Cipher) -> FheResult<()> {
        let slot = self.accrued_mut(side);
        *slot = fhe.sub(slot, amount)?;
        Ok(())
    }
}

// ─── ConfidentialPool ──────────────────────────────────────────────────────
// Constant-product pool (x * y = k) over encrypted reserves.
// Public: tokens, owner, fee rate, pause and seeded flags. Encrypted:
// reserves, every share balance, the share total and accrued fees.
#[derive(Debug, Clone)]
pub struct ConfidentialPool<F: FheOps> {
    /// Seed-derived pool address; the pool's token balances live here
    pub(crate) address: Address,
    /// Deploying account; withdraws fees and drives the circuit breaker
    pub(crate) owner: Address,
    pub(crate) token_a: Address,
    pub(crate) token_b: Address,
    pub(crate) fee_rate_bps: u16,
    pub(crate) stoppable: bool,
    pub(crate) paused: bool,
    /// Set by the first add_liquidity
    pub(crate) seeded: bool,
    pub(crate) reserve_a: F::Cipher,
    pub(crate) reserve_b: F::Cipher,
    pub(crate) liquidity: LiquidityLedger<F>,
    pub(crate) fees: FeeLedger<F>,
}

impl<F: FheOps> ConfidentialPool<F> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn token(&self, side: Side) -> Address {
        match side {
            Side::A => self.token_a,
            Side::B => self.token_b,
        }
    }

    pub fn fee_rate_bps(&self) -> u16 {
        self.fee_rate_bps
    }

    pub fn is_stoppable(&self) -> bool {
        self.stoppable
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn reserve(&self, side: Side) -> &F::Cipher {
        match side {
            Side::A => &self.reserve_a,
            Side::B => &self.reserve_b,
        }
    }

    pub fn liquidity(&self) -> &LiquidityLedger<F> {
        &self.liquidity
    }

    pub fn fees(&self) -> &FeeLedger<F> {
        &self.fees
    }

    pub fn side_of(&self, token: &Address) -> Result<Side> {
        if *token == self.token_a {
            Ok(Side::A)
        } else if *token == self.token_b {
            Ok(Side::B)
        } else {
            Err(CfmmError::UnknownToken(*token))
        }
    }

    pub fn require_active(&self) -> Result<()> {
        if self.paused {
            return Err(CfmmError::Paused);
        }
        Ok(())
    }

    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(CfmmError::NotOwner);
        }
        Ok(())
    }

    /// `reserve_a += amount_a; reserve_b += amount_b`
    pub(crate) fn deposit_reserves(
        &mut self,
        fhe: &mut F,
        amount_a: &F::Cipher,
        amount_b: &F::Cipher,
    ) -> FheResult<()> {
        self.reserve_a = fhe.add(&self.reserve_a, amount_a)?;
        self.reserve_b = fhe.add(&self.reserve_b, amount_b)?;
        Ok(())
    }

    /// `reserve_a −= amount_a; reserve_b −= amount_b`. Amounts are pro-rata
    /// shares of the reserves and never exceed them.
    pub(crate) fn withdraw_reserves(
        &mut self,
        fhe: &mut F,
        amount_a: &F::Cipher,
        amount_b: &F::Cipher,
    ) -> FheResult<()> {
        self.reserve_a = fhe.sub(&self.reserve_a, amount_a)?;
        self.reserve_b = fhe.sub(&self.reserve_b, amount_b)?;
        Ok(())
    }

    /// Apply a trade: the input reserve grows by the net input, the output
    /// reserve shrinks by the (already clamped) output.
    pub(crate) fn apply_trade(
        &mut self,
        fhe: &mut F,
        side_in: Side,
        net_in: &F::Cipher,
        amount_out: &F::Cipher,
    ) -> FheResult<()> {
        let (reserve_in, reserve_out) = match side_in {
            Side::A => (&mut self.reserve_a, &mut self.reserve_b),
            Side::B => (&mut self.reserve_b, &mut self.reserve_a),
        };
        *reserve_in = fhe.add(reserve_in, net_in)?;
        *reserve_out = fhe.sub(reserve_out, amount_out)?;
        Ok(())
    }
}
