//! TOML scenario files and the in-process session that plays them.
//!
//! ```toml
//! owner = "alice"
//!
//! [pool]
//! fee_rate_bps = 500
//!
//! [[accounts]]
//! name = "bob"
//! a = 1000
//! b = 1000
//!
//! [[steps]]
//! op = "add_liquidity"
//! account = "bob"
//! amount_a = 100
//! amount_b = 100
//! ```
//!
//! Account keys are derived from their names, so sessions are reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use confidential_cfmm::{
    Address, CfmmError, ConfidentialPool, FheOps, Keypair, LocalRuntime, PoolConfig,
    RevealRequest, SealedValue, Side, SimulatedFhe,
};

// ─── File format ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Deploys the pool and owns both tokens
    pub owner: String,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Initial funding, minted by the owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountSpec {
    pub name: String,
    #[serde(default)]
    pub a: u64,
    #[serde(default)]
    pub b: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealKind {
    /// Token balance held in the account's own wallet
    Wallet,
    /// Claim on the pool reserve
    UserBalance,
    /// Pool reserve (owner and providers)
    Reserve,
    /// Liquidity shares
    Shares,
    /// Accrued fee (owner)
    Fee,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AddLiquidity { account: String, amount_a: u64, amount_b: u64 },
    RemoveLiquidity { account: String, shares: u64 },
    Trade { account: String, token: Side, amount: u64 },
    WithdrawFee { account: String, token: Side, amount: u64 },
    Pause { account: String },
    Unpause { account: String },
    Transfer { account: String, to: String, token: Side, amount: u64 },
    Reveal {
        account: String,
        what: RevealKind,
        #[serde(default)]
        token: Option<Side>,
    },
}

impl Step {
    pub fn account(&self) -> &str {
        match self {
            Step::AddLiquidity { account, .. }
            | Step::RemoveLiquidity { account, .. }
            | Step::Trade { account, .. }
            | Step::WithdrawFee { account, .. }
            | Step::Pause { account }
            | Step::Unpause { account }
            | Step::Transfer { account, .. }
            | Step::Reveal { account, .. } => account,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::Trade { .. } => "trade",
            Step::WithdrawFee { .. } => "withdraw_fee",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::Transfer { .. } => "transfer",
            Step::Reveal { .. } => "reveal",
        }
    }
}

pub fn load(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read scenario file '{}'", path.display()))?;
    let scenario: Scenario = toml::from_str(&raw)
        .with_context(|| format!("Invalid scenario file '{}'", path.display()))?;
    Ok(scenario)
}

/// Static checks: pool parameters, unique account names, every referenced
/// account known, reveal steps name a token where one is needed.
pub fn validate(scenario: &Scenario) -> Result<()> {
    scenario
        .pool
        .validate()
        .map_err(|e| anyhow!("[pool] {e}"))?;

    let mut names = BTreeSet::new();
    names.insert(scenario.owner.as_str());
    for acct in &scenario.accounts {
        if acct.name != scenario.owner && !names.insert(acct.name.as_str()) {
            bail!("account '{}' is declared twice", acct.name);
        }
    }

    for (i, step) in scenario.steps.iter().enumerate() {
        let n = i + 1;
        if !names.contains(step.account()) {
            bail!("step {n} ({}): unknown account '{}'", step.op(), step.account());
        }
        match step {
            Step::Transfer { to, .. } if !names.contains(to.as_str()) => {
                bail!("step {n} (transfer): unknown recipient '{to}'");
            }
            Step::Reveal { what, token: None, .. } if *what != RevealKind::Shares => {
                bail!("step {n} (reveal): `token` is required for {what:?}");
            }
            _ => {}
        }
    }
    Ok(())
}

// ─── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub account: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Plaintext opened by the revealing account's key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed: Option<u128>,
    /// Sealed bytes as returned by the pool or token, base64
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sealed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub name: String,
    pub address: String,
    pub token_a: u128,
    pub token_b: u128,
    pub shares: u128,
}

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub pool: String,
    pub owner: String,
    pub token_a: String,
    pub token_b: String,
    pub fee_rate_bps: u16,
    pub paused: bool,
    pub steps: Vec<StepReport>,
    pub accounts: Vec<AccountSummary>,
}

// ─── Session ──────────────────────────────────────────────────────────────────

type Pool = ConfidentialPool<SimulatedFhe>;

pub struct Session {
    rt: LocalRuntime,
    pool: Pool,
    owner: String,
    keys: BTreeMap<String, Keypair>,
}

impl Session {
    /// Deploy tokens and pool, then fund every declared account.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let mut keys = BTreeMap::new();
        keys.insert(scenario.owner.clone(), Keypair::from_seed(scenario.owner.as_bytes()));
        for acct in &scenario.accounts {
            keys.entry(acct.name.clone())
                .or_insert_with(|| Keypair::from_seed(acct.name.as_bytes()));
        }
        let owner = keys[&scenario.owner].address();

        let mut rt = LocalRuntime::new(SimulatedFhe::with_domain(b"confidential-cfmm-cli"));
        let tka = rt.create_token("TKA", owner);
        let tkb = rt.create_token("TKB", owner);

        for acct in &scenario.accounts {
            let to = keys[&acct.name].address();
            rt.mint(owner, tka, to, acct.a as u128)
                .with_context(|| format!("funding '{}' with token A", acct.name))?;
            rt.mint(owner, tkb, to, acct.b as u128)
                .with_context(|| format!("funding '{}' with token B", acct.name))?;
        }

        let config = scenario.pool;
        let pool = rt
            .execute(owner, |ctx| Pool::initialize(ctx, &config, tka, tkb))
            .context("pool deployment failed")?;

        Ok(Self { rt, pool, owner: scenario.owner.clone(), keys })
    }

    fn key(&self, name: &str) -> Result<Keypair> {
        self.keys
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown account '{name}'"))
    }

    /// Approve the pool for `amount` of `token`, as a wallet does before
    /// submitting a pool call.
    fn approve(&mut self, who: Address, token: Address, amount: u64) -> Result<(), CfmmError> {
        let spender = self.pool.address();
        self.rt.execute(who, |ctx| {
            let amt = ctx.fhe.encrypt(amount as u128);
            ctx.approve(token, spender, &amt)
        })
    }

    fn reveal(&mut self, who: &Keypair, what: RevealKind, side: Option<Side>) -> Result<SealedValue, CfmmError> {
        let caller = who.address();
        let key = who.public_key();
        let token = self.pool.token(side.unwrap_or(Side::A));
        let sig = RevealRequest::sign(who, &self.pool.address(), key).signature;
        let pool = &self.pool;
        let rt = &mut self.rt;

        match what {
            RevealKind::Wallet => {
                let req = RevealRequest::sign(who, &token, key);
                rt.view(caller, |ctx| ctx.balance_of(token, &req))
            }
            RevealKind::UserBalance => {
                rt.view(caller, |ctx| pool.get_user_balance_of_token(ctx, token, key, &sig))
            }
            RevealKind::Reserve => rt.view(caller, |ctx| pool.get_balance_of_token(ctx, token, key, &sig)),
            RevealKind::Shares => rt.view(caller, |ctx| pool.get_share_balance(ctx, key, &sig)),
            RevealKind::Fee => rt.view(caller, |ctx| pool.get_fee_balance(ctx, token, key, &sig)),
        }
    }

    fn apply(&mut self, step: &Step) -> Result<Option<SealedValue>, CfmmError> {
        let who = match self.keys.get(step.account()) {
            Some(k) => k.clone(),
            None => return Ok(None),
        };
        let caller = who.address();

        match step {
            Step::AddLiquidity { amount_a, amount_b, .. } => {
                let (a, b) = (*amount_a, *amount_b);
                self.approve(caller, self.pool.token(Side::A), a)?;
                self.approve(caller, self.pool.token(Side::B), b)?;
                self.rt.transact(caller, &mut self.pool, |pool, ctx| {
                    let (a, b) = (ctx.fhe.encrypt(a as u128), ctx.fhe.encrypt(b as u128));
                    pool.add_liquidity(ctx, &a, &b)
                })?;
            }
            Step::RemoveLiquidity { shares, .. } => {
                let shares = *shares;
                self.rt.transact(caller, &mut self.pool, |pool, ctx| {
                    let s = ctx.fhe.encrypt(shares as u128);
                    pool.remove_liquidity(ctx, &s)
                })?;
            }
            Step::Trade { token, amount, .. } => {
                let (token_in, amount) = (self.pool.token(*token), *amount);
                self.approve(caller, token_in, amount)?;
                self.rt.transact(caller, &mut self.pool, |pool, ctx| {
                    let amt = ctx.fhe.encrypt(amount as u128);
                    pool.trade(ctx, token_in, &amt)
                })?;
            }
            Step::WithdrawFee { token, amount, .. } => {
                let (token, amount) = (self.pool.token(*token), *amount);
                self.rt.transact(caller, &mut self.pool, |pool, ctx| {
                    let amt = ctx.fhe.encrypt(amount as u128);
                    pool.withdraw_fee(ctx, token, &amt)
                })?;
            }
            Step::Pause { .. } => {
                self.rt.transact(caller, &mut self.pool, |pool, ctx| pool.pause(ctx))?;
            }
            Step::Unpause { .. } => {
                self.rt.transact(caller, &mut self.pool, |pool, ctx| pool.unpause(ctx))?;
            }
            Step::Transfer { to, token, amount, .. } => {
                let Some(to) = self.keys.get(to).map(Keypair::address) else {
                    return Ok(None);
                };
                let (token, amount) = (self.pool.token(*token), *amount);
                self.rt.execute(caller, |ctx| {
                    let amt = ctx.fhe.encrypt(amount as u128);
                    ctx.transfer(token, to, &amt)
                })?;
            }
            Step::Reveal { what, token, .. } => {
                return self.reveal(&who, *what, *token).map(Some);
            }
        }
        Ok(None)
    }

    /// Play every step. Failed steps are recorded; the runtime has already
    /// rolled them back, so the session continues.
    pub fn run(&mut self, steps: &[Step]) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let mut report = StepReport {
                index: i + 1,
                op: step.op(),
                account: step.account().to_string(),
                ok: true,
                error: None,
                revealed: None,
                sealed: None,
            };
            match self.apply(step) {
                Ok(Some(sealed)) => {
                    report.sealed = Some(B64.encode(sealed.to_bytes()));
                    report.revealed = self
                        .keys
                        .get(step.account())
                        .and_then(|k| k.open(&sealed).ok());
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("step {} ({}) failed: {}", i + 1, step.op(), e);
                    report.ok = false;
                    report.error = Some(e.to_string());
                }
            }
            reports.push(report);
        }
        reports
    }

    /// Reveal every account's wallet balances and shares with its own key.
    pub fn summary(&mut self) -> Result<Vec<AccountSummary>> {
        let names: Vec<String> = self.keys.keys().cloned().collect();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let who = self.key(&name)?;
            let mut open = |what: RevealKind, side: Option<Side>| -> Result<u128> {
                let sealed = self
                    .reveal(&who, what, side)
                    .with_context(|| format!("revealing {what:?} for '{name}'"))?;
                Ok(who.open(&sealed)?)
            };
            let token_a = open(RevealKind::Wallet, Some(Side::A))?;
            let token_b = open(RevealKind::Wallet, Some(Side::B))?;
            let shares = open(RevealKind::Shares, None)?;
            out.push(AccountSummary {
                address: who.address().to_string(),
                name,
                token_a,
                token_b,
                shares,
            });
        }
        Ok(out)
    }

    pub fn report(&mut self, steps: Vec<StepReport>) -> Result<SessionReport> {
        let accounts = self.summary()?;
        Ok(SessionReport {
            pool: self.pool.address().to_string(),
            owner: self.owner.clone(),
            token_a: self.pool.token(Side::A).to_string(),
            token_b: self.pool.token(Side::B).to_string(),
            fee_rate_bps: self.pool.fee_rate_bps(),
            paused: self.pool.is_paused(),
            steps,
            accounts,
        })
    }
}
