use crate::constants::POOL_SEED;
use crate::crypto::Address;
use crate::error::{CfmmError, Result};
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::{ConfidentialPool, FeeLedger, LiquidityLedger, PoolConfig};
use crate::token::ConfidentialToken;

/// Deploy a pool over two registered tokens. The caller becomes the owner.
/// Reserves, share total and fee entries start as encryptions of zero.
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    ctx: &mut Context<'_, F, T>,
    config: &PoolConfig,
    token_a: Address,
    token_b: Address,
) -> Result<ConfidentialPool<F>> {
    config.validate()?;
    if token_a == token_b {
        return Err(CfmmError::IdenticalTokens);
    }
    for token in [token_a, token_b] {
        if !ctx.is_registered(&token) {
            return Err(CfmmError::TokenNotRegistered(token));
        }
    }

    let owner = ctx.caller;
    let address = Address::derive(&[POOL_SEED, token_a.as_bytes(), token_b.as_bytes(), owner.as_bytes()]);
    let fhe = &mut *ctx.fhe;

    let pool = ConfidentialPool {
        address,
        owner,
        token_a,
        token_b,
        fee_rate_bps: config.fee_rate_bps,
        stoppable: config.stoppable,
        paused: false,
        seeded: false,
        reserve_a: fhe.encrypt(0),
        reserve_b: fhe.encrypt(0),
        liquidity: LiquidityLedger::new(fhe),
        fees: FeeLedger::new(fhe),
    };

    log::info!(
        "Pool created: {} tokens={}/{} fee={}bps stoppable={}",
        address,
        token_a,
        token_b,
        config.fee_rate_bps,
        config.stoppable
    );
    Ok(pool)
}
