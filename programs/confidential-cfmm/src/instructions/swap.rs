use super::fee_math::compute_swap;
use crate::crypto::Address;
use crate::error::{CfmmError, Result};
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::ConfidentialPool;
use crate::token::ConfidentialToken;

/// Constant-product trade of `amount_in` of `token_in` for the other token.
///
/// The fee is taken from amount_in and credited to the fee ledger; only the
/// net input enters the reserve.
///
/// Effective flow:
///   1. reserve_in += net_in, reserve_out −= amount_out, fee ledger += fee
///   2. trader → pool : amount_in of token_in
///   3. pool → trader : amount_out of the other token
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    pool: &mut ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    token_in: Address,
    amount_in: &F::Cipher,
) -> Result<()> {
    pool.require_active()?;
    let side_in = pool.side_of(&token_in)?;
    if !pool.seeded {
        return Err(CfmmError::PoolNotSeeded);
    }
    let caller = ctx.caller;

    let amount_out = {
        let fhe = &mut *ctx.fhe;
        let amounts = compute_swap(
            fhe,
            amount_in,
            pool.fee_rate_bps,
            pool.reserve(side_in),
            pool.reserve(side_in.other()),
        )?;

        pool.apply_trade(fhe, side_in, &amounts.net_in, &amounts.amount_out)?;
        pool.fees.credit(fhe, side_in, &amounts.fee)?;
        amounts.amount_out
    };

    let pool_address = pool.address;
    let token_out = pool.token(side_in.other());
    ctx.pull(token_in, caller, pool_address, amount_in)?;
    ctx.push(token_out, pool_address, caller, &amount_out)?;

    log::info!(
        "Trade: pool={} trader={} token_in={} fee={}bps",
        pool_address,
        caller,
        token_in,
        pool.fee_rate_bps
    );
    Ok(())
}
