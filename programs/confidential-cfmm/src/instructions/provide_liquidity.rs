use super::fee_math::minted_shares;
use crate::error::Result;
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::{ConfidentialPool, Side};
use crate::token::ConfidentialToken;

/// Add liquidity and mint shares.
///
/// Reserves grow by the full deposit whatever its ratio; shares are minted
/// against the scarcer side, so an unbalanced deposit donates its excess to
/// existing providers.
///
/// Effective flow:
///   1. mint shares against pre-deposit reserves and total
///   2. reserves += deposit, ledger and total += minted
///   3. caller → pool : amount_a of token A, amount_b of token B
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    pool: &mut ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    amount_a: &F::Cipher,
    amount_b: &F::Cipher,
) -> Result<()> {
    pool.require_active()?;
    let caller = ctx.caller;

    {
        let fhe = &mut *ctx.fhe;
        let minted = minted_shares(
            fhe,
            amount_a,
            amount_b,
            &pool.reserve_a,
            &pool.reserve_b,
            pool.liquidity.total_shares(),
        )?;

        pool.deposit_reserves(fhe, amount_a, amount_b)?;
        pool.liquidity.credit(fhe, caller, &minted)?;
        pool.seeded = true;
        log::debug!("minted share handle {:?} for {}", minted, caller);
    }

    let pool_address = pool.address;
    ctx.pull(pool.token(Side::A), caller, pool_address, amount_a)?;
    ctx.pull(pool.token(Side::B), caller, pool_address, amount_b)?;

    log::info!("AddLiquidity: pool={} provider={}", pool_address, caller);
    Ok(())
}
