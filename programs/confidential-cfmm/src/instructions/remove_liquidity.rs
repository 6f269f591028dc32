use super::fee_math::pro_rata;
use crate::error::Result;
use crate::fhe::oblivious::take_if_covered;
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::{ConfidentialPool, Side};
use crate::token::ConfidentialToken;

/// Burn shares and withdraw the proportional reserves.
///
/// A request larger than the caller's balance burns nothing and pays out
/// zero of each token; the call still succeeds with the same transfers.
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    pool: &mut ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    share_amount: &F::Cipher,
) -> Result<()> {
    pool.require_active()?;
    let caller = ctx.caller;

    let (amount_a, amount_b) = {
        let fhe = &mut *ctx.fhe;
        let held = pool.liquidity.shares_or_zero(fhe, &caller);
        let burned = take_if_covered(fhe, share_amount, &held)?;

        let total = pool.liquidity.total_shares().clone();
        let amount_a = pro_rata(fhe, &burned, &pool.reserve_a, &total)?;
        let amount_b = pro_rata(fhe, &burned, &pool.reserve_b, &total)?;

        pool.liquidity.debit(fhe, &caller, &burned)?;
        pool.withdraw_reserves(fhe, &amount_a, &amount_b)?;
        (amount_a, amount_b)
    };

    let pool_address = pool.address;
    ctx.push(pool.token(Side::A), pool_address, caller, &amount_a)?;
    ctx.push(pool.token(Side::B), pool_address, caller, &amount_b)?;

    log::info!("RemoveLiquidity: pool={} provider={}", pool_address, caller);
    Ok(())
}
