use crate::crypto::Address;
use crate::error::Result;
use crate::fhe::oblivious::min;
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::ConfidentialPool;
use crate::token::ConfidentialToken;

/// Owner withdraws accrued fees of one token. Requests above the accrued
/// balance pay out the accrued balance.
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    pool: &mut ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    token: Address,
    amount: &F::Cipher,
) -> Result<()> {
    pool.require_active()?;
    pool.require_owner(&ctx.caller)?;
    let side = pool.side_of(&token)?;

    let paid = {
        let fhe = &mut *ctx.fhe;
        let paid = min(fhe, amount, pool.fees.accrued(side))?;
        pool.fees.debit(fhe, side, &paid)?;
        paid
    };

    ctx.push(token, pool.address, pool.owner, &paid)?;

    log::info!("WithdrawFee: pool={} token={}", pool.address, token);
    Ok(())
}
