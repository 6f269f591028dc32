use super::fee_math::pro_rata;
use crate::crypto::{Address, PublicKey, SealedValue, Signature};
use crate::error::{CfmmError, Result};
use crate::fhe::FheOps;
use crate::reveal::RevealRequest;
use crate::runtime::Context;
use crate::state::ConfidentialPool;
use crate::token::ConfidentialToken;

// Every getter authenticates the caller first, then re-encrypts a stored or
// derived ciphertext to `public_key`. Nothing is decrypted here, and none of
// the getters consult the pause flag.

fn authorize<F: FheOps, T>(
    pool: &ConfidentialPool<F>,
    ctx: &Context<'_, F, T>,
    public_key: PublicKey,
    signature: &Signature,
) -> Result<()> {
    let request = RevealRequest { caller: ctx.caller, public_key, signature: *signature };
    if !request.verify(&pool.address) {
        return Err(CfmmError::InvalidSignature);
    }
    Ok(())
}

/// Caller's claim on `token`'s reserve: `shares · reserve / total`.
pub fn user_balance_of_token<F: FheOps, T: ConfidentialToken<F>>(
    pool: &ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    token: Address,
    public_key: PublicKey,
    signature: &Signature,
) -> Result<SealedValue> {
    authorize(pool, ctx, public_key, signature)?;
    let side = pool.side_of(&token)?;

    let fhe = &mut *ctx.fhe;
    let shares = pool.liquidity.shares_or_zero(fhe, &ctx.caller);
    let claim = pro_rata(fhe, &shares, pool.reserve(side), pool.liquidity.total_shares())?;
    log::info!("Reveal: user balance pool={} caller={} token={}", pool.address, ctx.caller, token);
    Ok(fhe.reencrypt(&claim, &public_key)?)
}

/// Pool reserve of `token`, for the owner and liquidity providers.
pub fn balance_of_token<F: FheOps, T: ConfidentialToken<F>>(
    pool: &ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    token: Address,
    public_key: PublicKey,
    signature: &Signature,
) -> Result<SealedValue> {
    authorize(pool, ctx, public_key, signature)?;
    let side = pool.side_of(&token)?;
    if ctx.caller != pool.owner && !pool.liquidity.has_entry(&ctx.caller) {
        return Err(CfmmError::NotAuthorized);
    }

    log::info!("Reveal: reserve pool={} caller={} token={}", pool.address, ctx.caller, token);
    Ok(ctx.fhe.reencrypt(pool.reserve(side), &public_key)?)
}

/// Caller's liquidity shares.
pub fn share_balance<F: FheOps, T: ConfidentialToken<F>>(
    pool: &ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    public_key: PublicKey,
    signature: &Signature,
) -> Result<SealedValue> {
    authorize(pool, ctx, public_key, signature)?;
    let shares = pool.liquidity.shares_or_zero(ctx.fhe, &ctx.caller);
    log::info!("Reveal: shares pool={} caller={}", pool.address, ctx.caller);
    Ok(ctx.fhe.reencrypt(&shares, &public_key)?)
}

/// Accrued fee of `token`; owner only.
pub fn fee_balance<F: FheOps, T: ConfidentialToken<F>>(
    pool: &ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    token: Address,
    public_key: PublicKey,
    signature: &Signature,
) -> Result<SealedValue> {
    authorize(pool, ctx, public_key, signature)?;
    pool.require_owner(&ctx.caller)?;
    let side = pool.side_of(&token)?;

    log::info!("Reveal: fee pool={} token={}", pool.address, token);
    Ok(ctx.fhe.reencrypt(pool.fees.accrued(side), &public_key)?)
}
