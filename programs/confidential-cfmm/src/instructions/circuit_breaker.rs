use crate::error::{CfmmError, Result};
use crate::fhe::FheOps;
use crate::runtime::Context;
use crate::state::ConfidentialPool;
use crate::token::ConfidentialToken;

/// Set the pause flag. Owner only, and only on stoppable pools. Setting the
/// current value again is allowed.
pub fn handler<F: FheOps, T: ConfidentialToken<F>>(
    pool: &mut ConfidentialPool<F>,
    ctx: &mut Context<'_, F, T>,
    paused: bool,
) -> Result<()> {
    pool.require_owner(&ctx.caller)?;
    if !pool.stoppable {
        return Err(CfmmError::NotStoppable);
    }
    pool.paused = paused;

    log::info!("CircuitBreaker: pool={} paused={}", pool.address, paused);
    Ok(())
}
