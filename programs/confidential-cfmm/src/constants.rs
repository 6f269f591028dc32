/// Address derivation seeds
pub const POOL_SEED: &[u8] = b"pool";
pub const TOKEN_SEED: &[u8] = b"token";

/// Default trading fee: 0.30 %
pub const FEE_RATE_DEFAULT_BPS: u16 = 30;

/// Upper bound on the trading fee: 10 %
pub const MAX_FEE_RATE_BPS: u16 = 1_000;

/// Denominator for basis-point math
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Shares minted per unit of token A on the first deposit
pub const INITIAL_SHARES_PER_UNIT: u128 = 1;

/// Rounds of encrypted long division: one per bit of the 128-bit word
pub const QUOTIENT_BITS: u32 = u128::BITS;

/// Domain tag prefixed to every reveal authorization message
pub const REVEAL_DOMAIN: &[u8] = b"confidential-cfmm/reveal/v1";
