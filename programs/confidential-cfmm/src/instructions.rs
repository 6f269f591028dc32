pub mod circuit_breaker;
pub mod fee_math;
pub mod initialize_pool;
pub mod provide_liquidity;
pub mod remove_liquidity;
pub mod reveal_balance;
pub mod swap;
pub mod withdraw_fee;

pub use fee_math::{compute_swap, minted_shares, pro_rata, SwapAmounts};
