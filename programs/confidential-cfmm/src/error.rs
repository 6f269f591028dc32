//! Engine error type.
//!
//! Every variant describes a public condition. Secret-dependent shortfalls
//! are clamped inside the engine and never reach this enum.

use crate::crypto::Address;
use crate::fhe::FheError;
use crate::token::TokenError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CfmmError {
    // ── Access control ───────────────────────────────────────────────────────
    #[error("Pool is paused")]
    Paused,

    #[error("Only the pool owner may call this")]
    NotOwner,

    /// The pool was deployed with `stoppable = false`.
    #[error("Pool circuit breaker is disabled")]
    NotStoppable,

    #[error("Reveal signature does not authenticate the caller's key")]
    InvalidSignature,

    /// Valid signature, but the caller has no claim on the requested value.
    #[error("Caller is not authorized to reveal this value")]
    NotAuthorized,

    // ── Token identity ───────────────────────────────────────────────────────
    #[error("Token {0} is not one of the pool's tokens")]
    UnknownToken(Address),

    #[error("Pool tokens must differ")]
    IdenticalTokens,

    #[error("Token {0} is not registered with the runtime")]
    TokenNotRegistered(Address),

    // ── Pool lifecycle ───────────────────────────────────────────────────────
    #[error("Fee rate must be 1–1000 bps, got {0}")]
    InvalidFeeRate(u16),

    #[error("Pool has no liquidity; seed it with add_liquidity first")]
    PoolNotSeeded,

    // ── Collaborators ────────────────────────────────────────────────────────
    /// The token accepted the call but reported failure.
    #[error("Token {0} rejected the transfer")]
    TransferRejected(Address),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Encrypted arithmetic error: {0}")]
    Fhe(#[from] FheError),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, CfmmError>;
