use crate::constants::INITIAL_SHARES_PER_UNIT;
use crate::fhe::oblivious::{bps_of, min, mul_div};
use crate::fhe::{FheOps, FheResult};

/// Encrypted result of the swap fee and output calculation.
#[derive(Debug, Clone)]
pub struct SwapAmounts<C> {
    /// Fee taken from amount_in, credited to the fee ledger.
    pub fee: C,
    /// amount_in − fee; the portion that enters the reserve and the k formula.
    pub net_in: C,
    /// Tokens sent to the trader from the output reserve, clamped to it.
    pub amount_out: C,
}

/// Compute fee, net input and constant-product output.
///
/// * `amount_in`    – encrypted amount the trader is selling
/// * `fee_rate_bps` – public pool fee rate in basis points
/// * `reserve_in`   – encrypted reserve of the input token
/// * `reserve_out`  – encrypted reserve of the output token
///
/// `amount_out = min(reserve_out · net / (reserve_in + net), reserve_out)`.
/// The floor division rounds in the pool's favour, so k never decreases.
pub fn compute_swap<F: FheOps>(
    fhe: &mut F,
    amount_in: &F::Cipher,
    fee_rate_bps: u16,
    reserve_in: &F::Cipher,
    reserve_out: &F::Cipher,
) -> FheResult<SwapAmounts<F::Cipher>> {
    // ── Fee (public rate, secret amount) ─────────────────────────────────────
    let fee = bps_of(fhe, amount_in, fee_rate_bps)?;
    let net_in = fhe.sub(amount_in, &fee)?; // fee ≤ amount_in, rate ≤ 100 %

    // ── Constant-product output: dy = y · dx_net / (x + dx_net) ─────────────
    let grown_in = fhe.add(reserve_in, &net_in)?;
    let raw_out = mul_div(fhe, reserve_out, &net_in, &grown_in)?;
    let amount_out = min(fhe, &raw_out, reserve_out)?;

    Ok(SwapAmounts { fee, net_in, amount_out })
}

/// Shares minted for a deposit of `(amount_a, amount_b)`.
///
/// ```text
/// total == 0 : amount_a · INITIAL_SHARES_PER_UNIT
/// otherwise  : min(amount_a · total / reserve_a, amount_b · total / reserve_b)
/// ```
/// Both branches are always computed and merged with `select`; the empty-pool
/// branch divides by zero reserves, which the encrypted division maps to 0.
pub fn minted_shares<F: FheOps>(
    fhe: &mut F,
    amount_a: &F::Cipher,
    amount_b: &F::Cipher,
    reserve_a: &F::Cipher,
    reserve_b: &F::Cipher,
    total_shares: &F::Cipher,
) -> FheResult<F::Cipher> {
    let from_a = mul_div(fhe, amount_a, total_shares, reserve_a)?;
    let from_b = mul_div(fhe, amount_b, total_shares, reserve_b)?;
    let proportional = min(fhe, &from_a, &from_b)?;

    let initial = fhe.mul_scalar(amount_a, INITIAL_SHARES_PER_UNIT)?;
    let zero = fhe.encrypt(0);
    let empty = fhe.eq(total_shares, &zero)?;
    fhe.select(&empty, &initial, &proportional)
}

/// `shares · reserve / total`: one provider's claim on a reserve.
pub fn pro_rata<F: FheOps>(
    fhe: &mut F,
    shares: &F::Cipher,
    reserve: &F::Cipher,
    total_shares: &F::Cipher,
) -> FheResult<F::Cipher> {
    mul_div(fhe, shares, reserve, total_shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::SimulatedFhe;

    fn swap(amount_in: u128, bps: u16, r_in: u128, r_out: u128) -> (u128, u128, u128) {
        let mut fhe = SimulatedFhe::new();
        let (a, x, y) = (fhe.encrypt(amount_in), fhe.encrypt(r_in), fhe.encrypt(r_out));
        let s = compute_swap(&mut fhe, &a, bps, &x, &y).unwrap();
        (
            fhe.decrypt(&s.fee).unwrap(),
            fhe.decrypt(&s.net_in).unwrap(),
            fhe.decrypt(&s.amount_out).unwrap(),
        )
    }

    #[test]
    fn five_percent_swap_on_balanced_pool() {
        assert_eq!(swap(500, 500, 500, 500), (25, 475, 243));
        assert_eq!(swap(100, 500, 450, 450), (5, 95, 78));
    }

    #[test]
    fn matches_plaintext_formula() {
        for (amt, bps, x, y) in [(1_000u128, 30u16, 50_000u128, 80_000u128), (7, 1, 3, 9), (1, 1_000, 1, 1)] {
            let fee = amt * bps as u128 / 10_000;
            let net = amt - fee;
            let out = (y * net / (x + net)).min(y);
            assert_eq!(swap(amt, bps, x, y), (fee, net, out));
        }
    }

    #[test]
    fn wide_reserves_keep_constant_product_output() {
        let wide = 1u128 << 70;
        let (fee, net, out) = swap(1_000, 30, wide, wide);
        assert_eq!((fee, net), (3, 997));
        assert_eq!(out, 996);

        // y · net stays in the word here, so the plain formula is the oracle
        let (x, y) = (1u128 << 90, 1u128 << 65);
        let (_, net, out) = swap(1 << 40, 30, x, y);
        assert_eq!(out, y * net / (x + net));
    }

    #[test]
    fn output_on_empty_reserves_is_zero() {
        assert_eq!(swap(100, 30, 0, 0).2, 0);
    }

    #[test]
    fn first_deposit_mints_amount_a() {
        let mut fhe = SimulatedFhe::new();
        let (a, b, zero) = (fhe.encrypt(100), fhe.encrypt(300), fhe.encrypt(0));
        let minted = minted_shares(&mut fhe, &a, &b, &zero, &zero, &zero).unwrap();
        assert_eq!(fhe.decrypt(&minted).unwrap(), 100);
    }

    #[test]
    fn later_deposit_mints_the_scarcer_side() {
        let mut fhe = SimulatedFhe::new();
        let (a, b) = (fhe.encrypt(200), fhe.encrypt(100));
        let (ra, rb, total) = (fhe.encrypt(100), fhe.encrypt(100), fhe.encrypt(100));
        let minted = minted_shares(&mut fhe, &a, &b, &ra, &rb, &total).unwrap();
        assert_eq!(fhe.decrypt(&minted).unwrap(), 100);
    }

    #[test]
    fn minting_runs_same_operations_for_empty_and_seeded_pool() {
        let ops = |total: u128| {
            let mut fhe = SimulatedFhe::new();
            let (a, b) = (fhe.encrypt(50), fhe.encrypt(50));
            let (ra, rb, t) = (fhe.encrypt(total), fhe.encrypt(total), fhe.encrypt(total));
            let before = fhe.operation_count();
            minted_shares(&mut fhe, &a, &b, &ra, &rb, &t).unwrap();
            fhe.operation_count() - before
        };
        assert_eq!(ops(0), ops(1_000));
    }

    #[test]
    fn withdrawal_claim_is_exact_past_the_word() {
        let mut fhe = SimulatedFhe::new();
        let wide = 1u128 << 70;
        let (shares, reserve, total) = (fhe.encrypt(wide), fhe.encrypt(wide * 3), fhe.encrypt(wide * 2));
        let claim = pro_rata(&mut fhe, &shares, &reserve, &total).unwrap();
        assert_eq!(fhe.decrypt(&claim).unwrap(), wide + wide / 2);
    }
}
