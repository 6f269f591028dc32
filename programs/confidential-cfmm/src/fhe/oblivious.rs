//! Branch-free building blocks composed from [`FheOps`].
//!
//! Every helper issues the same sequence of backend operations whatever the
//! encrypted inputs are.

use super::{FheOps, FheResult};
use crate::constants::{BPS_DENOMINATOR, QUOTIENT_BITS};

/// `a − b` if `a ≥ b`, else 0.
pub fn clamp_sub<F: FheOps>(fhe: &mut F, a: &F::Cipher, b: &F::Cipher) -> FheResult<F::Cipher> {
    let zero = fhe.encrypt(0);
    let covered = fhe.ge(a, b)?;
    let diff = fhe.sub(a, b)?;
    fhe.select(&covered, &diff, &zero)
}

pub fn min<F: FheOps>(fhe: &mut F, a: &F::Cipher, b: &F::Cipher) -> FheResult<F::Cipher> {
    let a_smaller = fhe.le(a, b)?;
    fhe.select(&a_smaller, a, b)
}

/// `requested` if it is covered by `available`, else 0 (all-or-nothing).
pub fn take_if_covered<F: FheOps>(
    fhe: &mut F,
    requested: &F::Cipher,
    available: &F::Cipher,
) -> FheResult<F::Cipher> {
    let zero = fhe.encrypt(0);
    let covered = fhe.le(requested, available)?;
    fhe.select(&covered, requested, &zero)
}

/// `amount × rate_bps / 10 000`, floored. The rate is public.
///
/// Split as `(amount / 10 000)·rate + (amount % 10 000)·rate / 10 000` so no
/// intermediate leaves the word for any amount.
pub fn bps_of<F: FheOps>(fhe: &mut F, amount: &F::Cipher, rate_bps: u16) -> FheResult<F::Cipher> {
    let rate = rate_bps as u128;
    let whole = fhe.div_scalar(amount, BPS_DENOMINATOR)?;
    let whole_part = fhe.mul_scalar(&whole, BPS_DENOMINATOR)?;
    let rest = fhe.sub(amount, &whole_part)?;
    let from_whole = fhe.mul_scalar(&whole, rate)?;
    let rest_scaled = fhe.mul_scalar(&rest, rate)?;
    let from_rest = fhe.div_scalar(&rest_scaled, BPS_DENOMINATOR)?;
    fhe.add(&from_whole, &from_rest)
}

/// Encrypted floor division by shift-and-subtract long division.
///
/// Runs exactly [`QUOTIENT_BITS`] rounds. Round `i` subtracts `den · 2^i`
/// from the running remainder when it fits. A shifted divisor that would
/// leave the 128-bit word is never subtracted, so the result is exact for
/// every pair of words. A zero denominator yields 0.
pub fn div<F: FheOps>(
    fhe: &mut F,
    numerator: &F::Cipher,
    denominator: &F::Cipher,
) -> FheResult<F::Cipher> {
    let zero = fhe.encrypt(0);
    let mut quotient = zero.clone();
    let mut remainder = numerator.clone();
    for bit in (0..QUOTIENT_BITS).rev() {
        let headroom = fhe.encrypt(u128::MAX >> bit);
        let in_word = fhe.le(denominator, &headroom)?;
        let shifted = fhe.mul_scalar(denominator, 1u128 << bit)?;
        let fits = fhe.le(&shifted, &remainder)?;

        let step = fhe.encrypt(1u128 << bit);
        let take = fhe.select(&fits, &step, &zero)?;
        let take = fhe.select(&in_word, &take, &zero)?;
        let debit = fhe.select(&fits, &shifted, &zero)?;
        let debit = fhe.select(&in_word, &debit, &zero)?;

        quotient = fhe.add(&quotient, &take)?;
        remainder = fhe.sub(&remainder, &debit)?;
    }
    let den_is_zero = fhe.eq(denominator, &zero)?;
    fhe.select(&den_is_zero, &zero, &quotient)
}

/// `r + addend` reduced by `modulus`, with the carry into the quotient.
///
/// Requires `r < modulus` and `addend < modulus`; never forms a sum that
/// leaves the word.
fn add_mod<F: FheOps>(
    fhe: &mut F,
    r: &F::Cipher,
    addend: &F::Cipher,
    modulus: &F::Cipher,
    one: &F::Cipher,
    zero: &F::Cipher,
) -> FheResult<(F::Cipher, F::Cipher)> {
    let gap = fhe.sub(modulus, r)?;
    let carries = fhe.ge(addend, &gap)?;
    let folded = fhe.sub(addend, &gap)?;
    let sum = fhe.add(r, addend)?;
    let reduced = fhe.select(&carries, &folded, &sum)?;
    let carry = fhe.select(&carries, one, zero)?;
    Ok((reduced, carry))
}

/// `a × b / c`, floored, without forming the full product.
///
/// Walks the bits of `b` from the top and keeps `a × prefix(b)` as
/// `q·c + r` with `r < c`, doubling and adding `a = qa·c + ra` one bit at a
/// time. Exact whenever the true quotient fits the word. A zero `c` yields 0.
pub fn mul_div<F: FheOps>(
    fhe: &mut F,
    a: &F::Cipher,
    b: &F::Cipher,
    c: &F::Cipher,
) -> FheResult<F::Cipher> {
    let zero = fhe.encrypt(0);
    let one = fhe.encrypt(1);
    let c_is_zero = fhe.eq(c, &zero)?;
    let modulus = fhe.select(&c_is_zero, &one, c)?;

    let qa = div(fhe, a, &modulus)?;
    let qa_part = fhe.mul(&qa, &modulus)?;
    let ra = fhe.sub(a, &qa_part)?;

    let mut q = zero.clone();
    let mut r = zero.clone();
    let mut rest = b.clone();
    for bit in (0..QUOTIENT_BITS).rev() {
        let (doubled, carry) = add_mod(fhe, &r, &r, &modulus, &one, &zero)?;
        let q_doubled = fhe.add(&q, &q)?;
        q = fhe.add(&q_doubled, &carry)?;
        r = doubled;

        let weight = fhe.encrypt(1u128 << bit);
        let set = fhe.ge(&rest, &weight)?;
        let spent = fhe.select(&set, &weight, &zero)?;
        rest = fhe.sub(&rest, &spent)?;

        let add_q = fhe.select(&set, &qa, &zero)?;
        let add_r = fhe.select(&set, &ra, &zero)?;
        let (summed, carry) = add_mod(fhe, &r, &add_r, &modulus, &one, &zero)?;
        let q_added = fhe.add(&q, &add_q)?;
        q = fhe.add(&q_added, &carry)?;
        r = summed;
    }
    fhe.select(&c_is_zero, &zero, &q)
}
