//! Property tests over random pool sessions. The simulated backend plays the
//! key holder to read encrypted state directly.

use confidential_cfmm::{
    Address, ConfidentialPool, FheOps, Keypair, LocalRuntime, PoolConfig, Side, SimulatedFhe,
};
use proptest::prelude::*;

type Pool = ConfidentialPool<SimulatedFhe>;

const FUNDING: u128 = 1_000_000;
const WIDE_FUNDING: u128 = 1 << 80;

struct Session {
    rt: LocalRuntime,
    pool: Pool,
    users: Vec<Keypair>,
}

fn session(fee_rate_bps: u16) -> Session {
    funded_session(fee_rate_bps, FUNDING)
}

fn funded_session(fee_rate_bps: u16, funding: u128) -> Session {
    let owner = Keypair::from_seed(b"owner");
    let users: Vec<Keypair> = (0..3u8).map(|i| Keypair::from_seed(&[b'u', i])).collect();

    let mut rt = LocalRuntime::new(SimulatedFhe::new());
    let tka = rt.create_token("TKA", owner.address());
    let tkb = rt.create_token("TKB", owner.address());
    for token in [tka, tkb] {
        for u in &users {
            rt.mint(owner.address(), token, u.address(), funding).unwrap();
        }
    }
    let config = PoolConfig { fee_rate_bps, stoppable: true };
    let pool = rt
        .execute(owner.address(), |ctx| Pool::initialize(ctx, &config, tka, tkb))
        .unwrap();
    Session { rt, pool, users }
}

impl Session {
    fn read(&self, c: &<SimulatedFhe as FheOps>::Cipher) -> u128 {
        self.rt.fhe().decrypt(c).unwrap()
    }

    fn reserves(&self) -> (u128, u128) {
        (self.read(self.pool.reserve(Side::A)), self.read(self.pool.reserve(Side::B)))
    }

    fn fee(&self, side: Side) -> u128 {
        self.read(self.pool.fees().accrued(side))
    }

    fn approve(&mut self, who: usize, token: Address, amount: u128) {
        let spender = self.pool.address();
        let caller = self.users[who].address();
        self.rt
            .execute(caller, |ctx| {
                let amt = ctx.fhe.encrypt(amount);
                ctx.approve(token, spender, &amt)
            })
            .unwrap();
    }

    fn add(&mut self, who: usize, a: u128, b: u128) {
        let (tka, tkb) = (self.pool.token(Side::A), self.pool.token(Side::B));
        self.approve(who, tka, a);
        self.approve(who, tkb, b);
        let caller = self.users[who].address();
        self.rt
            .transact(caller, &mut self.pool, |pool, ctx| {
                let (a, b) = (ctx.fhe.encrypt(a), ctx.fhe.encrypt(b));
                pool.add_liquidity(ctx, &a, &b)
            })
            .unwrap();
    }

    fn remove(&mut self, who: usize, shares: u128) {
        let caller = self.users[who].address();
        self.rt
            .transact(caller, &mut self.pool, |pool, ctx| {
                let s = ctx.fhe.encrypt(shares);
                pool.remove_liquidity(ctx, &s)
            })
            .unwrap();
    }

    fn trade(&mut self, who: usize, side: Side, amount: u128) {
        let token = self.pool.token(side);
        self.approve(who, token, amount);
        let caller = self.users[who].address();
        self.rt
            .transact(caller, &mut self.pool, |pool, ctx| {
                let amt = ctx.fhe.encrypt(amount);
                pool.trade(ctx, token, &amt)
            })
            .unwrap();
    }

    fn wallet(&self, who: usize, side: Side) -> u128 {
        let token = self.rt.token(&self.pool.token(side)).unwrap();
        token
            .balance_handle(&self.users[who].address())
            .map(|c| self.read(c))
            .unwrap_or(0)
    }

    fn shares_sum(&self) -> u128 {
        self.pool.liquidity().providers().map(|(_, s)| self.read(s)).sum()
    }
}

/// Full 256-bit product as `(high, low)` words, ordered like the product.
fn wide_product(a: u128, b: u128) -> (u128, u128) {
    const LOW: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & LOW);
    let (b_hi, b_lo) = (b >> 64, b & LOW);
    let (cross, cross_carry) = (a_lo * b_hi).overflowing_add(a_hi * b_lo);
    let (low, low_carry) = (a_lo * b_lo).overflowing_add(cross << 64);
    let high = a_hi * b_hi + (cross >> 64) + ((cross_carry as u128) << 64) + low_carry as u128;
    (high, low)
}

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::A), Just(Side::B)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn trades_never_decrease_k(
        seed_a in 1_000u128..50_000,
        seed_b in 1_000u128..50_000,
        fee in 1u16..=1_000,
        trades in prop::collection::vec((side(), 1u128..20_000), 1..4),
    ) {
        let mut s = session(fee);
        s.add(0, seed_a, seed_b);
        let mut fees_collected = [0u128; 2];

        for (i, (side, amount)) in trades.into_iter().enumerate() {
            let (ra, rb) = s.reserves();
            let fee_before = s.fee(side);
            s.trade(1 + i % 2, side, amount);
            let (ra2, rb2) = s.reserves();
            prop_assert!(ra2 * rb2 >= ra * rb);

            let fee_after = s.fee(side);
            prop_assert!(fee_after >= fee_before);
            let idx = if side == Side::A { 0 } else { 1 };
            fees_collected[idx] += amount * fee as u128 / 10_000;
        }
        prop_assert_eq!(s.fee(Side::A), fees_collected[0]);
        prop_assert_eq!(s.fee(Side::B), fees_collected[1]);
    }

    #[test]
    fn shares_sum_to_total(
        ops in prop::collection::vec((0usize..3, any::<bool>(), 1u128..5_000), 1..6),
    ) {
        let mut s = session(30);
        for (who, deposit, amount) in ops {
            if deposit {
                s.add(who, amount, amount);
            } else {
                s.remove(who, amount);
            }
            let total = s.read(s.pool.liquidity().total_shares());
            prop_assert_eq!(s.shares_sum(), total);
        }
    }

    #[test]
    fn round_trip_never_inflates(
        seed in 100u128..10_000,
        a in 1u128..10_000,
        b in 1u128..10_000,
    ) {
        let mut s = session(30);
        s.add(0, seed, seed);

        let (a0, b0) = (s.wallet(1, Side::A), s.wallet(1, Side::B));
        s.add(1, a, b);
        let minted = {
            let entry = s.pool.liquidity().shares_of(&s.users[1].address()).unwrap();
            s.read(entry)
        };
        s.remove(1, minted);

        prop_assert!(s.wallet(1, Side::A) <= a0);
        prop_assert!(s.wallet(1, Side::B) <= b0);
    }

    #[test]
    fn wide_reserves_never_decrease_k(
        seed_a in (1u128 << 65)..(1u128 << 72),
        seed_b in (1u128 << 65)..(1u128 << 72),
        trades in prop::collection::vec((side(), 1u128..(1u128 << 40)), 1..3),
    ) {
        let mut s = funded_session(30, WIDE_FUNDING);
        s.add(0, seed_a, seed_b);

        for (i, (side, amount)) in trades.into_iter().enumerate() {
            let (ra, rb) = s.reserves();
            let held_before = s.wallet(1 + i % 2, side.other());
            s.trade(1 + i % 2, side, amount);
            let (ra2, rb2) = s.reserves();
            prop_assert!(wide_product(ra2, rb2) >= wide_product(ra, rb));

            // never better than the pre-trade spot price
            let received = s.wallet(1 + i % 2, side.other()) - held_before;
            let (r_in, r_out) = if side == Side::A { (ra, rb) } else { (rb, ra) };
            prop_assert!(wide_product(received, r_in) <= wide_product(amount, r_out));
        }
    }

    #[test]
    fn wide_round_trip_never_inflates(
        seed in (1u128 << 65)..(1u128 << 70),
        a in (1u128 << 64)..(1u128 << 70),
        b in (1u128 << 64)..(1u128 << 70),
    ) {
        let mut s = funded_session(30, WIDE_FUNDING);
        s.add(0, seed, seed);

        let (a0, b0) = (s.wallet(1, Side::A), s.wallet(1, Side::B));
        s.add(1, a, b);
        let minted = {
            let entry = s.pool.liquidity().shares_of(&s.users[1].address()).unwrap();
            s.read(entry)
        };
        prop_assert!(minted > 0);
        s.remove(1, minted);

        let (a1, b1) = (s.wallet(1, Side::A), s.wallet(1, Side::B));
        prop_assert!(a1 <= a0);
        prop_assert!(b1 <= b0);
        // the smaller side comes back in full, less rounding
        prop_assert!(a0 - a1 <= a - a.min(b) + 1);
        prop_assert!(b0 - b1 <= b - a.min(b) + 1);
    }
}
