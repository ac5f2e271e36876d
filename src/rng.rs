//! Deterministic random source for the simulator
//!
//! A 32-bit Mulberry32 stream with a polar-method Gaussian on top. The
//! output sequence depends only on the seed, so a given seed replays
//! the exact same evaluation on every platform.

use rand::{RngCore, SeedableRng};

const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Seedable RNG used by every stochastic step of a duel.
///
/// The second normal of each polar pair is kept in `spare` and handed
/// out on the next `next_gaussian` call before any new uniforms are drawn.
#[derive(Debug, Clone)]
pub struct SimRng {
    state: u32,
    has_spare: bool,
    spare: f64,
}

impl SimRng {
    #[inline(always)]
    pub fn new(seed: u32) -> Self {
        Self {
            state: seed,
            has_spare: false,
            spare: 0.0,
        }
    }

    /// Seed from OS entropy, for callers that don't care about replay.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u32>())
    }

    /// Seed derived from a free-form key, see [`hash_seed`].
    pub fn from_key(key: &str) -> Self {
        Self::new(hash_seed(key))
    }

    #[inline(always)]
    pub fn next_word(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t));
        t ^ (t >> 14)
    }

    /// Uniform draw in [0, 1).
    #[inline(always)]
    pub fn next_uniform(&mut self) -> f64 {
        self.next_word() as f64 / TWO_POW_32
    }

    /// Standard normal draw (Marsaglia polar method).
    #[inline]
    pub fn next_gaussian(&mut self) -> f64 {
        if self.has_spare {
            self.has_spare = false;
            return self.spare;
        }
        let (u, v, r) = loop {
            let u = 2.0 * self.next_uniform() - 1.0;
            let v = 2.0 * self.next_uniform() - 1.0;
            let r = u * u + v * v;
            if r != 0.0 && r < 1.0 {
                break (u, v, r);
            }
        };
        let f = (-2.0 * r.ln() / r).sqrt();
        self.spare = v * f;
        self.has_spare = true;
        u * f
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_word() as u64;
        let hi = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SimRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new((state ^ (state >> 32)) as u32)
    }
}

/// Derive a 32-bit seed from a string key.
///
/// `h = h * 31 + c` over UTF-16 code units with 32-bit signed wrap-around,
/// then the absolute value. Identical keys always give identical seeds.
pub fn hash_seed(key: &str) -> u32 {
    let hash = key
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32));
    hash.unsigned_abs()
}

/// Canonical reproducibility key for a (weapon, distance, skill) triple.
///
/// Skill is rounded to two decimals so slider noise below 0.005° maps to
/// the same stream. Ties round away from zero (0.125 -> "0.13"); plain
/// `{:.2}` would round exact binary ties to even.
pub fn seed_key(weapon: &str, distance: f64, skill_deg: f64) -> String {
    let skill = (skill_deg * 100.0).round() / 100.0;
    format!("{weapon}-{distance}-{skill:.2}")
}
