//! 64-bit linear-congruential generator used to build the initial state.
//!
//! The sequence is `state = state * 6364136223846793005 + 1 (mod 2^64)`. Each
//! draw keeps the top 53 bits of the new state and maps them onto
//! `[-1.0, 1.0)`, so any implementation with wrapping `u64` arithmetic and
//! IEEE-754 doubles reproduces the same values bit for bit.

pub const MULTIPLIER: u64 = 6364136223846793005;
pub const INCREMENT: u64 = 1;

/// 2^-53
const UNIT: f64 = 1.0 / 9007199254740992.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
  state: u64,
}

impl Lcg {
  pub fn new(seed: u64) -> Self {
    Lcg { state: seed }
  }

  pub fn state(&self) -> u64 {
    self.state
  }

  #[inline(always)]
  pub fn next_u64(&mut self) -> u64 {
    self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
    self.state
  }

  /// Next draw in `[-1.0, 1.0)`.
  #[inline(always)]
  pub fn next_f64(&mut self) -> f64 {
    let v = self.next_u64();
    (((v >> 11) as f64) * UNIT) * 2.0 - 1.0
  }
}
