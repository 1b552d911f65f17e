use crate::error::{BenchError, Result};

/// Fixed inputs of one run. Built once and passed by value into the
/// [`RunController`](crate::harness::RunController).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
  pub n: usize,            // particle count
  pub steps_warmup: usize, // untimed steps before measurement
  pub steps: usize,        // timed steps
  pub dt: f64,             // integration time step
  pub softening: f64,      // added to every squared distance
  pub seed: u64,           // LCG seed
}

impl SimParams {
  /// The reference benchmark configuration.
  pub const fn reference() -> Self {
    SimParams {
      n: 1500,
      steps_warmup: 5,
      steps: 400,
      dt: 0.01,
      softening: 1e-9,
      seed: 1,
    }
  }

  pub fn with_n(self, n: usize) -> Self {
    SimParams { n, ..self }
  }

  pub fn with_steps(self, steps_warmup: usize, steps: usize) -> Self {
    SimParams { steps_warmup, steps, ..self }
  }

  pub fn with_dt(self, dt: f64) -> Self {
    SimParams { dt, ..self }
  }

  pub fn with_softening(self, softening: f64) -> Self {
    SimParams { softening, ..self }
  }

  pub fn with_seed(self, seed: u64) -> Self {
    SimParams { seed, ..self }
  }

  pub fn validate(&self) -> Result<()> {
    if !self.dt.is_finite() {
      return Err(BenchError::InvalidParams(format!("dt must be finite, got {}", self.dt)));
    }
    if !(self.softening.is_finite() && self.softening > 0.0) {
      return Err(BenchError::InvalidParams(format!(
        "softening must be finite and positive, got {}",
        self.softening
      )));
    }
    Ok(())
  }
}

impl Default for SimParams {
  fn default() -> Self {
    SimParams::reference()
  }
}
