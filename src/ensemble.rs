use crate::alloc::ArrayAllocator;
use crate::error::{BenchError, Result};
use crate::lcg::Lcg;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
  pub p: [f64; 3],
  pub v: [f64; 3],
  pub m: f64,
}

/// Structure-of-arrays particle storage. All seven arrays have the same
/// length for the lifetime of the value and are never resized.
#[derive(Clone, Debug)]
pub struct Ensemble {
  pub(crate) x: Vec<f64>,
  pub(crate) y: Vec<f64>,
  pub(crate) z: Vec<f64>,
  pub(crate) vx: Vec<f64>,
  pub(crate) vy: Vec<f64>,
  pub(crate) vz: Vec<f64>,
  pub(crate) m: Vec<f64>,
}

impl Ensemble {
  /// Zero-filled storage for `n` particles.
  pub fn allocate(n: usize, alloc: &dyn ArrayAllocator) -> Result<Self> {
    Ok(Ensemble {
      x: alloc.zeroed("x", n)?,
      y: alloc.zeroed("y", n)?,
      z: alloc.zeroed("z", n)?,
      vx: alloc.zeroed("vx", n)?,
      vy: alloc.zeroed("vy", n)?,
      vz: alloc.zeroed("vz", n)?,
      m: alloc.zeroed("m", n)?,
    })
  }

  /// Allocate and fill from a fresh generator seeded with `seed`.
  pub fn seeded(n: usize, seed: u64, alloc: &dyn ArrayAllocator) -> Result<Self> {
    let mut ensemble = Ensemble::allocate(n, alloc)?;
    ensemble.populate(&mut Lcg::new(seed));
    Ok(ensemble)
  }

  /// Seven draws per particle, in index order: x, y, z, vx, vy, vz, m.
  /// Velocities are scaled by 0.1, mass is `|draw| + 0.5`.
  pub fn populate(&mut self, rng: &mut Lcg) {
    for i in 0..self.len() {
      self.x[i] = rng.next_f64();
      self.y[i] = rng.next_f64();
      self.z[i] = rng.next_f64();
      self.vx[i] = rng.next_f64() * 0.1;
      self.vy[i] = rng.next_f64() * 0.1;
      self.vz[i] = rng.next_f64() * 0.1;
      self.m[i] = rng.next_f64().abs() + 0.5;
    }
  }

  pub fn from_particles(particles: &[Particle], alloc: &dyn ArrayAllocator) -> Result<Self> {
    let mut ensemble = Ensemble::allocate(particles.len(), alloc)?;
    for (i, p) in particles.iter().enumerate() {
      if !(p.m > 0.0) {
        return Err(BenchError::InvalidParams(format!("particle {} has non-positive mass {}", i, p.m)));
      }
      ensemble.x[i] = p.p[0];
      ensemble.y[i] = p.p[1];
      ensemble.z[i] = p.p[2];
      ensemble.vx[i] = p.v[0];
      ensemble.vy[i] = p.v[1];
      ensemble.vz[i] = p.v[2];
      ensemble.m[i] = p.m;
    }
    Ok(ensemble)
  }

  pub fn to_particles(&self) -> Vec<Particle> {
    (0..self.len()).map(|i| self.particle(i)).collect()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.m.len()
  }

  pub fn is_empty(&self) -> bool {
    self.m.is_empty()
  }

  pub fn particle(&self, i: usize) -> Particle {
    Particle {
      p: self.position(i),
      v: self.velocity(i),
      m: self.m[i],
    }
  }

  pub fn position(&self, i: usize) -> [f64; 3] {
    [self.x[i], self.y[i], self.z[i]]
  }

  pub fn velocity(&self, i: usize) -> [f64; 3] {
    [self.vx[i], self.vy[i], self.vz[i]]
  }

  pub fn masses(&self) -> &[f64] {
    &self.m
  }

  /// Sum of x + y + z + vx + vy + vz over all particles, in index order.
  pub fn checksum(&self) -> f64 {
    let mut checksum = 0.0;
    for i in 0..self.len() {
      checksum += self.x[i] + self.y[i] + self.z[i] + self.vx[i] + self.vy[i] + self.vz[i];
    }
    checksum
  }

  /// Total linear momentum, sum of m * v.
  pub fn momentum(&self) -> [f64; 3] {
    let mut p = [0.0, 0.0, 0.0];
    for i in 0..self.len() {
      p[0] += self.m[i] * self.vx[i];
      p[1] += self.m[i] * self.vy[i];
      p[2] += self.m[i] * self.vz[i];
    }
    p
  }

  pub fn kinetic_energy(&self) -> f64 {
    let mut ke = 0.0;
    for i in 0..self.len() {
      let v2 = self.vx[i] * self.vx[i] + self.vy[i] * self.vy[i] + self.vz[i] * self.vz[i];
      ke += 0.5 * self.m[i] * v2;
    }
    ke
  }

  /// Softened pair potential, `-m_i m_j / sqrt(r^2 + softening)`.
  pub fn potential_energy(&self, softening: f64) -> f64 {
    let mut pe = 0.0;
    for i in 0..self.len() {
      for j in (i + 1)..self.len() {
        let dx = self.x[j] - self.x[i];
        let dy = self.y[j] - self.y[i];
        let dz = self.z[j] - self.z[i];
        let dist = f64::sqrt(dx * dx + dy * dy + dz * dz + softening);
        pe -= self.m[i] * self.m[j] / dist;
      }
    }
    pe
  }

  pub fn total_energy(&self, softening: f64) -> f64 {
    self.kinetic_energy() + self.potential_energy(softening)
  }

  /// Largest absolute difference over every position and velocity component.
  pub fn max_state_difference(&self, other: &Ensemble) -> f64 {
    let pairs = [
      (&self.x, &other.x),
      (&self.y, &other.y),
      (&self.z, &other.z),
      (&self.vx, &other.vx),
      (&self.vy, &other.vy),
      (&self.vz, &other.vz),
    ];
    let mut max_diff: f64 = 0.0;
    for (a, b) in pairs {
      for (p, q) in a.iter().zip(b.iter()) {
        max_diff = max_diff.max((p - q).abs());
      }
    }
    max_diff
  }
}

pub fn two_bodies() -> Vec<Particle> {
  vec![
    Particle { p: [0.0, 0.0, 0.0], v: [0.0, 0.0, 0.0], m: 1.0 },
    Particle { p: [1.0, 0.0, 0.0], v: [0.0, 1.0, 0.0], m: 1e-20 },
  ]
}
