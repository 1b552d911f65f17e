//! Direct-summation force kernel and the two-pass explicit time step.
//!
//! One step is three ordered passes over the ensemble:
//!
//! 1. force: for every i, sum `m_j * d / (|d|^2 + softening)^(3/2)` over all
//!    j != i, reading positions and masses only;
//! 2. velocity: `v_i += dt * f_i` for all i;
//! 3. position: `x_i += dt * v_i` for all i, using the new velocities.
//!
//! A pass finishes for every particle before the next one starts. Fusing
//! passes changes the result.

use std::ops::Range;

use rayon::prelude::*;
use tracing::debug;

use crate::alloc::ArrayAllocator;
use crate::ensemble::Ensemble;
use crate::error::Result;
use crate::params::SimParams;

/// How the force pass visits pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Kernel {
    /// i ascending, j ascending skipping i. The reference ordering.
    Direct,
    /// Same as `Direct` with j descending.
    Reverse,
    /// Each pair once (j > i), applying the reaction to j immediately. The
    /// terms of every row still arrive in ascending j, so the sums match
    /// `Direct` exactly with half the square roots.
    Symmetric,
    /// `Direct`, with the i loop split across a rayon pool.
    Parallel,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [Kernel::Direct, Kernel::Reverse, Kernel::Symmetric, Kernel::Parallel];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Direct => "direct",
            Kernel::Reverse => "reverse",
            Kernel::Symmetric => "symmetric",
            Kernel::Parallel => "parallel",
        }
    }

    /// True when the kernel performs the reference arithmetic sequence and
    /// must reproduce `Direct` bit for bit.
    pub fn is_bit_exact(self) -> bool {
        !matches!(self, Kernel::Reverse)
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Read-only view of the force sources for one step.
#[derive(Clone, Copy)]
struct Sources<'a> {
    x: &'a [f64],
    y: &'a [f64],
    z: &'a [f64],
    m: &'a [f64],
    softening: f64,
}

impl<'a> Sources<'a> {
    #[inline(always)]
    fn lanes(self, r: Range<usize>) -> impl DoubleEndedIterator<Item = (f64, f64, f64, f64)> + 'a {
        let (x, y, z, m): (&'a [f64], &'a [f64], &'a [f64], &'a [f64]) = (self.x, self.y, self.z, self.m);
        x[r.clone()]
            .iter()
            .zip(&y[r.clone()])
            .zip(&z[r.clone()])
            .zip(&m[r])
            .map(|(((&x, &y), &z), &m)| (x, y, z, m))
    }

    #[inline(always)]
    fn origin(&self, i: usize) -> [f64; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Force on i, j ascending.
    #[inline(always)]
    fn ascending(&self, i: usize) -> [f64; 3] {
        let n = self.m.len();
        let p = self.origin(i);
        let mut acc = [0.0, 0.0, 0.0];
        for (xj, yj, zj, mj) in self.lanes(0..i) {
            interact(&mut acc, p, xj, yj, zj, mj, self.softening);
        }
        for (xj, yj, zj, mj) in self.lanes(i + 1..n) {
            interact(&mut acc, p, xj, yj, zj, mj, self.softening);
        }
        acc
    }

    /// Force on i, j descending.
    #[inline(always)]
    fn descending(&self, i: usize) -> [f64; 3] {
        let n = self.m.len();
        let p = self.origin(i);
        let mut acc = [0.0, 0.0, 0.0];
        for (xj, yj, zj, mj) in self.lanes(i + 1..n).rev() {
            interact(&mut acc, p, xj, yj, zj, mj, self.softening);
        }
        for (xj, yj, zj, mj) in self.lanes(0..i).rev() {
            interact(&mut acc, p, xj, yj, zj, mj, self.softening);
        }
        acc
    }
}

#[inline(always)]
fn interact(acc: &mut [f64; 3], p: [f64; 3], xj: f64, yj: f64, zj: f64, mj: f64, softening: f64) {
    let dx = xj - p[0];
    let dy = yj - p[1];
    let dz = zj - p[2];
    let dist2 = dx * dx + dy * dy + dz * dz + softening;
    let inv = 1.0 / dist2.sqrt();
    let inv3 = inv * inv * inv;
    let s = mj * inv3;
    acc[0] += dx * s;
    acc[1] += dy * s;
    acc[2] += dz * s;
}

/// Advances an ensemble of fixed size. Owns the per-step force buffers so
/// stepping never allocates.
pub struct Integrator {
    kernel: Kernel,
    dt: f64,
    softening: f64,
    fx: Vec<f64>,
    fy: Vec<f64>,
    fz: Vec<f64>,
    pool: Option<rayon::ThreadPool>,
}

impl Integrator {
    /// `threads` is only used by [`Kernel::Parallel`]; 0 lets rayon choose.
    pub fn new(kernel: Kernel, params: &SimParams, threads: usize, alloc: &dyn ArrayAllocator) -> Result<Self> {
        let pool = match kernel {
            Kernel::Parallel => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
                debug!(threads = pool.current_num_threads(), "worker pool ready");
                Some(pool)
            }
            _ => None,
        };
        Ok(Integrator {
            kernel,
            dt: params.dt,
            softening: params.softening,
            fx: alloc.zeroed("fx", params.n)?,
            fy: alloc.zeroed("fy", params.n)?,
            fz: alloc.zeroed("fz", params.n)?,
            pool,
        })
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Run `count` steps.
    pub fn run(&mut self, ensemble: &mut Ensemble, count: usize) {
        for _ in 0..count {
            self.step(ensemble);
        }
    }

    /// One full step.
    ///
    /// Panics if `ensemble` does not have the particle count the integrator
    /// was built for.
    pub fn step(&mut self, ensemble: &mut Ensemble) {
        assert_eq!(
            ensemble.len(),
            self.fx.len(),
            "integrator built for {} particles, stepped with {}",
            self.fx.len(),
            ensemble.len()
        );
        self.accumulate_forces(ensemble);
        self.update_velocities(ensemble);
        self.update_positions(ensemble);
    }

    fn accumulate_forces(&mut self, e: &Ensemble) {
        let src = Sources {
            x: &e.x,
            y: &e.y,
            z: &e.z,
            m: &e.m,
            softening: self.softening,
        };
        let (fx, fy, fz) = (&mut self.fx, &mut self.fy, &mut self.fz);
        match self.kernel {
            Kernel::Direct => {
                for i in 0..fx.len() {
                    let f = src.ascending(i);
                    fx[i] = f[0];
                    fy[i] = f[1];
                    fz[i] = f[2];
                }
            }
            Kernel::Reverse => {
                for i in 0..fx.len() {
                    let f = src.descending(i);
                    fx[i] = f[0];
                    fy[i] = f[1];
                    fz[i] = f[2];
                }
            }
            Kernel::Symmetric => symmetric_forces(&src, fx, fy, fz),
            Kernel::Parallel => {
                let mut work = || {
                    fx.par_iter_mut()
                        .zip(fy.par_iter_mut())
                        .zip(fz.par_iter_mut())
                        .enumerate()
                        .for_each(|(i, ((fxi, fyi), fzi))| {
                            let f = src.ascending(i);
                            *fxi = f[0];
                            *fyi = f[1];
                            *fzi = f[2];
                        })
                };
                match &self.pool {
                    Some(pool) => pool.install(work),
                    None => work(),
                }
            }
        }
    }

    fn update_velocities(&self, e: &mut Ensemble) {
        let dt = self.dt;
        for (v, f) in e.vx.iter_mut().zip(&self.fx) {
            *v += dt * f;
        }
        for (v, f) in e.vy.iter_mut().zip(&self.fy) {
            *v += dt * f;
        }
        for (v, f) in e.vz.iter_mut().zip(&self.fz) {
            *v += dt * f;
        }
    }

    fn update_positions(&self, e: &mut Ensemble) {
        let dt = self.dt;
        for (p, v) in e.x.iter_mut().zip(&e.vx) {
            *p += dt * v;
        }
        for (p, v) in e.y.iter_mut().zip(&e.vy) {
            *p += dt * v;
        }
        for (p, v) in e.z.iter_mut().zip(&e.vz) {
            *p += dt * v;
        }
    }
}

/// Newton's third law over j > i. Each pair is evaluated once; the reaction
/// lands in j's buffer before j's own row is summed.
fn symmetric_forces(src: &Sources<'_>, fx: &mut [f64], fy: &mut [f64], fz: &mut [f64]) {
    let n = src.m.len();
    fx.fill(0.0);
    fy.fill(0.0);
    fz.fill(0.0);
    for i in 0..n {
        let p = src.origin(i);
        let mi = src.m[i];
        let mut fxi = fx[i];
        let mut fyi = fy[i];
        let mut fzi = fz[i];
        for j in (i + 1)..n {
            let dx = src.x[j] - p[0];
            let dy = src.y[j] - p[1];
            let dz = src.z[j] - p[2];
            let dist2 = dx * dx + dy * dy + dz * dz + src.softening;
            let inv = 1.0 / dist2.sqrt();
            let inv3 = inv * inv * inv;

            let s_i = src.m[j] * inv3;
            let s_j = mi * inv3;

            fxi += dx * s_i;
            fyi += dy * s_i;
            fzi += dz * s_i;

            fx[j] -= dx * s_j;
            fy[j] -= dy * s_j;
            fz[j] -= dz * s_j;
        }
        fx[i] = fxi;
        fy[i] = fyi;
        fz[i] = fzi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{BudgetAllocator, SystemAllocator};
    use crate::ensemble::{two_bodies, Ensemble, Particle};

    fn small() -> SimParams {
        SimParams::reference().with_n(64).with_steps(0, 10)
    }

    fn evolve(kernel: Kernel, params: &SimParams, steps: usize) -> Ensemble {
        let mut e = Ensemble::seeded(params.n, params.seed, &SystemAllocator).unwrap();
        let mut integrator = Integrator::new(kernel, params, 2, &SystemAllocator).unwrap();
        integrator.run(&mut e, steps);
        e
    }

    #[test]
    fn direct_matches_reference_checksum() {
        let p = small();
        let e = evolve(Kernel::Direct, &p, p.steps);
        assert_eq!(e.checksum(), -25.104852246845763);
    }

    #[test]
    fn single_step_two_particles() {
        let p = SimParams::reference().with_n(2).with_steps(0, 1);
        let e = evolve(Kernel::Direct, &p, 1);
        assert_eq!(e.checksum(), 0.54922508807171477);
    }

    #[test]
    fn lone_particle_drifts_freely() {
        let p = SimParams::reference().with_n(1);
        let mut e = Ensemble::seeded(1, 1, &SystemAllocator).unwrap();
        let before = e.particle(0);
        let mut integrator = Integrator::new(Kernel::Direct, &p, 0, &SystemAllocator).unwrap();
        integrator.run(&mut e, 3);
        let after = e.particle(0);
        assert_eq!(after.v, before.v);
        let mut x = before.p[0];
        for _ in 0..3 {
            x += p.dt * before.v[0];
        }
        assert_eq!(after.p[0], x);
    }

    #[test]
    fn parallel_is_bit_identical_to_direct() {
        let p = small();
        let a = evolve(Kernel::Direct, &p, p.steps);
        let b = evolve(Kernel::Parallel, &p, p.steps);
        assert_eq!(a.max_state_difference(&b), 0.0);
        assert_eq!(a.checksum().to_bits(), b.checksum().to_bits());
    }

    #[test]
    fn reversed_inner_order_changes_only_low_digits() {
        let p = SimParams::reference().with_n(100);
        let a = evolve(Kernel::Direct, &p, 50);
        let b = evolve(Kernel::Reverse, &p, 50);
        let (ca, cb) = (a.checksum(), b.checksum());
        assert_ne!(ca.to_bits(), cb.to_bits(), "summation order had no effect");
        assert!(((ca - cb) / ca).abs() < 1e-6, "{} vs {}", ca, cb);
    }

    #[test]
    fn symmetric_is_bit_identical_to_direct() {
        let p = small();
        let a = evolve(Kernel::Direct, &p, p.steps);
        let b = evolve(Kernel::Symmetric, &p, p.steps);
        assert_eq!(a.max_state_difference(&b), 0.0);
        assert_eq!(b.checksum(), -25.104852246845763);
    }

    #[test]
    fn momentum_drift_is_bounded() {
        let p = SimParams::reference().with_n(100);
        for kernel in Kernel::ALL {
            let start = Ensemble::seeded(p.n, p.seed, &SystemAllocator).unwrap().momentum();
            let end = evolve(kernel, &p, 50).momentum();
            for d in 0..3 {
                assert!(
                    (end[d] - start[d]).abs() < 1e-9,
                    "{} momentum[{}] drifted {} -> {}",
                    kernel,
                    d,
                    start[d],
                    end[d]
                );
            }
        }
    }

    #[test]
    fn coincident_particles_stay_finite() {
        let parts = [
            Particle { p: [0.25, 0.25, 0.25], v: [0.0, 0.0, 0.0], m: 1.0 },
            Particle { p: [0.25, 0.25, 0.25], v: [0.0, 0.0, 0.0], m: 1.0 },
        ];
        let p = SimParams::reference().with_n(2);
        let mut e = Ensemble::from_particles(&parts, &SystemAllocator).unwrap();
        let mut integrator = Integrator::new(Kernel::Direct, &p, 0, &SystemAllocator).unwrap();
        integrator.run(&mut e, 5);
        assert!(e.checksum().is_finite());
    }

    #[test]
    fn heavy_body_pulls_light_body() {
        let p = SimParams::reference().with_n(2).with_softening(1e-12);
        let mut e = Ensemble::from_particles(&two_bodies(), &SystemAllocator).unwrap();
        let mut integrator = Integrator::new(Kernel::Direct, &p, 0, &SystemAllocator).unwrap();
        integrator.step(&mut e);
        // Unit mass at unit distance: acceleration of the light body is ~ -x.
        let v = e.velocity(1);
        assert!((v[0] + p.dt).abs() < 1e-9, "vx = {}", v[0]);
        assert_eq!(v[1], 1.0);
    }

    #[test]
    fn scratch_buffers_go_through_allocator() {
        let p = SimParams::reference().with_n(8);
        let alloc = BudgetAllocator::new(2 * 8 * 8);
        assert!(Integrator::new(Kernel::Direct, &p, 0, &alloc).is_err());
    }

    #[test]
    #[should_panic(expected = "integrator built for")]
    fn size_mismatch_is_rejected() {
        let p = SimParams::reference().with_n(4);
        let mut e = Ensemble::seeded(5, 1, &SystemAllocator).unwrap();
        let mut integrator = Integrator::new(Kernel::Direct, &p, 0, &SystemAllocator).unwrap();
        integrator.step(&mut e);
    }
}
