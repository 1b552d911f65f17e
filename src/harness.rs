//! Run controller: initial state, warm-up, timed measurement, checksum.
//!
//! A run moves strictly forward through
//! `Uninitialized -> Initialized -> WarmingUp -> Measuring -> Finalized`.
//! The only branch is allocation failure during initialisation, which parks
//! the controller in `Failed`.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::alloc::ArrayAllocator;
use crate::ensemble::Ensemble;
use crate::error::{BenchError, Result};
use crate::kernel::{Integrator, Kernel};
use crate::params::SimParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    WarmingUp,
    Measuring,
    Finalized,
    Failed,
}

/// The externally visible result of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    pub elapsed_ms: f64,
    pub checksum: f64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "elapsed_ms={:.3} checksum={:.6}", self.elapsed_ms, self.checksum)
    }
}

pub struct RunController<'a> {
    params: SimParams,
    kernel: Kernel,
    threads: usize,
    alloc: &'a dyn ArrayAllocator,
    phase: Phase,
    history: Vec<Phase>,
    state: Option<(Ensemble, Integrator)>,
    elapsed: Option<Duration>,
}

impl<'a> RunController<'a> {
    pub fn new(params: SimParams, alloc: &'a dyn ArrayAllocator) -> Self {
        RunController {
            params,
            kernel: Kernel::Direct,
            threads: 0,
            alloc,
            phase: Phase::Uninitialized,
            history: vec![Phase::Uninitialized],
            state: None,
            elapsed: None,
        }
    }

    /// Choose the force kernel. `threads` sizes the pool for
    /// [`Kernel::Parallel`]; 0 lets rayon decide.
    pub fn with_kernel(mut self, kernel: Kernel, threads: usize) -> Self {
        self.kernel = kernel;
        self.threads = threads;
        self
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// Current ensemble, if the run is between initialisation and
    /// finalisation.
    pub fn ensemble(&self) -> Option<&Ensemble> {
        self.state.as_ref().map(|(e, _)| e)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
        self.history.push(phase);
    }

    fn expect(&self, phase: Phase, action: &'static str) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(BenchError::OutOfOrder { phase: self.phase, action })
        }
    }

    /// Allocate and seed the ensemble and the integrator's scratch buffers.
    pub fn initialize(&mut self) -> Result<()> {
        self.expect(Phase::Uninitialized, "initialize")?;
        let built = self.params.validate().and_then(|()| {
            let ensemble = Ensemble::seeded(self.params.n, self.params.seed, self.alloc)?;
            let integrator = Integrator::new(self.kernel, &self.params, self.threads, self.alloc)?;
            Ok((ensemble, integrator))
        });
        match built {
            Ok(state) => {
                self.state = Some(state);
                self.enter(Phase::Initialized);
                Ok(())
            }
            Err(e) => {
                self.enter(Phase::Failed);
                Err(e)
            }
        }
    }

    /// Untimed steps. They advance the trajectory exactly like timed ones.
    pub fn warm_up(&mut self) -> Result<()> {
        self.expect(Phase::Initialized, "warm up")?;
        self.enter(Phase::WarmingUp);
        let steps = self.params.steps_warmup;
        if let Some((ensemble, integrator)) = self.state.as_mut() {
            integrator.run(ensemble, steps);
        }
        Ok(())
    }

    /// Timed steps. Nothing but the steps sits between the clock reads.
    pub fn measure(&mut self) -> Result<Duration> {
        self.expect(Phase::WarmingUp, "measure")?;
        self.enter(Phase::Measuring);
        let steps = self.params.steps;
        let elapsed = match self.state.as_mut() {
            Some((ensemble, integrator)) => {
                let start = Instant::now();
                integrator.run(ensemble, steps);
                start.elapsed()
            }
            None => Duration::ZERO,
        };
        self.elapsed = Some(elapsed);
        Ok(elapsed)
    }

    /// Reduce the final state to a report and release all storage.
    pub fn finalize(&mut self) -> Result<Report> {
        self.expect(Phase::Measuring, "finalize")?;
        let checksum = self.state.take().map(|(e, _)| e.checksum()).unwrap_or(0.0);
        let elapsed_ms = self.elapsed.unwrap_or_default().as_secs_f64() * 1000.0;
        self.enter(Phase::Finalized);
        let report = Report { elapsed_ms, checksum };
        info!(elapsed_ms, checksum, "run finished");
        Ok(report)
    }

    /// The whole run, start to finish.
    pub fn run(&mut self) -> Result<Report> {
        info!(
            n = self.params.n,
            steps_warmup = self.params.steps_warmup,
            steps = self.params.steps,
            dt = self.params.dt,
            softening = self.params.softening,
            seed = self.params.seed,
            kernel = %self.kernel,
            "starting run"
        );
        self.initialize()?;
        self.warm_up()?;
        self.measure()?;
        self.finalize()
    }
}
