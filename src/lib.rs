pub mod alloc;
pub mod ensemble;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod lcg;
pub mod logging;
pub mod params;

pub use alloc::{ArrayAllocator, BudgetAllocator, SystemAllocator};
pub use ensemble::{Ensemble, Particle};
pub use error::BenchError;
pub use harness::{Phase, Report, RunController};
pub use kernel::{Integrator, Kernel};
pub use lcg::Lcg;
pub use params::SimParams;
