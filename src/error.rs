use std::collections::TryReserveError;

use thiserror::Error;

use crate::harness::Phase;

#[derive(Debug, Error)]
pub enum BenchError {
    /// A backing array could not be allocated. Fatal, nothing is reported.
    #[error("allocation failed for `{array}` ({len} elements)")]
    ResourceExhaustion {
        array: &'static str,
        len: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A run phase was requested out of order.
    #[error("cannot {action} while {phase:?}")]
    OutOfOrder { phase: Phase, action: &'static str },
}

impl BenchError {
    /// Process exit status for this failure. Every failure aborts the run
    /// before a report exists, so they all share status 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
