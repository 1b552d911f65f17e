//! Fallible allocation of the `f64` backing arrays.
//!
//! Every array the simulation touches goes through an [`ArrayAllocator`], so
//! exhaustion is observable as [`BenchError::ResourceExhaustion`] rather than
//! an abort, and tests can inject failures.

use std::cell::Cell;
use std::collections::TryReserveError;

use crate::error::{BenchError, Result};

pub trait ArrayAllocator {
  /// Reserve exactly `len` elements. The returned vector is empty.
  fn reserve(&self, len: usize) -> std::result::Result<Vec<f64>, TryReserveError>;

  /// Allocate a zero-filled array of length `len`, tagged with `array` for
  /// the error message.
  fn zeroed(&self, array: &'static str, len: usize) -> Result<Vec<f64>> {
    let mut v = self
      .reserve(len)
      .map_err(|source| BenchError::ResourceExhaustion { array, len, source })?;
    v.resize(len, 0.0);
    Ok(v)
  }
}

/// Plain heap allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl ArrayAllocator for SystemAllocator {
  fn reserve(&self, len: usize) -> std::result::Result<Vec<f64>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    Ok(v)
  }
}

/// Heap allocation capped by a byte budget shared across all arrays it hands
/// out. Once the budget is spent every further request fails.
#[derive(Debug)]
pub struct BudgetAllocator {
  remaining: Cell<usize>,
}

impl BudgetAllocator {
  pub fn new(bytes: usize) -> Self {
    BudgetAllocator { remaining: Cell::new(bytes) }
  }

  pub fn remaining(&self) -> usize {
    self.remaining.get()
  }
}

impl ArrayAllocator for BudgetAllocator {
  fn reserve(&self, len: usize) -> std::result::Result<Vec<f64>, TryReserveError> {
    let bytes = len.checked_mul(std::mem::size_of::<f64>());
    match bytes {
      Some(b) if b <= self.remaining.get() => {
        let v = SystemAllocator.reserve(len)?;
        self.remaining.set(self.remaining.get() - b);
        Ok(v)
      }
      _ => Err(exhausted()),
    }
  }
}

/// A real `TryReserveError`. It has no public constructor, so ask the
/// standard library for one by requesting more than `isize::MAX` bytes.
fn exhausted() -> TryReserveError {
  match Vec::<f64>::new().try_reserve_exact(usize::MAX) {
    Err(e) => e,
    Ok(()) => unreachable!("reserving usize::MAX f64 elements cannot succeed"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn system_allocator_zero_fills() {
    let v = SystemAllocator.zeroed("x", 17).unwrap();
    assert_eq!(v.len(), 17);
    assert!(v.iter().all(|&x| x == 0.0));
  }

  #[test]
  fn system_allocator_reports_capacity_overflow() {
    let err = SystemAllocator.zeroed("m", usize::MAX).unwrap_err();
    match err {
      BenchError::ResourceExhaustion { array, len, .. } => {
        assert_eq!(array, "m");
        assert_eq!(len, usize::MAX);
      }
      other => panic!("unexpected error {:?}", other),
    }
  }

  #[test]
  fn budget_is_shared_between_arrays() {
    let alloc = BudgetAllocator::new(10 * 8);
    assert!(alloc.zeroed("x", 6).is_ok());
    assert_eq!(alloc.remaining(), 4 * 8);
    assert!(alloc.zeroed("y", 5).is_err());
    assert!(alloc.zeroed("y", 4).is_ok());
    assert_eq!(alloc.remaining(), 0);
  }

  #[test]
  fn failed_request_does_not_spend_budget() {
    let alloc = BudgetAllocator::new(16);
    assert!(alloc.zeroed("x", 3).is_err());
    assert_eq!(alloc.remaining(), 16);
  }

  #[test]
  fn zero_budget_still_allows_empty_arrays() {
    let alloc = BudgetAllocator::new(0);
    assert_eq!(alloc.zeroed("x", 0).unwrap().len(), 0);
  }
}
