//! Capital pool: the one piece of shared mutable state that genuinely needs
//! a lock (per the single-threaded-task-plus-channels model, everything else
//! is owned by exactly one task). Guarded by a single mutex, held only for
//! the scalar debit/credit — never across an `.await`.
//!
//! Invariant (checked on every mutation): `available + committed == total`,
//! and `available >= 0`. A violation is an [`Error::InvariantViolation`],
//! which callers are expected to treat as fatal (see `error::ErrorKind::InvariantViolation`).

use std::sync::Mutex;

use tracing::error;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct Ledger {
    total_sol: f64,
    available_sol: f64,
}

/// Single-writer-at-a-time capital accounting, shared (read+write) across
/// the Strategy Combinator and the Position Manager.
pub struct CapitalPool {
    ledger: Mutex<Ledger>,
}

impl CapitalPool {
    pub fn new(total_sol: f64) -> Self {
        Self { ledger: Mutex::new(Ledger { total_sol, available_sol: total_sol }) }
    }

    pub fn total(&self) -> f64 {
        self.ledger.lock().expect("capital pool mutex poisoned").total_sol
    }

    pub fn available(&self) -> f64 {
        self.ledger.lock().expect("capital pool mutex poisoned").available_sol
    }

    pub fn committed(&self) -> f64 {
        let ledger = self.ledger.lock().expect("capital pool mutex poisoned");
        ledger.total_sol - ledger.available_sol
    }

    /// Commit `amount_sol` of capital to an opening position. Fails closed
    /// (returns the shortfall as `Ok(actual)`) rather than ever letting
    /// `available` go negative.
    pub fn try_debit(&self, amount_sol: f64) -> Result<f64> {
        let mut ledger = self.ledger.lock().expect("capital pool mutex poisoned");
        let actual = amount_sol.min(ledger.available_sol).max(0.0);
        ledger.available_sol -= actual;
        self.check_invariant(&ledger)?;
        Ok(actual)
    }

    /// Release capital back to the pool (position closed, failed, or sized
    /// down after submission). `realized_pnl_sol` may be negative.
    pub fn credit(&self, committed_sol: f64, realized_pnl_sol: f64) -> Result<()> {
        let mut ledger = self.ledger.lock().expect("capital pool mutex poisoned");
        ledger.available_sol += committed_sol + realized_pnl_sol;
        ledger.total_sol += realized_pnl_sol;
        self.check_invariant(&ledger)
    }

    fn check_invariant(&self, ledger: &Ledger) -> Result<()> {
        if ledger.available_sol < -1e-9 {
            error!(available = ledger.available_sol, "capital pool invariant violated");
            return Err(Error::InvariantViolation(format!(
                "capital_pool.available went negative: {:.9}",
                ledger.available_sol
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_never_exceeds_available() {
        let pool = CapitalPool::new(10.0);
        let debited = pool.try_debit(15.0).unwrap();
        assert_eq!(debited, 10.0);
        assert_eq!(pool.available(), 0.0);
    }

    #[test]
    fn credit_restores_capital_and_applies_pnl() {
        let pool = CapitalPool::new(10.0);
        pool.try_debit(4.0).unwrap();
        pool.credit(4.0, 0.5).unwrap();
        assert!((pool.available() - 10.5).abs() < 1e-9);
        assert!((pool.total() - 10.5).abs() < 1e-9);
    }

    #[test]
    fn available_plus_committed_equals_total() {
        let pool = CapitalPool::new(10.0);
        pool.try_debit(3.0).unwrap();
        assert!((pool.available() + pool.committed() - pool.total()).abs() < 1e-9);
    }
}
