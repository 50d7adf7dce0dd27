//! Board occupancy ledger.
//!
//! Pure invariant guarding: `0 <= current <= max`. Persistence adapters
//! rebuild the ledger from the board row inside a locked transaction, apply
//! one change, and write the counters back.

use serde::{Deserialize, Serialize};

/// Capacity violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    /// Every slot is already taken.
    #[error("board is full")]
    Full,
    /// No occupied slot is left to release.
    #[error("board has no occupied slot to release")]
    Empty,
    /// Stored counters break the invariant.
    #[error("current occupancy {current} exceeds limit {max}")]
    Inconsistent {
        /// Stored occupancy.
        current: u32,
        /// Stored limit.
        max: u32,
    },
}

/// Current and maximum occupancy of a board.
///
/// # Examples
/// ```
/// use companion::domain::{CapacityError, CapacityLedger};
///
/// let mut ledger = CapacityLedger::new(0, 1).expect("valid counters");
/// ledger.try_occupy().expect("first slot is free");
/// assert_eq!(ledger.try_occupy(), Err(CapacityError::Full));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityLedger {
    current: u32,
    max: u32,
}

impl CapacityLedger {
    /// Build a ledger from stored counters.
    pub fn new(current: u32, max: u32) -> Result<Self, CapacityError> {
        if current > max {
            return Err(CapacityError::Inconsistent { current, max });
        }
        Ok(Self { current, max })
    }

    /// Occupied slots.
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Slot limit.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether no slot is free.
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Take one slot.
    pub fn try_occupy(&mut self) -> Result<(), CapacityError> {
        if self.is_full() {
            return Err(CapacityError::Full);
        }
        self.current += 1;
        Ok(())
    }

    /// Give one slot back.
    pub fn release(&mut self) -> Result<(), CapacityError> {
        if self.current == 0 {
            return Err(CapacityError::Empty);
        }
        self.current -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rejects_counters_above_limit() {
        assert_eq!(
            CapacityLedger::new(3, 2),
            Err(CapacityError::Inconsistent { current: 3, max: 2 })
        );
    }

    #[rstest]
    #[case(0, 3)]
    #[case(1, 1)]
    #[case(4, 5)]
    fn occupancy_never_exceeds_limit(#[case] current: u32, #[case] max: u32) {
        let mut ledger = CapacityLedger::new(current, max).expect("valid counters");
        while ledger.try_occupy().is_ok() {}
        assert_eq!(ledger.current(), max);
        assert!(ledger.is_full());
    }

    #[rstest]
    fn release_frees_a_slot() {
        let mut ledger = CapacityLedger::new(2, 2).expect("valid counters");
        ledger.release().expect("slot released");
        assert_eq!(ledger.current(), 1);
        assert!(!ledger.is_full());
    }

    #[rstest]
    fn release_on_empty_ledger_fails() {
        let mut ledger = CapacityLedger::new(0, 2).expect("valid counters");
        assert_eq!(ledger.release(), Err(CapacityError::Empty));
        assert_eq!(ledger.current(), 0);
    }
}
