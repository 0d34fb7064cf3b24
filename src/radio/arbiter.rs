//! Exclusive radio ownership
//!
//! The CC1101 is the one truly shared mutable resource in the subsystem,
//! and "stop one worker before starting another" is too easy to get
//! wrong as a calling convention. Here the rule is a type: a
//! [`RadioLease`] is required for any chip session, at most one lease
//! exists per arbiter, and a second attempt fails until the first is
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::radio::phy::SubGhzPhy;
use crate::types::RadioError;

struct ArbiterShared<P> {
    phy: Mutex<P>,
    leased: AtomicBool,
}

/// Owner of the physical radio
///
/// Clones share the same underlying chip; the lease flag is common to
/// all of them.
pub struct RadioArbiter<P: SubGhzPhy> {
    shared: Arc<ArbiterShared<P>>,
}

impl<P: SubGhzPhy> Clone for RadioArbiter<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: SubGhzPhy> RadioArbiter<P> {
    /// Wrap a phy in an arbiter
    #[must_use]
    pub fn new(phy: P) -> Self {
        Self {
            shared: Arc::new(ArbiterShared {
                phy: Mutex::new(phy),
                leased: AtomicBool::new(false),
            }),
        }
    }

    /// Attempt to take the exclusive lease
    ///
    /// # Errors
    ///
    /// [`RadioError::Busy`] while another session holds it.
    pub fn try_lease(&self) -> Result<RadioLease<P>, RadioError> {
        if self
            .shared
            .leased
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Ok(RadioLease {
                shared: Arc::clone(&self.shared),
            })
        } else {
            Err(RadioError::Busy)
        }
    }

    /// Whether a lease is currently outstanding
    #[must_use]
    pub fn is_leased(&self) -> bool {
        self.shared.leased.load(Ordering::Acquire)
    }
}

/// Exclusive handle to the radio, released on drop
pub struct RadioLease<P: SubGhzPhy> {
    shared: Arc<ArbiterShared<P>>,
}

impl<P: SubGhzPhy> RadioLease<P> {
    /// Run `op` with exclusive access to the chip
    pub fn with<R>(&self, op: impl FnOnce(&mut P) -> R) -> R {
        // Poisoning means a radio session panicked mid-operation: a
        // firmware defect, fatal by the error taxonomy.
        let mut phy = self.shared.phy.lock().expect("radio mutex poisoned");
        op(&mut phy)
    }
}

impl<P: SubGhzPhy> Drop for RadioLease<P> {
    fn drop(&mut self) {
        self.shared.leased.store(false, Ordering::Release);
    }
}
