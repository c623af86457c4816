//! Pre-call checks shared by every mutating entry point.
//!
//! Two gates apply before any mutation: the global pause switch, and a
//! per-component in-flight marker that rejects a mutating call arriving while
//! another mutating call on the same component is still executing (as happens
//! when an external token ledger re-enters the engine mid-transfer).

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Global halt flag, settable only through emergency governance execution.
#[derive(Debug, Default)]
pub struct PauseSwitch {
    paused: AtomicBool,
}

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Halt all mutating operations system-wide
    pub fn engage(&self) {
        warn!("global pause engaged");
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Lift the halt
    pub fn lift(&self) {
        warn!("global pause lifted");
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Entry guard owned by one logical ledger component.
///
/// `enter` checks the pause switch and then claims the component's single
/// in-flight slot; the returned permit releases the slot on drop. Internal
/// calls between *different* components each pass through their own guard,
/// so a license execution may route a fee through the revenue pool without
/// tripping either marker.
#[derive(Debug)]
pub struct OpGuard {
    pause: Arc<PauseSwitch>,
    in_flight: AtomicBool,
}

impl OpGuard {
    pub fn new(pause: Arc<PauseSwitch>) -> Self {
        Self {
            pause,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Standard entry: rejected while the engine is paused
    pub fn enter(&self, op: &str) -> Result<EntryPermit<'_>> {
        if self.pause.is_paused() {
            return Err(Error::state(format!("{op}: engine is paused")));
        }
        self.claim(op)
    }

    /// Entry that ignores the pause switch. Used by emergency governance so a
    /// tripped pause can still be lifted.
    pub fn enter_bypassing_pause(&self, op: &str) -> Result<EntryPermit<'_>> {
        self.claim(op)
    }

    fn claim(&self, op: &str) -> Result<EntryPermit<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::reentrancy(format!(
                "{op}: call arrived while another operation was in flight"
            )));
        }
        Ok(EntryPermit {
            in_flight: &self.in_flight,
        })
    }
}

/// RAII permit for one in-flight operation
#[derive(Debug)]
pub struct EntryPermit<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for EntryPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}
