//! # Admission Control
//!
//! Bounds the number of proof jobs executing at once. A slot is a
//! `tokio::sync::Semaphore` permit: taking one never blocks, and dropping it
//! releases the slot exactly once, whichever thread the job finishes on.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// All job slots are taken. Retry the submission later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("all {max} job slots are busy")]
pub struct Busy {
    /// Configured slot count.
    pub max: usize,
}

/// A held job slot. Released on drop.
#[derive(Debug)]
pub struct JobPermit {
    _slot: OwnedSemaphorePermit,
}

/// Fixed-size pool of job slots.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    max: usize,
}

impl AdmissionController {
    /// A controller with `max` slots.
    pub fn new(max: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Take a slot if one is free.
    pub fn try_admit(&self) -> Result<JobPermit, Busy> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(slot) => Ok(JobPermit { _slot: slot }),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => {
                Err(Busy { max: self.max })
            }
        }
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.max.saturating_sub(self.slots.available_permits())
    }

    /// Configured slot count.
    pub fn max(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_max() {
        let ctl = AdmissionController::new(2);
        let a = ctl.try_admit().unwrap();
        let _b = ctl.try_admit().unwrap();
        assert_eq!(ctl.active(), 2);
        assert_eq!(ctl.try_admit().unwrap_err(), Busy { max: 2 });
        drop(a);
        assert_eq!(ctl.active(), 1);
        assert!(ctl.try_admit().is_ok());
    }

    #[test]
    fn zero_slots_is_always_busy() {
        let ctl = AdmissionController::new(0);
        assert!(ctl.try_admit().is_err());
        assert_eq!(ctl.active(), 0);
    }

    #[test]
    fn permits_release_across_threads() {
        let ctl = AdmissionController::new(4);
        let permits: Vec<_> = (0..4).map(|_| ctl.try_admit().unwrap()).collect();
        let handles: Vec<_> = permits
            .into_iter()
            .map(|p| std::thread::spawn(move || drop(p)))
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ctl.active(), 0);
    }

    #[test]
    fn busy_names_the_bound() {
        assert_eq!(Busy { max: 4 }.to_string(), "all 4 job slots are busy");
    }
}
