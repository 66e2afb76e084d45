//! The single mutual-exclusion gate in front of the modem driver.
//!
//! Serial modems handle one command at a time, so every driver operation goes
//! through this gate and holds it for the whole logical operation (a complete
//! store scan, a whole send batch), not per command.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use crate::driver::ModemDriver;
use crate::error::{GateError, Result};

/// Exclusive access to the driver for as long as the guard lives.
pub type DriverGuard<'a> = MutexGuard<'a, Box<dyn ModemDriver>>;

/// Owner of the modem driver.
pub struct ModemGate {
    driver: Mutex<Box<dyn ModemDriver>>,
    wait: Option<Duration>,
}

impl ModemGate {
    /// Gate that waits indefinitely for the driver.
    pub fn new(driver: impl ModemDriver + 'static) -> Self {
        Self {
            driver: Mutex::new(Box::new(driver)),
            wait: None,
        }
    }

    /// Gate whose [`acquire`](Self::acquire) gives up after `wait`.
    pub fn with_wait(driver: impl ModemDriver + 'static, wait: Option<Duration>) -> Self {
        Self {
            driver: Mutex::new(Box::new(driver)),
            wait,
        }
    }

    /// Block until the driver is free.
    pub fn lock(&self) -> DriverGuard<'_> {
        self.driver.lock()
    }

    /// Bounded-wait acquisition.
    pub fn try_lock_for(&self, wait: Duration) -> Result<DriverGuard<'_>> {
        self.driver.try_lock_for(wait).ok_or_else(|| {
            warn!(?wait, "Modem gate busy");
            GateError::GateTimeout(wait)
        })
    }

    /// Acquire according to the configured policy.
    pub fn acquire(&self) -> Result<DriverGuard<'_>> {
        match self.wait {
            Some(wait) => self.try_lock_for(wait),
            None => Ok(self.lock()),
        }
    }
}
