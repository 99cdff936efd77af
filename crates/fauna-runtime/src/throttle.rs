//! [`ScanThrottle`] – simulation-time scan rate limiter.
//!
//! The agent loop ticks at the simulation rate, but sensor scans are
//! expensive and only need a coarser cadence. The throttle compares the
//! current simulation time against the time of the last accepted scan; it is
//! a plain comparison, not a scheduler.
//!
//! # Example
//!
//! ```rust
//! use fauna_runtime::throttle::ScanThrottle;
//!
//! let mut throttle = ScanThrottle::new(0.5);
//!
//! assert!(throttle.ready(0.0));  // first call always scans
//! assert!(!throttle.ready(0.2));
//! assert!(throttle.ready(0.5));
//! ```

/// Allows one scan per `interval` seconds of simulation time.
#[derive(Debug, Clone)]
pub struct ScanThrottle {
    interval: f32,
    last: Option<f32>,
}

impl ScanThrottle {
    /// Create a throttle. Negative intervals are treated as zero, which
    /// scans on every tick.
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            last: None,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Return `true` and record `now` if a scan is due.
    ///
    /// A clock that moved backwards (simulation reset) always scans.
    pub fn ready(&mut self, now: f32) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now < last || now - last >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Forget the last scan so the next [`ready`][Self::ready] call fires.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
