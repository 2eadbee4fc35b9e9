//! Blocking delays.
//!
//! The LCD drivers never poll a busy flag, they wait fixed worst-case durations instead. The waiting
//! itself goes through the [Delay] trait so a backend that doesn't touch real hardware (like
//! [TraceDelay](crate::trace::TraceDelay)) can record the waits instead of sleeping.

use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A blocking delay provider.
pub trait Delay: Debug {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// [Delay] implementation that puts the current thread to sleep.
///
/// The OS scheduler may oversleep, which is fine, as every delay is a minimum.
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}
