//! Wall-clock access for the scheduler and the aggregator.

use core::time::Duration;
use oscreplay_proto::Timetag;

/// A source of the current time, able to wait.
///
/// Tests substitute a clock that only advances when slept on, which makes
/// playback timelines exact.
pub trait Clock {
    fn now(&self) -> Timetag;

    /// Blocks for (at least, best effort) `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// The system's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline(always)]
    fn now(&self) -> Timetag {
        Timetag::now()
    }

    #[inline(always)]
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    #[inline(always)]
    fn now(&self) -> Timetag {
        (**self).now()
    }

    #[inline(always)]
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}
