use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// the countdown runs at 60Hz
pub const TICKS_PER_SECOND: u64 = 60;

/// one tick, ~16.67ms
pub const TICK: Duration = Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND);

#[derive(Debug)]
struct Countdown {
    ticks: u8,
    set_at: Instant,
}

/// A 60Hz countdown. Nothing decrements it; the remaining ticks are worked
/// out from wall-clock time whenever it is read.
#[derive(Debug)]
pub struct Timer {
    countdown: Mutex<Countdown>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            countdown: Mutex::new(Countdown {
                ticks: 0,
                set_at: Instant::now(),
            }),
        }
    }

    pub fn set(&self, ticks: u8) {
        self.set_at(ticks, Instant::now());
    }

    /// as `set`, pretending it is `now`
    pub fn set_at(&self, ticks: u8, now: Instant) {
        *self.countdown.lock() = Countdown { ticks, set_at: now };
    }

    pub fn get(&self) -> u8 {
        self.remaining_at(Instant::now())
    }

    /// ticks left at instant `now`; never below zero
    pub fn remaining_at(&self, now: Instant) -> u8 {
        let c = self.countdown.lock();
        let elapsed = now.saturating_duration_since(c.set_at);
        let elapsed_ticks = elapsed.as_nanos() * TICKS_PER_SECOND as u128 / 1_000_000_000;
        (c.ticks as u128).saturating_sub(elapsed_ticks) as u8
    }
}
