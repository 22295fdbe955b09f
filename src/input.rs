use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// the COSMAC VIP hex keypad has 16 keys, 0x0-0xf
pub const KEY_COUNT: usize = 16;

/// what a blocking wait found when it returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Proceed,
    Reset,
}

#[derive(Debug, Default)]
struct KeyState {
    keys: [bool; KEY_COUNT],
    reset: bool,
    pause: bool,
    fast_forward: bool,
}

impl KeyState {
    fn highest_pressed(&self) -> Option<u8> {
        (0..KEY_COUNT).rev().find(|&k| self.keys[k]).map(|k| k as u8)
    }
}

/// Keypad and control signals, written by whoever drives the machine and
/// read by the interpreter thread. Every blocking wait the interpreter does
/// parks on the one condition variable here, so a reset request wakes all
/// of them.
#[derive(Debug, Default)]
pub struct InputState {
    state: Mutex<KeyState>,
    signal: Condvar,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// press a key; wakes an interpreter waiting for one
    pub fn key_down(&self, key: u8) {
        let mut s = self.state.lock();
        s.keys[key as usize & 0xf] = true;
        self.signal.notify_all();
    }

    pub fn key_up(&self, key: u8) {
        self.state.lock().keys[key as usize & 0xf] = false;
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.state.lock().keys[key as usize & 0xf]
    }

    /// highest numbered key currently held down
    pub fn highest_pressed(&self) -> Option<u8> {
        self.state.lock().highest_pressed()
    }

    pub fn release_all(&self) {
        self.state.lock().keys = [false; KEY_COUNT];
    }

    /// ask the interpreter to stop, interrupting any sleep or wait
    pub fn request_reset(&self) {
        let mut s = self.state.lock();
        s.reset = true;
        self.signal.notify_all();
    }

    pub fn clear_reset(&self) {
        self.state.lock().reset = false;
    }

    pub fn reset_requested(&self) -> bool {
        self.state.lock().reset
    }

    pub fn pause(&self) {
        self.state.lock().pause = true;
    }

    pub fn resume(&self) {
        let mut s = self.state.lock();
        s.pause = false;
        self.signal.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().pause
    }

    pub fn set_fast_forward(&self, on: bool) {
        self.state.lock().fast_forward = on;
    }

    pub fn fast_forward(&self) -> bool {
        self.state.lock().fast_forward
    }

    /// sleep between instructions, picking the period by the fast-forward
    /// flag; returns early only for a reset
    pub(crate) fn throttle(&self, normal: Duration, fast: Duration) -> Control {
        let mut s = self.state.lock();
        let period = if s.fast_forward { fast } else { normal };
        let deadline = Instant::now() + period;
        while !s.reset {
            if self.signal.wait_until(&mut s, deadline).timed_out() {
                break;
            }
        }
        if s.reset {
            Control::Reset
        } else {
            Control::Proceed
        }
    }

    /// park until resumed; a wakeup with pause still set parks again
    pub(crate) fn wait_while_paused(&self) -> Control {
        let mut s = self.state.lock();
        while s.pause && !s.reset {
            self.signal.wait(&mut s);
        }
        if s.reset {
            Control::Reset
        } else {
            Control::Proceed
        }
    }

    /// park until some key is down and return the highest one; None if a
    /// reset arrived first
    pub(crate) fn wait_for_key(&self) -> Option<u8> {
        let mut s = self.state.lock();
        loop {
            if s.reset {
                return None;
            }
            if let Some(key) = s.highest_pressed() {
                return Some(key);
            }
            self.signal.wait(&mut s);
        }
    }
}
