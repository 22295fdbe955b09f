use std::time::Duration;

/// nominal sleep between instructions; a little over 600 instructions/s
pub const DEFAULT_CYCLE_PERIOD: Duration = Duration::from_micros(1500);

/// sleep between instructions while fast-forwarding
pub const DEFAULT_FAST_FORWARD_PERIOD: Duration = Duration::from_nanos(100);

/// the COSMAC VIP had room for 12 return addresses and SUPER-CHIP 16; real
/// programs written for later interpreters go deeper than either
pub const DEFAULT_STACK_DEPTH: usize = 64;

/// Tunables for a machine run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub cycle_period: Duration,
    pub fast_forward_period: Duration,
    pub stack_depth: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            cycle_period: DEFAULT_CYCLE_PERIOD,
            fast_forward_period: DEFAULT_FAST_FORWARD_PERIOD,
            stack_depth: DEFAULT_STACK_DEPTH,
        }
    }
}

impl MachineConfig {
    pub fn with_cycle_period(mut self, period: Duration) -> Self {
        self.cycle_period = period;
        self
    }

    pub fn with_fast_forward_period(mut self, period: Duration) -> Self {
        self.fast_forward_period = period;
        self
    }

    /// a depth of zero would make every CALL fatal, so it is raised to one
    pub fn with_stack_depth(mut self, depth: usize) -> Self {
        self.stack_depth = depth.max(1);
        self
    }
}
