//! Errors, faults and halt reasons

use std::fmt;
use thiserror::Error;

/// Result type for host-facing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to whoever is driving the machine
#[derive(Debug, Error)]
pub enum Error {
    #[error("program of {len} bytes does not fit in {capacity} bytes of program memory")]
    ProgramLoadOverflow { len: usize, capacity: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("interpreter thread panicked")]
    ThreadPanicked,
}

/// Fatal conditions. Any of these ends the run until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("illegal opcode {word:#06x} at {addr:#05x}")]
    IllegalOpcode { addr: u16, word: u16 },

    #[error("return with empty call stack at {addr:#05x}")]
    StackUnderflow { addr: u16 },

    #[error("call stack overflow ({depth} frames) at {addr:#05x}")]
    StackOverflow { addr: u16, depth: usize },

    #[error("program counter {pc:#06x} is outside memory")]
    PcOutOfRange { pc: u16 },
}

/// Why a run of the interpreter loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// stop() or reset() was requested
    Reset,
    /// a jump or call targeted its own address; programs use this as "done"
    SelfJump { addr: u16 },
    /// the EXIT (00FD) instruction
    Exit { addr: u16 },
    Fault(Fault),
}

impl Halt {
    pub fn is_fault(&self) -> bool {
        matches!(self, Halt::Fault(_))
    }
}

impl From<Fault> for Halt {
    fn from(fault: Fault) -> Self {
        Halt::Fault(fault)
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Reset => write!(f, "stopped for reset"),
            Halt::SelfJump { addr } => write!(f, "jump to self at {addr:#05x}"),
            Halt::Exit { addr } => write!(f, "EXIT at {addr:#05x}"),
            Halt::Fault(fault) => write!(f, "FATAL: {fault}"),
        }
    }
}
