//! # registers
//!
//! CHIP-8 programs see:
//!  V0-VE  general purpose, 8 bit
//!  VF     flag output for carry, borrow, shifted-out bit and sprite collision
//!  I      16 bit address register
//!  PC     program counter
//!  stack  return addresses for CALL, plus a stack pointer
//!
//! SUPER-CHIP adds a bank of "RPL user flags" (the HP48 kept them in a
//! hardware register file) which FX75/FX85 copy V registers to and from.

pub const REGISTER_COUNT: usize = 16;
pub const FLAG_REGISTER: usize = 0xf;
pub const FLAG_BANK_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub flags: [u8; FLAG_BANK_SIZE],
    stack: Vec<u16>,
    depth: usize,
}

impl RegisterFile {
    /// fresh registers, execution starting at `pc`, room for `depth` calls
    pub fn new(pc: u16, depth: usize) -> Self {
        RegisterFile {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc,
            flags: [0; FLAG_BANK_SIZE],
            stack: Vec::with_capacity(depth),
            depth,
        }
    }

    /// push a return address; false if the stack is already full
    pub fn push(&mut self, addr: u16) -> bool {
        if self.stack.len() >= self.depth {
            return false;
        }
        self.stack.push(addr);
        true
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.stack.pop()
    }

    /// stack pointer, i.e. number of return addresses held
    pub fn sp(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn stack_depth(&self) -> usize {
        self.depth
    }

    pub fn vf(&self) -> u8 {
        self.v[FLAG_REGISTER]
    }

    pub fn set_vf(&mut self, flag: bool) {
        self.v[FLAG_REGISTER] = flag as u8;
    }
}
