//! # interpreter
//!
//! One interpreter owns one run: a fresh register file and the memory image
//! it was handed. Nothing else touches either until the run is over. Everything it
//! shares with other threads (display, keypad, timers, run status) lives in
//! `Peripherals`.
//!
//! Each cycle of `run()`:
//!  1. sleep for the cycle period (much less when fast-forwarding); a reset
//!     request cuts the sleep short
//!  2. reset requested => stop
//!  3. paused => park until resumed
//!  4. fetch the word at PC, PC += 2, decode, execute
use crate::config::MachineConfig;
use crate::display::Resolution;
use crate::error::{Fault, Halt};
use crate::input::Control;
use crate::instruction::{AluOp, Instruction};
use crate::machine::{Peripherals, RunState};
use crate::memory::{
    MemoryImage, MemoryMap, BIG_FONT_ADDR, BIG_FONT_GLYPH_BYTES, FONT_ADDR, FONT_GLYPH_BYTES,
    PROGRAM_ADDR, RAM_SIZE_BYTES,
};
use crate::registers::{RegisterFile, FLAG_REGISTER};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// the largest sprite is 16x16, two bytes a row; DXY0 draws SUPER-CHIP's
/// 16 rows, not 8
const MAX_SPRITE_BYTES: usize = 32;

/// what a single step did to the flow of the program
pub type Step = Result<Option<Halt>, Fault>;

pub struct Interpreter {
    regs: RegisterFile,
    memory: MemoryImage,
    io: Arc<Peripherals>,
    config: MachineConfig,
    rng: StdRng,
    op_count: u64,
}

impl Interpreter {
    pub fn new(memory: MemoryImage, config: MachineConfig, io: Arc<Peripherals>) -> Self {
        Interpreter {
            regs: RegisterFile::new(PROGRAM_ADDR, config.stack_depth),
            memory,
            io,
            config,
            rng: StdRng::from_entropy(),
            op_count: 0,
        }
    }

    /// fix the random sequence, for repeatable runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// give back the memory, with whatever the program wrote to it
    pub fn into_memory(self) -> MemoryImage {
        self.memory
    }

    /// instructions executed so far
    pub fn op_count(&self) -> u64 {
        self.op_count
    }

    /// the throttled main loop; returns once the run is over
    pub fn run(&mut self) -> Halt {
        let started = Instant::now();
        info!("running from {:#05x}", self.regs.pc);
        let halt = self.run_loop();
        self.io.publish(&self.regs);

        let elapsed = started.elapsed();
        info!("finished at PC {:#05x}: {}", self.regs.pc, halt);
        info!(
            "executed {} ops in {}ms ({} ops/s)",
            self.op_count,
            elapsed.as_millis(),
            (self.op_count as f64 / elapsed.as_secs_f64().max(1e-6)) as u64
        );
        halt
    }

    fn run_loop(&mut self) -> Halt {
        loop {
            let throttle = self
                .io
                .input
                .throttle(self.config.cycle_period, self.config.fast_forward_period);
            if throttle == Control::Reset {
                return Halt::Reset;
            }

            if self.io.input.is_paused() {
                debug!("waiting due to pause at {:#05x}", self.regs.pc);
                self.io.publish_as(RunState::Paused, &self.regs);
                if self.io.input.wait_while_paused() == Control::Reset {
                    return Halt::Reset;
                }
                debug!("restarting after pause");
                self.io.set_state(RunState::Running);
            }

            match self.step() {
                Ok(None) => {}
                Ok(Some(halt)) => return halt,
                Err(fault) => {
                    error!("FATAL: {}", fault);
                    return Halt::Fault(fault);
                }
            }
        }
    }

    /// fetch, decode and execute one instruction, with no throttling
    pub fn step(&mut self) -> Step {
        let addr = self.regs.pc;
        if addr as usize + 1 >= RAM_SIZE_BYTES {
            return Err(Fault::PcOutOfRange { pc: addr });
        }
        let word = self.memory.get_word(addr);
        self.regs.pc = addr + 2;
        self.op_count += 1;

        let ins = Instruction::decode(word).ok_or(Fault::IllegalOpcode { addr, word })?;
        trace!("{:#05x}: {:04x}  {}", addr, word, ins);
        self.execute(addr, ins)
    }

    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.regs.pc = self.regs.pc.wrapping_add(2);
        }
    }

    fn execute(&mut self, addr: u16, ins: Instruction) -> Step {
        use Instruction::*;
        let regs = &mut self.regs;
        match ins {
            Clear => self.io.display.clear(),
            Return => {
                regs.pc = regs.pop().ok_or(Fault::StackUnderflow { addr })?;
            }
            ScrollDown(n) => self.io.display.scroll_down(n as usize),
            ScrollUp(n) => self.io.display.scroll_up(n as usize),
            ScrollRight => self.io.display.scroll_right(),
            ScrollLeft => self.io.display.scroll_left(),
            Exit => return Ok(Some(Halt::Exit { addr })),
            LowRes => self.io.display.set_resolution(Resolution::Low),
            HighRes => self.io.display.set_resolution(Resolution::High),
            // jumping to yourself would spin forever; programs do it on purpose
            // to say they're done
            Jump(target) | Call(target) if target == addr => {
                return Ok(Some(Halt::SelfJump { addr }));
            }
            Jump(target) => regs.pc = target,
            Call(target) => {
                if !regs.push(regs.pc) {
                    return Err(Fault::StackOverflow {
                        addr,
                        depth: regs.stack_depth(),
                    });
                }
                regs.pc = target;
            }
            SkipEqImm(x, nn) => {
                let c = regs.v[x] == nn;
                self.skip_if(c);
            }
            SkipNeImm(x, nn) => {
                let c = regs.v[x] != nn;
                self.skip_if(c);
            }
            SkipEqReg(x, y) => {
                let c = regs.v[x] == regs.v[y];
                self.skip_if(c);
            }
            SkipNeReg(x, y) => {
                let c = regs.v[x] != regs.v[y];
                self.skip_if(c);
            }
            LoadImm(x, nn) => regs.v[x] = nn,
            AddImm(x, nn) => {
                let (sum, carry) = regs.v[x].overflowing_add(nn);
                regs.v[x] = sum;
                regs.set_vf(carry);
            }
            Alu(op, x, y) => alu(regs, op, x, y),
            LoadI(nnn) => regs.i = nnn,
            JumpV0(nnn) => regs.pc = regs.v[0] as u16 + nnn,
            Random(x, nn) => regs.v[x] = self.rng.gen_range(0..=nn),
            Draw(x, y, n) => {
                let (len, bytes_per_row) = if n == 0 {
                    (MAX_SPRITE_BYTES, 2)
                } else {
                    (n as usize, 1)
                };
                let mut sprite = [0u8; MAX_SPRITE_BYTES];
                self.memory.read_into(regs.i, &mut sprite[..len]);
                let hit = self
                    .io
                    .display
                    .draw(regs.v[x], regs.v[y], &sprite[..len], bytes_per_row);
                regs.set_vf(hit);
            }
            SkipKey(x) => {
                let c = self.io.input.is_pressed(regs.v[x]);
                self.skip_if(c);
            }
            SkipNoKey(x) => {
                let c = !self.io.input.is_pressed(regs.v[x]);
                self.skip_if(c);
            }
            GetDelay(x) => regs.v[x] = self.io.delay_timer.get(),
            WaitKey(x) => {
                self.io.set_state(RunState::AwaitingKey);
                debug!("waiting for a key at {:#05x}", addr);
                match self.io.input.wait_for_key() {
                    Some(key) => {
                        debug!("waited and got key {:#x}", key);
                        self.regs.v[x] = key;
                        self.io.set_state(RunState::Running);
                    }
                    None => return Ok(Some(Halt::Reset)),
                }
            }
            SetDelay(x) => self.io.delay_timer.set(regs.v[x]),
            SetSound(x) => self.io.sound_timer.set(regs.v[x]),
            AddI(x) => regs.i = regs.i.wrapping_add(regs.v[x] as u16),
            Glyph(x) => regs.i = FONT_ADDR + (regs.v[x] & 0xf) as u16 * FONT_GLYPH_BYTES,
            BigGlyph(x) => {
                regs.i = BIG_FONT_ADDR + (regs.v[x] % 10) as u16 * BIG_FONT_GLYPH_BYTES
            }
            Bcd(x) => {
                let v = regs.v[x];
                self.memory.write_from(regs.i, &[v / 100, v / 10 % 10, v % 10]);
            }
            Store(x) => self.memory.write_from(regs.i, &regs.v[..=x]),
            Load(x) => {
                let i = regs.i;
                self.memory.read_into(i, &mut regs.v[..=x]);
            }
            StoreFlags(x) => regs.flags[..=x].copy_from_slice(&regs.v[..=x]),
            LoadFlags(x) => {
                let flags = regs.flags;
                regs.v[..=x].copy_from_slice(&flags[..=x]);
            }
        }
        Ok(None)
    }
}

/// 8XYn: the result lands in VX first, then the flag in VF, so VF as the
/// destination ends up holding the flag
fn alu(regs: &mut RegisterFile, op: AluOp, x: usize, y: usize) {
    let (vx, vy) = (regs.v[x], regs.v[y]);
    let (result, flag) = match op {
        AluOp::Load => (vy, None),
        AluOp::Or => (vx | vy, None),
        AluOp::And => (vx & vy, None),
        AluOp::Xor => (vx ^ vy, None),
        AluOp::Add => {
            let (sum, carry) = vx.overflowing_add(vy);
            (sum, Some(carry))
        }
        AluOp::Sub => {
            let (diff, borrow) = vx.overflowing_sub(vy);
            (diff, Some(!borrow))
        }
        AluOp::ShiftRight => (vx >> 1, Some(vx & 0x01 != 0)),
        AluOp::SubN => {
            let (diff, borrow) = vy.overflowing_sub(vx);
            (diff, Some(!borrow))
        }
        AluOp::ShiftLeft => (vx << 1, Some(vx & 0x80 != 0)),
    };
    regs.v[x] = result;
    if let Some(f) = flag {
        regs.v[FLAG_REGISTER] = f as u8;
    }
}
