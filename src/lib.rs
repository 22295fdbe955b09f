//! # phosphor8
//!
//! A CHIP-8 / SUPER-CHIP interpreter whose display glows: pixels that get
//! switched off fade out over a few frames instead of vanishing, the way
//! they did on a phosphor screen.
//!
//! ## Design
//!
//! * one thread interprets, one thread samples the display; the host thread
//!   feeds keys and controls. They only meet in `Peripherals`
//! * the interpreter runs one instruction then sleeps (1.5ms by default),
//!   so timing is wall-clock and not cycle-accurate
//! * the 60Hz timers are computed from wall-clock on read; nothing ticks
//! * every blocking point in the interpreter (throttle sleep, pause, key
//!   wait) parks on one condition variable, so stop/reset always gets
//!   through promptly
//! * abstract the renderer behind a trait so frames can go anywhere;
//!   starting with TUI in-console
//! * faults (bad opcode, stack trouble, PC off the end) end the run; they
//!   never panic
//!
//! Model
//!
//! Machine (lifecycle: load / start / stop / reset / pause / resume)
//!  |-- memory image (handed to each run, handed back when it ends)
//!  |-- Peripherals (shared)
//!  |    |-- display: low-res + high-res framebuffers, decay
//!  |    |-- input: keypad, reset / pause / fast-forward flags, condvar
//!  |    |-- delay timer, sound timer
//!  |    `-- run state + register snapshot
//!  `-- interpreter thread
//!       |-- registers, memory (owned)
//!       `-- loop {
//!             throttle; reset? => stop; paused? => park;
//!             fetch; decode; execute
//!           }
//!
//! RenderSampler (own thread)
//!  `-- every 15ms: decay unless paused; frame => Render
//!
//! Opcodes are decoded into `Instruction`, which doubles as the
//! disassembler.
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod registers;
pub mod sampler;
pub mod term;
pub mod timer;

pub use config::MachineConfig;
pub use error::{Error, Fault, Halt, Result};
pub use machine::{Machine, Peripherals, RunState};
pub use sampler::{Render, RenderSampler};
