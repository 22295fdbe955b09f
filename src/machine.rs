use crate::config::MachineConfig;
use crate::display::{Display, Resolution};
use crate::error::{Error, Halt, Result};
use crate::input::InputState;
use crate::interpreter::Interpreter;
use crate::memory::MemoryImage;
use crate::registers::RegisterFile;
use crate::timer::Timer;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// what the machine is doing right now, as far as a host can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
    AwaitingKey,
    Halted(Halt),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped => write!(f, "stopped"),
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
            RunState::AwaitingKey => write!(f, "waiting for key"),
            RunState::Halted(halt) => write!(f, "halted, {}", halt),
        }
    }
}

#[derive(Debug)]
struct Status {
    state: RunState,
    snapshot: Option<RegisterFile>,
}

/// Everything the interpreter thread shares with the outside world. The
/// register file and memory aren't in here; those belong to the run.
#[derive(Debug)]
pub struct Peripherals {
    pub display: Display,
    pub input: InputState,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    status: Mutex<Status>,
}

impl Default for Peripherals {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripherals {
    pub fn new() -> Self {
        Peripherals {
            display: Display::new(),
            input: InputState::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
            status: Mutex::new(Status {
                state: RunState::Stopped,
                snapshot: None,
            }),
        }
    }

    pub fn state(&self) -> RunState {
        self.status.lock().state
    }

    /// registers as last published by a run, when it paused or ended
    pub fn snapshot(&self) -> Option<RegisterFile> {
        self.status.lock().snapshot.clone()
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.status.lock().state = state;
    }

    pub(crate) fn publish(&self, regs: &RegisterFile) {
        self.status.lock().snapshot = Some(regs.clone());
    }

    /// snapshot and state change in one go, so a host seeing `state` always
    /// finds the matching registers
    pub(crate) fn publish_as(&self, state: RunState, regs: &RegisterFile) {
        let mut status = self.status.lock();
        status.snapshot = Some(regs.clone());
        status.state = state;
    }

    /// what a program sees when it starts: blank low-res screen, timers at
    /// zero, no keys down. pause survives this
    fn power_on(&self) {
        self.display.clear();
        self.display.set_resolution(Resolution::Low);
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.input.release_all();
        self.input.clear_reset();
        let mut status = self.status.lock();
        status.state = RunState::Running;
        status.snapshot = None;
    }
}

/// what an interpreter thread hands back when it ends
type Finished = (Halt, MemoryImage);

/// Owns the memory image and at most one interpreter thread. Every start
/// gets fresh registers; memory carries over from the previous run, so only
/// `load_program` brings back a pristine image.
pub struct Machine {
    config: MachineConfig,
    io: Arc<Peripherals>,
    memory: MemoryImage,
    run_thread: Option<JoinHandle<Finished>>,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Machine {
            config,
            io: Arc::new(Peripherals::new()),
            memory: MemoryImage::new(),
            run_thread: None,
        }
    }

    /// Stop whatever is running and keep `program` as the image for later
    /// starts. An overlong program is rejected before anything is stopped.
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let mut image = MemoryImage::new();
        image.load_program(program)?;
        info!("loaded {} byte program", program.len());
        self.install(image)
    }

    pub fn load_from(&mut self, reader: &mut impl io::Read) -> Result<()> {
        let mut image = MemoryImage::new();
        image.load_from(reader)?;
        info!("loaded program");
        self.install(image)
    }

    fn install(&mut self, image: MemoryImage) -> Result<()> {
        self.stop()?;
        self.memory = image;
        Ok(())
    }

    /// Spawn the interpreter thread. Does nothing if one is still running;
    /// a thread that already halted is reaped and replaced.
    pub fn start(&mut self) -> Result<()> {
        if let Some(handle) = &self.run_thread {
            if !handle.is_finished() {
                debug!("start ignored, already running");
                return Ok(());
            }
        }
        if let Some(halt) = self.join()? {
            debug!("reaped earlier run: {}", halt);
        }

        self.io.power_on();
        let mut interpreter =
            Interpreter::new(self.memory.clone(), self.config, Arc::clone(&self.io));
        let io = Arc::clone(&self.io);
        let handle = thread::Builder::new()
            .name("interpreter".into())
            .spawn(move || {
                let halt = interpreter.run();
                io.set_state(match halt {
                    Halt::Reset => RunState::Stopped,
                    other => RunState::Halted(other),
                });
                (halt, interpreter.into_memory())
            })?;
        self.run_thread = Some(handle);
        info!("started");
        Ok(())
    }

    /// Raise reset, wake every wait the interpreter might be parked in, and
    /// join the thread. Returns how the run ended, if there was one.
    pub fn stop(&mut self) -> Result<Option<Halt>> {
        let handle = match self.run_thread.take() {
            Some(handle) => handle,
            None => return Ok(None),
        };
        self.io.input.request_reset();
        let joined = handle.join();
        self.io.input.clear_reset();
        self.io.set_state(RunState::Stopped);
        let halt = self.keep_memory(joined)?;
        info!("stopped ({})", halt);
        Ok(Some(halt))
    }

    /// stop, then start again from the program's entry point
    pub fn reset(&mut self) -> Result<()> {
        info!("reset");
        self.stop()?;
        self.start()
    }

    /// Block until the current run ends by itself. Only useful for programs
    /// that halt; anything else needs `stop()`.
    pub fn join(&mut self) -> Result<Option<Halt>> {
        match self.run_thread.take() {
            Some(handle) => self.keep_memory(handle.join()).map(Some),
            None => Ok(None),
        }
    }

    fn keep_memory(&mut self, joined: thread::Result<Finished>) -> Result<Halt> {
        let (halt, memory) = joined.map_err(|_| Error::ThreadPanicked)?;
        self.memory = memory;
        Ok(halt)
    }

    pub fn pause(&self) {
        debug!("pause");
        self.io.input.pause();
    }

    pub fn resume(&self) {
        debug!("resume");
        self.io.input.resume();
    }

    pub fn set_fast_forward(&self, on: bool) {
        debug!("fast forward {}", on);
        self.io.input.set_fast_forward(on);
    }

    pub fn key_down(&self, key: u8) {
        self.io.input.key_down(key);
    }

    pub fn key_up(&self, key: u8) {
        self.io.input.key_up(key);
    }

    pub fn state(&self) -> RunState {
        self.io.state()
    }

    pub fn snapshot(&self) -> Option<RegisterFile> {
        self.io.snapshot()
    }

    /// true while an interpreter thread exists and hasn't finished
    pub fn is_running(&self) -> bool {
        self.run_thread
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn peripherals(&self) -> Arc<Peripherals> {
        Arc::clone(&self.io)
    }

    pub fn display(&self) -> &Display {
        &self.io.display
    }

    pub fn input(&self) -> &InputState {
        &self.io.input
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("interpreter didn't stop cleanly: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(m: &Machine, pred: impl Fn(RunState) -> bool) -> RunState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let state = m.state();
            if pred(state) || Instant::now() > deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_stop_without_start() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        assert_eq!(m.stop()?, None);
        assert_eq!(m.state(), RunState::Stopped);
        Ok(())
    }

    #[test]
    fn test_overlong_load_keeps_running() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        m.load_program(&[0x12, 0x00])?;
        m.start()?;
        let big = vec![0u8; MemoryImage::program_capacity() + 1];
        assert!(matches!(
            m.load_program(&big),
            Err(Error::ProgramLoadOverflow { .. })
        ));
        // jp 0x200 is a self jump, so that run ended by itself; what matters
        // is the old image is still the one loaded
        let halt = m.join()?;
        assert_eq!(halt, Some(Halt::SelfJump { addr: 0x200 }));
        m.start()?;
        assert_eq!(m.join()?, Some(Halt::SelfJump { addr: 0x200 }));
        Ok(())
    }

    #[test]
    fn test_memory_survives_reset() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        #[rustfmt::skip]
        let counter = [
            0xa3, 0x00, // LD I, 0x300
            0xf0, 0x65, // LD V0, [I]
            0x70, 0x01, // ADD V0, 1
            0xf0, 0x55, // LD [I], V0
            0x12, 0x08, // JP self
        ];
        m.load_program(&counter)?;
        m.start()?;
        m.join()?;
        m.reset()?;
        m.join()?;
        assert_eq!(m.snapshot().unwrap().v[0], 2);

        // loading again brings back a clean image
        m.load_program(&[0xa3, 0x00, 0xf0, 0x65, 0x12, 0x04])?;
        m.start()?;
        m.join()?;
        assert_eq!(m.snapshot().unwrap().v[0], 0);
        Ok(())
    }

    #[test]
    fn test_start_is_idempotent_while_running() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        // loop: jp 0x202 <-> jp 0x200
        m.load_program(&[0x12, 0x02, 0x12, 0x00])?;
        m.start()?;
        m.start()?;
        assert!(m.is_running());
        assert_eq!(m.stop()?, Some(Halt::Reset));
        assert!(!m.is_running());
        assert_eq!(m.state(), RunState::Stopped);
        Ok(())
    }

    #[test]
    fn test_halt_is_reported() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        m.load_program(&[0x00, 0xfd])?;
        m.start()?;
        let state = wait_for(&m, |s| matches!(s, RunState::Halted(_)));
        assert_eq!(state, RunState::Halted(Halt::Exit { addr: 0x200 }));
        assert_eq!(m.join()?, Some(Halt::Exit { addr: 0x200 }));
        assert!(!m.is_running());
        Ok(())
    }

    #[test]
    fn test_paused_always_has_a_snapshot() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        m.load_program(&[0x12, 0x02, 0x12, 0x00])?;
        m.pause();
        for _ in 0..50 {
            m.reset()?;
            loop {
                let state = m.state();
                // read straight after seeing the state, no sleep in between
                let snap = m.snapshot();
                if state == RunState::Paused {
                    assert_eq!(snap.map(|r| r.pc), Some(0x200));
                    break;
                }
                thread::yield_now();
            }
        }
        m.resume();
        assert_eq!(m.stop()?, Some(Halt::Reset));
        Ok(())
    }

    #[test]
    fn test_start_clears_the_screen() -> Result<()> {
        let mut m = Machine::new(MachineConfig::default());
        m.display().draw(0, 0, &[0xff], 1);
        m.display().set_resolution(Resolution::High);
        m.load_program(&[0x12, 0x00])?;
        m.start()?;
        m.join()?;
        let f = m.display().frame();
        assert_eq!(f.width, 64);
        assert!(f.visible().next().is_none());
        Ok(())
    }
}
