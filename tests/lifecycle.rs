//! Threaded tests of starting, stopping, pausing and key waits.

use phosphor8::{Error, Fault, Halt, Machine, MachineConfig, RunState};
use std::thread;
use std::time::{Duration, Instant};

/// poll the machine state until `pred` holds or five seconds pass
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

fn machine(program: &[u8]) -> Result<Machine, Error> {
    let mut m = Machine::new(MachineConfig::default());
    m.load_program(program)?;
    Ok(m)
}

// LD V0, 1; loop: ADD V0, 1; JP loop
const COUNTER: [u8; 6] = [0x60, 0x01, 0x70, 0x01, 0x12, 0x02];

// LD V0, K; JP self
const WAIT_KEY: [u8; 4] = [0xf0, 0x0a, 0x12, 0x02];

#[test]
fn test_stop_then_reset_while_paused() -> Result<(), Error> {
    let mut m = machine(&COUNTER)?;
    m.start()?;
    thread::sleep(Duration::from_millis(30));
    m.pause();
    assert_eq!(wait_for(&m, |s| s == RunState::Paused), RunState::Paused);
    let paused_at = m.snapshot().unwrap();
    assert_ne!(paused_at.v[0], 0);

    assert_eq!(m.stop()?, Some(Halt::Reset));
    assert_eq!(m.state(), RunState::Stopped);
    // pause is a host setting and outlives the run
    assert!(m.input().is_paused());
    assert!(!m.input().reset_requested());

    m.reset()?;
    assert_eq!(wait_for(&m, |s| s == RunState::Paused), RunState::Paused);
    let fresh = m.snapshot().unwrap();
    assert_eq!(fresh.pc, 0x200);
    assert_eq!(fresh.v, [0; 16]);
    assert_eq!(fresh.sp(), 0);

    m.resume();
    assert_eq!(wait_for(&m, |s| s == RunState::Running), RunState::Running);
    assert_eq!(m.stop()?, Some(Halt::Reset));
    Ok(())
}

#[test]
fn test_key_wait_needs_a_key() -> Result<(), Error> {
    let mut m = machine(&WAIT_KEY)?;
    m.start()?;
    assert_eq!(
        wait_for(&m, |s| s == RunState::AwaitingKey),
        RunState::AwaitingKey
    );
    // wakes the waiter without pressing anything
    m.resume();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(m.state(), RunState::AwaitingKey);

    m.key_down(7);
    assert_eq!(m.join()?, Some(Halt::SelfJump { addr: 0x202 }));
    assert_eq!(m.snapshot().unwrap().v[0], 7);
    assert_eq!(m.state(), RunState::Halted(Halt::SelfJump { addr: 0x202 }));
    Ok(())
}

#[test]
fn test_stop_interrupts_key_wait() -> Result<(), Error> {
    let mut m = machine(&WAIT_KEY)?;
    m.start()?;
    wait_for(&m, |s| s == RunState::AwaitingKey);
    let started = Instant::now();
    assert_eq!(m.stop()?, Some(Halt::Reset));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(m.snapshot().unwrap().v[0], 0);
    Ok(())
}

#[test]
fn test_self_jump_is_not_a_fault() -> Result<(), Error> {
    let mut m = machine(&[0x00, 0xe0, 0x12, 0x02])?;
    m.start()?;
    let halt = m.join()?.unwrap();
    assert_eq!(halt, Halt::SelfJump { addr: 0x202 });
    assert!(!halt.is_fault());
    Ok(())
}

#[test]
fn test_illegal_opcode_halts_until_reset() -> Result<(), Error> {
    let mut m = machine(&[0x60, 0x01, 0xff, 0xff])?;
    m.start()?;
    let illegal = Halt::Fault(Fault::IllegalOpcode {
        addr: 0x202,
        word: 0xffff,
    });
    assert_eq!(m.join()?, Some(illegal));
    assert_eq!(m.state(), RunState::Halted(illegal));
    assert_eq!(m.snapshot().unwrap().v[0], 1);

    // a reset runs the program again from the top
    m.reset()?;
    assert_eq!(m.join()?, Some(illegal));
    Ok(())
}

#[test]
fn test_no_thread_left_after_stop() -> Result<(), Error> {
    let mut m = machine(&COUNTER)?;
    m.start()?;
    assert!(m.is_running());
    assert_eq!(m.stop()?, Some(Halt::Reset));
    assert!(!m.is_running());
    assert_eq!(m.stop()?, None);
    Ok(())
}

#[test]
fn test_fast_forward_skips_the_throttle() -> Result<(), Error> {
    let config = MachineConfig::default().with_cycle_period(Duration::from_secs(1));
    let mut m = Machine::new(config);
    m.load_program(&[0x60, 0x01, 0x61, 0x02, 0x62, 0x03, 0x12, 0x06])?;
    m.set_fast_forward(true);
    let started = Instant::now();
    m.start()?;
    assert_eq!(m.join()?, Some(Halt::SelfJump { addr: 0x206 }));
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[test]
fn test_loading_stops_the_run() -> Result<(), Error> {
    let mut m = machine(&COUNTER)?;
    m.start()?;
    m.load_program(&WAIT_KEY)?;
    assert!(!m.is_running());
    assert_eq!(m.state(), RunState::Stopped);
    Ok(())
}

#[test]
fn test_load_from_reader() -> Result<(), Error> {
    let mut m = Machine::new(MachineConfig::default());
    m.load_from(&mut &[0x00u8, 0xfd][..])?;
    m.start()?;
    assert_eq!(m.join()?, Some(Halt::Exit { addr: 0x200 }));
    Ok(())
}

#[test]
fn test_drop_while_waiting_for_key() -> Result<(), Error> {
    let mut m = machine(&WAIT_KEY)?;
    m.start()?;
    wait_for(&m, |s| s == RunState::AwaitingKey);
    drop(m);
    Ok(())
}
