use clap::Parser;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use phosphor8::config::{MachineConfig, DEFAULT_FAST_FORWARD_PERIOD, DEFAULT_STACK_DEPTH};
use phosphor8::instruction::disassemble;
use phosphor8::machine::Machine;
use phosphor8::memory::{MemoryImage, PROGRAM_ADDR};
use phosphor8::sampler::{RenderSampler, FRAME_PERIOD};
use phosphor8::term::{HostAction, KeyboardInput, MonoTermDisplay};

/// how long the host waits for a key event before checking timers again
const INPUT_POLL: Duration = Duration::from_millis(10);

/// CHIP-8 / SUPER-CHIP interpreter for the terminal.
///
/// Keys: 1234/qwer/asdf/zxcv are the keypad; p pauses, tab fast-forwards,
/// backspace resets and esc quits.
#[derive(Parser, Debug)]
#[command(name = "phosphor8", version)]
struct Cli {
    /// program to load at 0x200
    rom: PathBuf,

    /// start in fast-forward
    #[arg(long)]
    fast: bool,

    /// microseconds between instructions
    #[arg(long, value_name = "N", default_value_t = 1500)]
    cycle_us: u64,

    /// nanoseconds between instructions while fast-forwarding
    #[arg(long, value_name = "N", default_value_t = DEFAULT_FAST_FORWARD_PERIOD.as_nanos() as u64)]
    fast_forward_ns: u64,

    /// maximum CALL nesting
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STACK_DEPTH)]
    stack_depth: usize,

    /// milliseconds between rendered frames
    #[arg(long, value_name = "N", default_value_t = FRAME_PERIOD.as_millis() as u64)]
    frame_ms: u64,

    /// write logs here (RUST_LOG filters; default info)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// print the program as code and data, don't run it
    #[arg(long)]
    disassemble: bool,
}

// the terminal belongs to the TUI, so logs only go to a file
fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log {
        init_logging(path)?;
    }

    let program = fs::read(&cli.rom)?;
    if program.len() > MemoryImage::program_capacity() {
        return Err(phosphor8::Error::ProgramLoadOverflow {
            len: program.len(),
            capacity: MemoryImage::program_capacity(),
        }
        .into());
    }
    if cli.disassemble {
        for segment in disassemble(&program, PROGRAM_ADDR) {
            print!("{}", segment);
        }
        return Ok(());
    }

    let config = MachineConfig::default()
        .with_cycle_period(Duration::from_micros(cli.cycle_us))
        .with_fast_forward_period(Duration::from_nanos(cli.fast_forward_ns))
        .with_stack_depth(cli.stack_depth);
    let mut machine = Machine::new(config);
    machine.load_program(&program)?;
    machine.set_fast_forward(cli.fast);

    // initialise
    let title = cli
        .rom
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "phosphor8".to_string());
    let display = MonoTermDisplay::new(&title, machine.peripherals())?;
    let mut keyboard = KeyboardInput::new()?;
    let mut sampler = RenderSampler::spawn(
        machine.peripherals(),
        Duration::from_millis(cli.frame_ms.max(1)),
        display,
    )?;

    machine.start()?;
    while keyboard.pump(&mut machine, INPUT_POLL)? == HostAction::Continue {}

    let halt = machine.stop()?;
    sampler.stop();
    drop(keyboard);
    if let Some(halt) = halt {
        info!("quit after {}", halt);
    }

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..4 {
        println!();
    }
    Ok(())
}
