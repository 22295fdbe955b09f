use crate::display::Frame;
use crate::machine::Peripherals;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// how often a frame is taken; also sets the fade speed
pub const FRAME_PERIOD: Duration = Duration::from_millis(15);

/// Render takes frames from the sampler and puts them somewhere a person can
/// see them. It shouldn't need to know anything about the interpreter.
pub trait Render {
    fn render(&mut self, frame: &Frame) -> Result<(), io::Error>;
}

impl<F> Render for F
where
    F: FnMut(&Frame) -> Result<(), io::Error>,
{
    fn render(&mut self, frame: &Frame) -> Result<(), io::Error> {
        self(frame)
    }
}

/// throws frames away; useful for running headless
pub struct DummyRender;

impl Render for DummyRender {
    fn render(&mut self, _frame: &Frame) -> Result<(), io::Error> {
        Ok(())
    }
}

/// Periodically fades the display and hands the result to a `Render`.
/// Runs on its own thread, independent of whether a program is running, so
/// the last image fades out after a halt. While paused the image is frozen.
pub struct RenderSampler {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RenderSampler {
    pub fn spawn<R>(io: Arc<Peripherals>, period: Duration, mut sink: R) -> io::Result<Self>
    where
        R: Render + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                debug!("render sampler every {:?}", period);
                let mut next = Instant::now();
                while !flag.load(Ordering::Relaxed) {
                    let frame = if io.input.is_paused() {
                        io.display.frame()
                    } else {
                        io.display.decay_and_frame()
                    };
                    if let Err(e) = sink.render(&frame) {
                        error!("render failed, sampler giving up: {}", e);
                        break;
                    }
                    next += period;
                    let now = Instant::now();
                    if next > now {
                        spin_sleep::sleep(next - now);
                    } else {
                        // fell behind; don't try to catch up
                        next = now;
                    }
                }
            })?;
        Ok(RenderSampler {
            stop,
            thread: Some(thread),
        })
    }

    /// end the sampler thread and wait for it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
