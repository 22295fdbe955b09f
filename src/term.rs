//! Terminal host: renders frames with TUI and maps crossterm key events onto
//! the keypad and the machine controls.
use crate::display::{Frame, PEAK};
use crate::error::Result;
use crate::input::KEY_COUNT;
use crate::machine::{Machine, Peripherals};
use crate::sampler::Render;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// left-hand side of a qwerty keyboard, laid out like the COSMAC VIP keypad
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
pub const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// terminals only report presses, so a key counts as held this long after
/// its last press (or auto-repeat)
pub const KEY_HOLD: Duration = Duration::from_millis(150);

// intensity bands, brightest first
const BANDS: [(u8, Color); 3] = [
    (PEAK, Color::White),
    (0x90, Color::Gray),
    (0x01, Color::DarkGray),
];

/// canvas coords for one band of a frame; y is flipped so row 0 is at the top
fn band_points(frame: &Frame, lo: u8, hi: u8) -> Vec<(f64, f64)> {
    frame
        .visible()
        .filter(|&(_, _, c)| c >= lo && c <= hi)
        .map(|(x, y, _)| (x as f64, -(y as f64)))
        .collect()
}

/// monochrome display in a terminal, rendered using TUI and crossterm; fading
/// pixels are drawn in progressively darker greys
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    title: String,
    io: Arc<Peripherals>,
}

impl MonoTermDisplay {
    pub fn new(title: &str, io: Arc<Peripherals>) -> Result<MonoTermDisplay> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            title: title.to_string(),
            io,
        })
    }
}

impl Render for MonoTermDisplay {
    fn render(&mut self, frame: &Frame) -> io::Result<()> {
        let (w, h) = (frame.width as u16, frame.height as u16);
        // hi-res won't fit most terminals one cell per pixel
        let (marker, cols, rows) = if frame.width > 64 {
            (Marker::Braille, w / 2, h / 4)
        } else {
            (Marker::Block, w, h)
        };
        let title = format!("{} [{}]", self.title, self.io.state());

        let mut layers = Vec::with_capacity(BANDS.len());
        let mut hi = PEAK;
        for &(lo, color) in BANDS.iter() {
            layers.push((band_points(frame, lo, hi), color));
            hi = lo.saturating_sub(1);
        }

        self.terminal.draw(|f| {
            let area = f.size();
            let size = Rect::new(
                0,
                0,
                (cols + 2).min(area.width),
                (rows + 2).min(area.height),
            );
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title.as_str())
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds([0.0, (w - 1) as f64])
                .y_bounds([-((h - 1) as f64), 0.0])
                .marker(marker)
                .paint(|ctx| {
                    // dimmest first so brighter layers win shared braille cells
                    for (coords, color) in layers.iter().rev() {
                        ctx.draw(&Points {
                            coords: coords.as_slice(),
                            color: *color,
                        });
                    }
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// what the host loop should do after handling input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Continue,
    Quit,
}

/// Reads keypresses from the terminal (in raw mode) and drives the machine.
///
/// Esc or ctrl-c quits, backspace resets, `p` toggles pause and tab toggles
/// fast-forward. Everything else goes through the keymap.
pub struct KeyboardInput {
    keymap: HashMap<char, u8>,
    held: [Option<Instant>; KEY_COUNT],
}

impl KeyboardInput {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(KeyboardInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [None; KEY_COUNT],
        })
    }

    /// Handle every pending terminal event, waiting up to `timeout` for the
    /// first one, then release keys that haven't been pressed lately.
    pub fn pump(&mut self, machine: &mut Machine, timeout: Duration) -> Result<HostAction> {
        let mut wait = timeout;
        while poll(wait)? {
            wait = Duration::ZERO;
            let evt = match read()? {
                Event::Key(evt) => evt,
                _ => continue,
            };
            match evt.code {
                KeyCode::Esc => return Ok(HostAction::Quit),
                KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(HostAction::Quit)
                }
                KeyCode::Backspace => machine.reset()?,
                KeyCode::Tab => machine.set_fast_forward(!machine.input().fast_forward()),
                KeyCode::Char('p') => {
                    if machine.input().is_paused() {
                        machine.resume();
                    } else {
                        machine.pause();
                    }
                }
                KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                    Some(&key) => {
                        machine.key_down(key);
                        self.held[key as usize] = Some(Instant::now());
                    }
                    None => warn!("can't map {:?} to a COSMAC key", c),
                },
                other => debug!("ignoring key {:?}", other),
            }
        }
        self.release_expired(machine, Instant::now());
        Ok(HostAction::Continue)
    }

    fn release_expired(&mut self, machine: &Machine, now: Instant) {
        for (key, held) in self.held.iter_mut().enumerate() {
            if let Some(since) = *held {
                if now.duration_since(since) >= KEY_HOLD {
                    machine.key_up(key as u8);
                    *held = None;
                }
            }
        }
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't leave raw mode: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Display;

    #[test]
    fn test_keymap_covers_keypad() {
        let map = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
        assert_eq!(map.len(), KEY_COUNT);
        let mut keys: Vec<u8> = map.values().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..KEY_COUNT as u8).collect::<Vec<_>>());
        // controls must not collide with the keypad
        assert!(!map.contains_key(&'p'));
    }

    #[test]
    fn test_band_points() {
        let d = Display::new();
        d.draw(0, 0, &[0xc0], 1);
        d.draw(0, 1, &[0x80], 1);
        d.draw(0, 1, &[0x80], 1);
        let frame = d.frame();
        assert_eq!(band_points(&frame, PEAK, PEAK), vec![(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(band_points(&frame, 0x90, PEAK - 1), vec![(0.0, -1.0)]);
        assert!(band_points(&frame, 0x01, 0x8f).is_empty());
    }
}
