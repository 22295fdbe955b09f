use parking_lot::Mutex;

/// intensity of a freshly lit pixel; the only value that counts as "set"
/// for collision purposes
pub const PEAK: u8 = 0xff;

/// how much a fading pixel loses per decay pass
pub const FADE_STEP: u8 = 0x08;

/// fading pixels at or below this go straight to unlit
pub const FADE_FLOOR: u8 = 0x08;

/// how far the SUPER-CHIP left/right scroll instructions move things
pub const SCROLL_COLUMNS: usize = 4;

/// The two screen modes. Each has its own framebuffer, so switching mode
/// shows whatever was last drawn in the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 64x32 CHIP-8
    Low,
    /// 128x64 SUPER-CHIP
    High,
}

impl Resolution {
    pub fn width(&self) -> usize {
        match self {
            Resolution::Low => 64,
            Resolution::High => 128,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Resolution::Low => 32,
            Resolution::High => 64,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }
}

/// A copy of the active framebuffer, ready for a renderer. Cells are
/// row-major intensities, 0 = unlit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<u8>,
}

impl Frame {
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    /// logically set, as opposed to fading
    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == PEAK
    }

    /// (x, y, intensity) of every cell that isn't dark
    pub fn visible(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(move |(i, &c)| (i % w, i / w, c))
    }
}

#[derive(Debug)]
struct Framebuffer {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Framebuffer {
    fn new(resolution: Resolution) -> Self {
        Framebuffer {
            width: resolution.width(),
            height: resolution.height(),
            cells: vec![0; resolution.pixel_count()],
        }
    }

    fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// xor a pixel, coordinates wrapping at the edges; true if a lit pixel
    /// went out
    fn toggle(&mut self, x: usize, y: usize) -> bool {
        let i = (y % self.height) * self.width + (x % self.width);
        if self.cells[i] == PEAK {
            // erased pixels start fading rather than vanishing
            self.cells[i] = PEAK - FADE_STEP;
            true
        } else {
            self.cells[i] = PEAK;
            false
        }
    }

    fn decay(&mut self) {
        for c in self.cells.iter_mut() {
            if *c != 0 && *c != PEAK {
                *c = if *c > FADE_FLOOR { *c - FADE_STEP } else { 0 };
            }
        }
    }

    fn scroll_down(&mut self, n: usize) {
        let n = n.min(self.height);
        let shift = n * self.width;
        let len = self.cells.len();
        self.cells.copy_within(0..len - shift, shift);
        self.cells[..shift].fill(0);
    }

    fn scroll_up(&mut self, n: usize) {
        let n = n.min(self.height);
        let shift = n * self.width;
        let len = self.cells.len();
        self.cells.copy_within(shift..len, 0);
        self.cells[len - shift..].fill(0);
    }

    fn scroll_right(&mut self, n: usize) {
        let n = n.min(self.width);
        for row in self.cells.chunks_mut(self.width) {
            row.copy_within(0..row.len() - n, n);
            row[..n].fill(0);
        }
    }

    fn scroll_left(&mut self, n: usize) {
        let n = n.min(self.width);
        for row in self.cells.chunks_mut(self.width) {
            let w = row.len();
            row.copy_within(n..w, 0);
            row[w - n..].fill(0);
        }
    }

    fn frame(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }
}

#[derive(Debug)]
struct Screens {
    low: Framebuffer,
    high: Framebuffer,
    resolution: Resolution,
}

impl Screens {
    fn active(&mut self) -> &mut Framebuffer {
        match self.resolution {
            Resolution::Low => &mut self.low,
            Resolution::High => &mut self.high,
        }
    }
}

/// Display is drawn on by the interpreter and decayed/read by the render
/// sampler, each on its own thread. Both framebuffers sit behind one lock
/// so a decay pass never sees half a sprite.
#[derive(Debug)]
pub struct Display {
    screens: Mutex<Screens>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Display {
            screens: Mutex::new(Screens {
                low: Framebuffer::new(Resolution::Low),
                high: Framebuffer::new(Resolution::High),
                resolution: Resolution::Low,
            }),
        }
    }

    /// blank both framebuffers, fading pixels included
    pub fn clear(&self) {
        let mut s = self.screens.lock();
        s.low.clear();
        s.high.clear();
    }

    pub fn resolution(&self) -> Resolution {
        self.screens.lock().resolution
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        self.screens.lock().resolution = resolution;
    }

    /// XOR a sprite onto the active framebuffer at (x, y). `sprite` holds
    /// `bytes_per_row` bytes for each row, MSB leftmost. Returns whether any
    /// lit pixel was turned off.
    pub fn draw(&self, x: u8, y: u8, sprite: &[u8], bytes_per_row: usize) -> bool {
        let mut s = self.screens.lock();
        let fb = s.active();
        let mut collision = false;
        for (row, bytes) in sprite.chunks(bytes_per_row.max(1)).enumerate() {
            for (col_byte, &bits) in bytes.iter().enumerate() {
                for bit in 0..8 {
                    if bits & (0x80 >> bit) != 0 {
                        let px = x as usize + col_byte * 8 + bit;
                        let py = y as usize + row;
                        collision |= fb.toggle(px, py);
                    }
                }
            }
        }
        collision
    }

    pub fn scroll_down(&self, rows: usize) {
        self.screens.lock().active().scroll_down(rows);
    }

    pub fn scroll_up(&self, rows: usize) {
        self.screens.lock().active().scroll_up(rows);
    }

    pub fn scroll_right(&self) {
        self.screens.lock().active().scroll_right(SCROLL_COLUMNS);
    }

    pub fn scroll_left(&self) {
        self.screens.lock().active().scroll_left(SCROLL_COLUMNS);
    }

    /// one fade step on both framebuffers
    pub fn decay(&self) {
        let mut s = self.screens.lock();
        s.low.decay();
        s.high.decay();
    }

    /// a copy of the active framebuffer
    pub fn frame(&self) -> Frame {
        self.screens.lock().active().frame()
    }

    /// decay, then copy, without letting a draw in between
    pub fn decay_and_frame(&self) -> Frame {
        let mut s = self.screens.lock();
        s.low.decay();
        s.high.decay();
        s.active().frame()
    }
}
