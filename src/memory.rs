use crate::error::{Error, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the byte-addressable memory the interpreter runs against.
/// Accesses wrap at the top of RAM, so an address register pointing past
/// the end reads from the bottom again.
pub trait MemoryMap {
    /// the whole address space, r/o
    fn as_slice(&self) -> &[u8];

    /// the whole address space, r/w
    fn as_mut_slice(&mut self) -> &mut [u8];

    fn get_byte(&self, addr: u16) -> u8 {
        let bytes = self.as_slice();
        bytes[addr as usize % bytes.len()]
    }

    fn set_byte(&mut self, addr: u16, value: u8) {
        let bytes = self.as_mut_slice();
        let len = bytes.len();
        bytes[addr as usize % len] = value;
    }

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.get_byte(addr) as u16) << 8) | self.get_byte(addr.wrapping_add(1)) as u16
    }

    /// fill `buf` with consecutive bytes starting at `addr`
    fn read_into(&self, addr: u16, buf: &mut [u8]) {
        for (offset, b) in buf.iter_mut().enumerate() {
            *b = self.get_byte(addr.wrapping_add(offset as u16));
        }
    }

    /// write consecutive bytes starting at `addr`
    fn write_from(&mut self, addr: u16, data: &[u8]) {
        for (offset, b) in data.iter().enumerate() {
            self.set_byte(addr.wrapping_add(offset as u16), *b);
        }
    }
}

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded, and where execution starts
pub const PROGRAM_ADDR: u16 = 0x0200;

/// where the 4x5 hex digit glyphs live
pub const FONT_ADDR: u16 = 0x050;
pub const FONT_GLYPH_BYTES: u16 = 5;

/// where the SUPER-CHIP 8x10 decimal digit glyphs live
pub const BIG_FONT_ADDR: u16 = 0x0a0;
pub const BIG_FONT_GLYPH_BYTES: u16 = 10;

/// 4K memory image:
///   0x0000-0x004f  unused (interpreter on real hardware)
///   0x0050-0x009f  hex glyphs
///   0x00a0-0x013f  big decimal glyphs
///   0x0200-0x0fff  program
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: Box<[u8]>,
}

impl MemoryMap for MemoryImage {
    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImage")
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl MemoryImage {
    /// zeroed RAM with both glyph tables baked in
    pub fn new() -> Self {
        let mut mm = MemoryImage {
            bytes: vec![0u8; RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.write_from(FONT_ADDR, &CHIP8_FONT);
        mm.write_from(BIG_FONT_ADDR, &SCHIP_BIG_FONT);
        mm
    }

    /// the most bytes a program may occupy
    pub fn program_capacity() -> usize {
        RAM_SIZE_BYTES - PROGRAM_ADDR as usize
    }

    /// copy a program in at 0x200; refuses (writing nothing) if it would run
    /// off the top of RAM
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let capacity = Self::program_capacity();
        if program.len() > capacity {
            return Err(Error::ProgramLoadOverflow {
                len: program.len(),
                capacity,
            });
        }
        let start = PROGRAM_ADDR as usize;
        self.bytes[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// load a program of unknown length from a reader
    pub fn load_from(&mut self, reader: &mut impl io::Read) -> Result<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.load_program(&buf)
    }
}

const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[rustfmt::skip]
const SCHIP_BIG_FONT: [u8; 100] = [
    0x3C, 0x66, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0x66, 0x3C, // 0
    0x0C, 0x1C, 0x2C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x66, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x66, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x07, 0xC7, 0x7C, 0x38, // 5
    0x3F, 0x7E, 0xC0, 0xC0, 0xFC, 0xFE, 0xC7, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0xC0, // 7
    0x3C, 0x66, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x66, 0x3C, // 8
    0x3C, 0x66, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x03, 0x7E, 0xFC, // 9
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = MemoryImage::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the
        //     fonts
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
    }

    #[test]
    fn test_fonts_baked_in() {
        let m = MemoryImage::new();
        let mut zero = [0u8; 5];
        m.read_into(FONT_ADDR, &mut zero);
        assert_eq!(zero, [0xF0, 0x90, 0x90, 0x90, 0xF0]);
        let f = FONT_ADDR + 0xf * FONT_GLYPH_BYTES;
        assert_eq!(m.get_byte(f + 4), 0x80);
        let nine = BIG_FONT_ADDR + 9 * BIG_FONT_GLYPH_BYTES;
        assert_eq!(m.get_byte(nine + 9), 0xFC);
        assert!(nine + BIG_FONT_GLYPH_BYTES <= PROGRAM_ADDR);
    }

    #[test]
    fn test_write_slice_ok() {
        let mut dst = MemoryImage::new();
        let src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        dst.write_from(8, src);
        assert_eq!(
            dst.bytes[..16],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn test_read_word() {
        let mut m = MemoryImage::new();
        m.write_from(0, &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(m.get_word(0x4), 0x0405);
    }

    #[test]
    fn test_access_wraps_at_top_of_ram() {
        let mut m = MemoryImage::new();
        m.write_from(0x0fff, &[0xaa, 0xbb]);
        assert_eq!(m.get_byte(0x0fff), 0xaa);
        assert_eq!(m.get_byte(0x0000), 0xbb);
        assert_eq!(m.get_byte(0x1000), 0xbb);
        assert_eq!(m.get_word(0x0fff), 0xaabb);
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = MemoryImage::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        dst.load_from(&mut prog)?;
        assert_eq!(dst.get_word(PROGRAM_ADDR), 0x00e0);
        Ok(())
    }

    #[test]
    fn test_program_fills_memory_exactly() -> Result<()> {
        let mut dst = MemoryImage::new();
        let prog = vec![0x11; MemoryImage::program_capacity()];
        dst.load_program(&prog)?;
        assert_eq!(dst.get_byte(0x0fff), 0x11);
        Ok(())
    }

    #[test]
    fn test_program_too_long_writes_nothing() {
        let mut dst = MemoryImage::new();
        let prog = vec![0x11; MemoryImage::program_capacity() + 1];
        match dst.load_program(&prog) {
            Err(Error::ProgramLoadOverflow { len, capacity }) => {
                assert_eq!(len, 0xe01);
                assert_eq!(capacity, 0xe00);
            }
            other => panic!("expected overflow, got {:?}", other),
        }
        assert_eq!(dst, MemoryImage::new());
    }
}
