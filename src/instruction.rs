//! Decoding of two-byte opcode words, and a mnemonic rendering of them for
//! logs and listings.
//!
//! Opcode layout: the top nibble picks the class; the rest is some mix of
//!   X   = bits 8-11, a V register
//!   Y   = bits 4-7, a V register
//!   N   = bits 0-3, a 4 bit immediate
//!   NN  = bits 0-7, a byte immediate
//!   NNN = bits 0-11, an address
use std::fmt;

/// the register-register operations of class 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Load,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubN,
    ShiftLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 00CN
    ScrollDown(u8),
    /// 00DN
    ScrollUp(u8),
    /// 00FB
    ScrollRight,
    /// 00FC
    ScrollLeft,
    /// 00FD
    Exit,
    /// 00FE
    LowRes,
    /// 00FF
    HighRes,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm(usize, u8),
    /// 4XNN
    SkipNeImm(usize, u8),
    /// 5XY0
    SkipEqReg(usize, usize),
    /// 6XNN
    LoadImm(usize, u8),
    /// 7XNN
    AddImm(usize, u8),
    /// 8XYn
    Alu(AluOp, usize, usize),
    /// 9XY0
    SkipNeReg(usize, usize),
    /// ANNN
    LoadI(u16),
    /// BNNN
    JumpV0(u16),
    /// CXNN
    Random(usize, u8),
    /// DXYN
    Draw(usize, usize, u8),
    /// EX9E
    SkipKey(usize),
    /// EXA1
    SkipNoKey(usize),
    /// FX07
    GetDelay(usize),
    /// FX0A
    WaitKey(usize),
    /// FX15
    SetDelay(usize),
    /// FX18
    SetSound(usize),
    /// FX1E
    AddI(usize),
    /// FX29
    Glyph(usize),
    /// FX30
    BigGlyph(usize),
    /// FX33
    Bcd(usize),
    /// FX55
    Store(usize),
    /// FX65
    Load(usize),
    /// FX75
    StoreFlags(usize),
    /// FX85
    LoadFlags(usize),
}

impl Instruction {
    /// None for anything this machine doesn't implement
    pub fn decode(word: u16) -> Option<Instruction> {
        use Instruction::*;
        let x = ((word >> 8) & 0xf) as usize;
        let y = ((word >> 4) & 0xf) as usize;
        let n = (word & 0xf) as u8;
        let nn = (word & 0xff) as u8;
        let nnn = word & 0xfff;

        let i = match word >> 12 {
            0x0 => match word & 0x0fff {
                0x0e0 => Clear,
                0x0ee => Return,
                0x0fb => ScrollRight,
                0x0fc => ScrollLeft,
                0x0fd => Exit,
                0x0fe => LowRes,
                0x0ff => HighRes,
                w if w & 0xff0 == 0x0c0 => ScrollDown(n),
                w if w & 0xff0 == 0x0d0 => ScrollUp(n),
                _ => return None,
            },
            0x1 => Jump(nnn),
            0x2 => Call(nnn),
            0x3 => SkipEqImm(x, nn),
            0x4 => SkipNeImm(x, nn),
            0x5 if n == 0 => SkipEqReg(x, y),
            0x6 => LoadImm(x, nn),
            0x7 => AddImm(x, nn),
            0x8 => {
                let op = match n {
                    0x0 => AluOp::Load,
                    0x1 => AluOp::Or,
                    0x2 => AluOp::And,
                    0x3 => AluOp::Xor,
                    0x4 => AluOp::Add,
                    0x5 => AluOp::Sub,
                    0x6 => AluOp::ShiftRight,
                    0x7 => AluOp::SubN,
                    0xe => AluOp::ShiftLeft,
                    _ => return None,
                };
                Alu(op, x, y)
            }
            0x9 if n == 0 => SkipNeReg(x, y),
            0xa => LoadI(nnn),
            0xb => JumpV0(nnn),
            0xc => Random(x, nn),
            0xd => Draw(x, y, n),
            0xe => match nn {
                0x9e => SkipKey(x),
                0xa1 => SkipNoKey(x),
                _ => return None,
            },
            0xf => match nn {
                0x07 => GetDelay(x),
                0x0a => WaitKey(x),
                0x15 => SetDelay(x),
                0x18 => SetSound(x),
                0x1e => AddI(x),
                0x29 => Glyph(x),
                0x30 => BigGlyph(x),
                0x33 => Bcd(x),
                0x55 => Store(x),
                0x65 => Load(x),
                0x75 => StoreFlags(x),
                0x85 => LoadFlags(x),
                _ => return None,
            },
            _ => return None,
        };
        Some(i)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            ScrollDown(n) => write!(f, "SCD {n}"),
            ScrollUp(n) => write!(f, "SCU {n}"),
            ScrollRight => write!(f, "SCR"),
            ScrollLeft => write!(f, "SCL"),
            Exit => write!(f, "EXIT"),
            LowRes => write!(f, "LOW"),
            HighRes => write!(f, "HIGH"),
            Jump(a) => write!(f, "JP {a:#05x}"),
            Call(a) => write!(f, "CALL {a:#05x}"),
            SkipEqImm(x, b) => write!(f, "SE V{x:X}, {b:#04x}"),
            SkipNeImm(x, b) => write!(f, "SNE V{x:X}, {b:#04x}"),
            SkipEqReg(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            LoadImm(x, b) => write!(f, "LD V{x:X}, {b:#04x}"),
            AddImm(x, b) => write!(f, "ADD V{x:X}, {b:#04x}"),
            Alu(op, x, y) => {
                let m = match op {
                    AluOp::Load => "LD",
                    AluOp::Or => "OR",
                    AluOp::And => "AND",
                    AluOp::Xor => "XOR",
                    AluOp::Add => "ADD",
                    AluOp::Sub => "SUB",
                    AluOp::ShiftRight => "SHR",
                    AluOp::SubN => "SUBN",
                    AluOp::ShiftLeft => "SHL",
                };
                write!(f, "{m} V{x:X}, V{y:X}")
            }
            SkipNeReg(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            LoadI(a) => write!(f, "LD I, {a:#05x}"),
            JumpV0(a) => write!(f, "JP V0, {a:#05x}"),
            Random(x, b) => write!(f, "RND V{x:X}, {b:#04x}"),
            Draw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            SkipKey(x) => write!(f, "SKP V{x:X}"),
            SkipNoKey(x) => write!(f, "SKNP V{x:X}"),
            GetDelay(x) => write!(f, "LD V{x:X}, DT"),
            WaitKey(x) => write!(f, "LD V{x:X}, K"),
            SetDelay(x) => write!(f, "LD DT, V{x:X}"),
            SetSound(x) => write!(f, "LD ST, V{x:X}"),
            AddI(x) => write!(f, "ADD I, V{x:X}"),
            Glyph(x) => write!(f, "LD F, V{x:X}"),
            BigGlyph(x) => write!(f, "LD HF, V{x:X}"),
            Bcd(x) => write!(f, "LD B, V{x:X}"),
            Store(x) => write!(f, "LD [I], V{x:X}"),
            Load(x) => write!(f, "LD V{x:X}, [I]"),
            StoreFlags(x) => write!(f, "LD R, V{x:X}"),
            LoadFlags(x) => write!(f, "LD V{x:X}, R"),
        }
    }
}

/// A contiguous run of a program, as guessed by `disassemble`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Code(Vec<(u16, Instruction)>),
    Data(u16, Vec<u8>),
}

/// A fairly naive disassembler. Walks the bytes two at a time, treating
/// anything that decodes as code; when a word doesn't decode, one byte is
/// taken as data and it tries again from the next byte.
pub fn disassemble(code: &[u8], base: u16) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut idx = 0;
    while idx < code.len() {
        let addr = base.wrapping_add(idx as u16);
        let decoded = code
            .get(idx + 1)
            .and_then(|&b2| Instruction::decode((code[idx] as u16) << 8 | b2 as u16));
        match (decoded, segments.last_mut()) {
            (Some(i), Some(Segment::Code(run))) => {
                run.push((addr, i));
                idx += 2;
            }
            (Some(i), _) => {
                segments.push(Segment::Code(vec![(addr, i)]));
                idx += 2;
            }
            (None, Some(Segment::Data(_, bytes))) => {
                bytes.push(code[idx]);
                idx += 1;
            }
            (None, _) => {
                segments.push(Segment::Data(addr, vec![code[idx]]));
                idx += 1;
            }
        }
    }
    segments
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Code(run) => {
                writeln!(f, "CODE:")?;
                for (addr, i) in run {
                    writeln!(f, "  {addr:#05x}  {i}")?;
                }
            }
            Segment::Data(addr, bytes) => {
                writeln!(f, "DATA:")?;
                for (n, chunk) in bytes.chunks(8).enumerate() {
                    let line: Vec<String> = chunk.iter().map(|b| format!("{b:#04x}")).collect();
                    let at = addr.wrapping_add((n * 8) as u16);
                    writeln!(f, "  {:#05x}  {}", at, line.join(" "))?;
                }
            }
        }
        Ok(())
    }
}
