//! Property tests for arithmetic flags, BCD and sprite drawing.

use phosphor8::config::MachineConfig;
use phosphor8::display::Display;
use phosphor8::interpreter::Interpreter;
use phosphor8::machine::Peripherals;
use phosphor8::memory::{MemoryImage, MemoryMap};
use proptest::prelude::*;
use std::sync::Arc;

/// load `program` at 0x200 and execute `steps` instructions
fn run(program: &[u8], steps: usize) -> Interpreter {
    let mut memory = MemoryImage::new();
    memory.load_program(program).unwrap();
    let mut i = Interpreter::new(memory, MachineConfig::default(), Arc::new(Peripherals::new()));
    for _ in 0..steps {
        assert_eq!(i.step(), Ok(None));
    }
    i
}

proptest! {
    #[test]
    fn add_sets_carry(a: u8, b: u8) {
        // LD V1, a; LD V2, b; ADD V1, V2
        let i = run(&[0x61, a, 0x62, b, 0x81, 0x24], 3);
        let (sum, carry) = a.overflowing_add(b);
        prop_assert_eq!(i.registers().v[1], sum);
        prop_assert_eq!(i.registers().vf(), carry as u8);
    }

    #[test]
    fn add_immediate_sets_carry(a: u8, b: u8) {
        let i = run(&[0x61, a, 0x71, b], 2);
        prop_assert_eq!(i.registers().v[1], a.wrapping_add(b));
        prop_assert_eq!(i.registers().vf(), (a as u16 + b as u16 > 0xff) as u8);
    }

    #[test]
    fn sub_flag_is_no_borrow(a: u8, b: u8) {
        let i = run(&[0x61, a, 0x62, b, 0x81, 0x25], 3);
        prop_assert_eq!(i.registers().v[1], a.wrapping_sub(b));
        prop_assert_eq!(i.registers().vf(), (a >= b) as u8);
    }

    #[test]
    fn subn_flag_is_no_borrow(a: u8, b: u8) {
        let i = run(&[0x61, a, 0x62, b, 0x81, 0x27], 3);
        prop_assert_eq!(i.registers().v[1], b.wrapping_sub(a));
        prop_assert_eq!(i.registers().vf(), (b >= a) as u8);
    }

    #[test]
    fn shifts_keep_the_lost_bit(a: u8) {
        let i = run(&[0x61, a, 0x81, 0x06], 2);
        prop_assert_eq!(i.registers().v[1], a >> 1);
        prop_assert_eq!(i.registers().vf(), a & 1);

        let i = run(&[0x61, a, 0x81, 0x0e], 2);
        prop_assert_eq!(i.registers().v[1], a << 1);
        prop_assert_eq!(i.registers().vf(), a >> 7);
    }

    #[test]
    fn bcd_digits(v: u8) {
        // LD V1, v; LD I, 0x300; LD B, V1
        let i = run(&[0x61, v, 0xa3, 0x00, 0xf1, 0x33], 3);
        let mut d = [0u8; 3];
        i.memory().read_into(0x300, &mut d);
        prop_assert!(d.iter().all(|&n| n < 10));
        prop_assert_eq!(d[0] as u16 * 100 + d[1] as u16 * 10 + d[2] as u16, v as u16);
    }

    #[test]
    fn drawing_twice_collides_and_clears(
        x: u8,
        y: u8,
        sprite in prop::collection::vec(any::<u8>(), 1..16),
    ) {
        let d = Display::new();
        prop_assert!(!d.draw(x, y, &sprite, 1));
        let collided = d.draw(x, y, &sprite, 1);
        prop_assert_eq!(collided, sprite.iter().any(|&b| b != 0));
        let f = d.frame();
        for py in 0..f.height {
            for px in 0..f.width {
                prop_assert!(!f.is_lit(px, py));
            }
        }
    }

    #[test]
    fn draw_position_wraps(x: u8, y: u8, row: u8) {
        let wrapped = Display::new();
        wrapped.draw(x, y, &[row], 1);
        let direct = Display::new();
        direct.draw(x % 64, y % 32, &[row], 1);
        prop_assert_eq!(wrapped.frame(), direct.frame());
    }

    #[test]
    fn memory_access_wraps(addr: u16, data in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut m = MemoryImage::new();
        m.write_from(addr, &data);
        let mut back = vec![0u8; data.len()];
        m.read_into(addr, &mut back);
        prop_assert_eq!(back, data);
    }
}
