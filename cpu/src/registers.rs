//! The processor's programmer-visible registers.
use serde::Serialize;

use base::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registers {
    pub a: u16,
    pub b: u16,
    pub p: Address,
    pub x: u16,
    pub y: u16,
    /// The switch register.
    pub s: u16,
    /// The address most recently placed on the memory bus.
    pub m: Address,
    /// The data most recently transferred over the memory bus.
    pub t: u16,
    /// Extend.
    pub e: bool,
    /// Overflow.
    pub o: bool,
}

impl Registers {
    pub fn accumulator(&self, which: Accumulator) -> u16 {
        match which {
            Accumulator::A => self.a,
            Accumulator::B => self.b,
        }
    }

    pub fn set_accumulator(&mut self, which: Accumulator, value: u16) {
        match which {
            Accumulator::A => self.a = value,
            Accumulator::B => self.b = value,
        }
    }

    pub fn index(&self, which: IndexRegister) -> u16 {
        match which {
            IndexRegister::X => self.x,
            IndexRegister::Y => self.y,
        }
    }

    pub fn set_index(&mut self, which: IndexRegister, value: u16) {
        match which {
            IndexRegister::X => self.x = value,
            IndexRegister::Y => self.y = value,
        }
    }

    /// The 32-bit double word held in B (most significant) and A.
    pub fn double(&self) -> u32 {
        (u32::from(self.b) << 16) | u32::from(self.a)
    }

    pub fn set_double(&mut self, value: u32) {
        self.b = (value >> 16) as u16;
        self.a = (value & 0xFFFF) as u16;
    }

    /// Adds `operand` to `augend` in the way ADA, ADB and ADX do: E
    /// is set on carry out and O is set on signed overflow, but
    /// neither is ever cleared.
    pub fn add_setting_flags(&mut self, augend: u16, operand: u16) -> u16 {
        let (sum, carry) = augend.overflowing_add(operand);
        if carry {
            self.e = true;
        }
        if (!(augend ^ operand) & (augend ^ sum)) & 0x8000 != 0 {
            self.o = true;
        }
        sum
    }
}

#[test]
fn test_double_word() {
    let mut regs = Registers::default();
    regs.set_double(0o12345_67012);
    assert_eq!(regs.double(), 0o12345_67012);
    assert_eq!(u32::from(regs.b), 0o12345_67012 >> 16);
    assert_eq!(u32::from(regs.a), 0o12345_67012 & 0xFFFF);
}

#[test]
fn test_add_sets_carry_and_overflow_but_never_clears() {
    let mut regs = Registers::default();
    assert_eq!(regs.add_setting_flags(0o177777, 1), 0);
    assert!(regs.e);
    assert!(!regs.o);
    assert_eq!(regs.add_setting_flags(0o077777, 1), 0o100000);
    assert!(regs.o);
    // Neither flag is cleared by a later add which sets neither.
    assert_eq!(regs.add_setting_flags(1, 1), 2);
    assert!(regs.e);
    assert!(regs.o);
}
