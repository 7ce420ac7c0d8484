//! The shift/rotate group.
//!
//! |0000|A/B |0   |D/E |Shift 1|CLE |E   |SLA |Shift 2|
//! |----|----|----|----|-------|----|----|----|-------|
//! |15-12|11 |10  |9   |8-6    |5   |4   |3   |2-0    |
//!
//! The micro-operations happen in the order: first shift (if bit 9
//! is set), CLE, SLA, second shift (if bit 4 is set).
use base::prelude::*;

use super::ControlUnit;

const SHIFT_1_ENABLE: u16 = 0o1000;
const CLEAR_E: u16 = 0o40;
const SHIFT_2_ENABLE: u16 = 0o20;
const SKIP_IF_LSB_CLEAR: u16 = 0o10;

impl ControlUnit {
    pub(super) fn op_shift_rotate(&mut self, inst: Instruction) {
        let bits = inst.bits();
        let acc = inst.accumulator();
        let mut value = self.regs.accumulator(acc);
        if bits & SHIFT_1_ENABLE != 0 {
            value = self.micro_shift((bits >> 6) & 0o7, value);
        }
        if bits & CLEAR_E != 0 {
            self.regs.e = false;
        }
        if bits & SKIP_IF_LSB_CLEAR != 0 && value & 1 == 0 {
            self.skip();
        }
        if bits & SHIFT_2_ENABLE != 0 {
            value = self.micro_shift(bits & 0o7, value);
        }
        self.regs.set_accumulator(acc, value);
    }

    fn micro_shift(&mut self, op: u16, value: u16) -> u16 {
        match op {
            // ALS
            0 => (value & 0o100000) | ((value << 1) & 0o077777),
            // ARS
            1 => ((value as i16) >> 1) as u16,
            // RAL
            2 => value.rotate_left(1),
            // RAR
            3 => value.rotate_right(1),
            // ALR
            4 => (value << 1) & 0o077777,
            // ERA
            5 => {
                let e = self.regs.e;
                self.regs.e = value & 1 != 0;
                (value >> 1) | if e { 0o100000 } else { 0 }
            }
            // ELA
            6 => {
                let e = self.regs.e;
                self.regs.e = value & 0o100000 != 0;
                (value << 1) | u16::from(e)
            }
            // ALF
            _ => value.rotate_left(4),
        }
    }
}
