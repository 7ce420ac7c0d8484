//! The extended arithmetic unit: multiply, divide, double-word load
//! and store, and the long shifts of the 32-bit B:A register pair
//! (B holds the more significant half).
//!
//! The dynamic mapping and index instructions share the extended
//! instruction space and are passed on from here.
use base::prelude::*;

use super::timing::eau_extra_cycles;
use super::{ControlUnit, CurrentInstruction};
use crate::abort::Fault;

const SIGN_32: u32 = 0x8000_0000;

impl ControlUnit {
    pub(super) fn op_eau(&mut self, cur: &CurrentInstruction, op: ExtendedOpcode) -> Result<(), Fault> {
        match op {
            ExtendedOpcode::Multiply => {
                let ea = self.operand_address(cur)?;
                let operand = self.read(ea)?;
                let product = i32::from(self.regs.a as i16) * i32::from(operand as i16);
                self.regs.set_double(product as u32);
                self.regs.o = false;
            }
            ExtendedOpcode::Divide => {
                let ea = self.operand_address(cur)?;
                let divisor = self.read(ea)? as i16;
                self.divide(divisor);
            }
            ExtendedOpcode::DoubleLoad => {
                let ea = self.operand_address(cur)?;
                self.regs.a = self.read(ea)?;
                self.regs.b = self.read(ea.wrapping_increment())?;
            }
            ExtendedOpcode::DoubleStore => {
                let ea = self.operand_address(cur)?;
                self.write(ea, self.regs.a)?;
                self.write(ea.wrapping_increment(), self.regs.b)?;
            }
            ExtendedOpcode::Shift(shift, count) => self.long_shift(shift, count),
            ExtendedOpcode::Dms(op) => return self.op_dms(cur, op),
            ExtendedOpcode::Index(op) => return self.op_index(cur, op),
        }
        self.cycles += eau_extra_cycles(op);
        Ok(())
    }

    /// Divides B:A by `divisor`.  When the quotient does not fit in
    /// 16 bits (or the divisor is zero) only the overflow bit is set.
    fn divide(&mut self, divisor: i16) {
        let dividend = self.regs.double() as i32;
        let divisor = i32::from(divisor);
        match dividend.checked_div(divisor) {
            Some(quotient) if i16::try_from(quotient).is_ok() => {
                let remainder = dividend % divisor;
                self.regs.a = quotient as u16;
                self.regs.b = remainder as u16;
                self.regs.o = false;
            }
            _ => {
                self.regs.o = true;
            }
        }
    }

    fn long_shift(&mut self, shift: LongShift, count: u8) {
        let value = self.regs.double();
        let count = u32::from(count);
        let result = match shift {
            LongShift::ArithmeticLeft => {
                self.regs.o = false;
                let sign = value & SIGN_32;
                let mut v = value;
                for _ in 0..count {
                    // A bit different from the sign leaving bit 30
                    // means the result no longer fits.
                    if (v << 1) & SIGN_32 != sign {
                        self.regs.o = true;
                    }
                    v = ((v << 1) & !SIGN_32) | sign;
                }
                v
            }
            LongShift::ArithmeticRight => {
                self.regs.o = false;
                ((value as i32) >> count) as u32
            }
            LongShift::LogicalLeft => value.checked_shl(count).unwrap_or(0),
            LongShift::LogicalRight => value.checked_shr(count).unwrap_or(0),
            LongShift::RotateLeft => value.rotate_left(count),
            LongShift::RotateRight => value.rotate_right(count),
        };
        self.regs.set_double(result);
    }
}
