//! The alter/skip group.
//!
//! |0000 |A/B|1  |CL/CM|CL/CM E|SEZ|SSA|SLA|INA|SZA|RSS|
//! |-----|---|---|-----|-------|---|---|---|---|---|---|
//! |15-12|11 |10 |9-8  |7-6    |5  |4  |3  |2  |1  |0  |
//!
//! The micro-operations take effect in the order CLA/CMA/CCA, SEZ,
//! CLE/CME/CCE, SSA, SLA, INA, SZA.  Each skip test sees the values
//! left by the operations before it.  RSS reverses the sense of the
//! combined skip condition, so that RSS alone always skips.
use base::prelude::*;

use super::ControlUnit;

const SEZ: u16 = 0o40;
const SSA: u16 = 0o20;
const SLA: u16 = 0o10;
const INA: u16 = 0o4;
const SZA: u16 = 0o2;
const RSS: u16 = 0o1;

impl ControlUnit {
    pub(super) fn op_alter_skip(&mut self, inst: Instruction) {
        let bits = inst.bits();
        let acc = inst.accumulator();
        let mut value = self.regs.accumulator(acc);
        let mut skip = false;

        match (bits >> 8) & 0o3 {
            1 => value = 0,
            2 => value = !value,
            3 => value = 0o177777,
            _ => (),
        }
        if bits & SEZ != 0 && !self.regs.e {
            skip = true;
        }
        match (bits >> 6) & 0o3 {
            1 => self.regs.e = false,
            2 => self.regs.e = !self.regs.e,
            3 => self.regs.e = true,
            _ => (),
        }
        if bits & SSA != 0 && value & 0o100000 == 0 {
            skip = true;
        }
        if bits & SLA != 0 && value & 1 == 0 {
            skip = true;
        }
        if bits & INA != 0 {
            value = value.wrapping_add(1);
            if value == 0 {
                self.regs.e = true;
            }
            if value == 0o100000 {
                self.regs.o = true;
            }
        }
        if bits & SZA != 0 && value == 0 {
            skip = true;
        }
        if bits & RSS != 0 {
            skip = !skip;
        }

        self.regs.set_accumulator(acc, value);
        if skip {
            self.skip();
        }
    }
}
