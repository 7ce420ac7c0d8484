use base::prelude::*;

use super::{ControlUnit, CurrentInstruction};
use crate::abort::Fault;

impl ControlUnit {
    /// Implements the memory reference group.
    pub(super) fn op_memory_reference(
        &mut self,
        cur: &CurrentInstruction,
        op: MemoryOpcode,
    ) -> Result<(), Fault> {
        let inst = cur.instruction;
        let ea = self.resolve_indirect(cur, inst.direct_address(cur.address), inst.is_indirect())?;
        let acc = op.accumulator();
        match op {
            MemoryOpcode::And => {
                let operand = self.read(ea)?;
                self.regs.a &= operand;
            }
            MemoryOpcode::Xor => {
                let operand = self.read(ea)?;
                self.regs.a ^= operand;
            }
            MemoryOpcode::Ior => {
                let operand = self.read(ea)?;
                self.regs.a |= operand;
            }
            MemoryOpcode::Jsb => {
                self.check_jump(cur, ea)?;
                let ret = u16::from(self.regs.p);
                self.write(ea, ret)?;
                self.regs.p = ea.wrapping_increment();
            }
            MemoryOpcode::Jmp => {
                self.check_jump(cur, ea)?;
                self.regs.p = ea;
            }
            MemoryOpcode::Isz => {
                let value = self.read(ea)?.wrapping_add(1);
                self.write(ea, value)?;
                if value == 0 {
                    self.skip();
                }
            }
            MemoryOpcode::Ada | MemoryOpcode::Adb => {
                let operand = self.read(ea)?;
                let sum = self
                    .regs
                    .add_setting_flags(self.regs.accumulator(acc), operand);
                self.regs.set_accumulator(acc, sum);
            }
            MemoryOpcode::Cpa | MemoryOpcode::Cpb => {
                if self.read(ea)? != self.regs.accumulator(acc) {
                    self.skip();
                }
            }
            MemoryOpcode::Lda | MemoryOpcode::Ldb => {
                let value = self.read(ea)?;
                self.regs.set_accumulator(acc, value);
            }
            MemoryOpcode::Sta | MemoryOpcode::Stb => {
                self.write(ea, self.regs.accumulator(acc))?;
            }
        }
        Ok(())
    }
}
