//! Implementations of the index register group:
//! - SAX, SBX, SAY, SBY, LAX, LBX, LAY, LBY: indexed store and load
//! - CAX, CBX, CAY, CBY, CXA, CXB, CYA, CYB: register copies
//! - XAX, XBX, XAY, XBY: exchanges
//! - STX, STY, LDX, LDY, ADX, ADY: memory operations on X and Y
//! - ISX, ISY, DSX, DSY: increment or decrement and skip if zero
//! - JLY, JPY: jumps using Y
//!
//! Instructions which take an operand address find it in the word
//! following the instruction.

use base::prelude::*;

use super::{ControlUnit, CurrentInstruction};
use crate::abort::Fault;

impl ControlUnit {
    pub(super) fn op_index(&mut self, cur: &CurrentInstruction, op: IndexOpcode) -> Result<(), Fault> {
        let acc = cur.instruction.accumulator();
        match op {
            IndexOpcode::StoreIndexed(reg) => {
                let ea = self.indexed_operand_address(cur, reg)?;
                let value = self.regs.accumulator(acc);
                self.write(ea, value)?;
            }
            IndexOpcode::CopyToIndex(reg) => {
                let value = self.regs.accumulator(acc);
                self.regs.set_index(reg, value);
            }
            IndexOpcode::LoadIndexed(reg) => {
                let ea = self.indexed_operand_address(cur, reg)?;
                let value = self.read(ea)?;
                self.regs.set_accumulator(acc, value);
            }
            IndexOpcode::StoreIndex(reg) => {
                let ea = self.operand_address(cur)?;
                let value = self.regs.index(reg);
                self.write(ea, value)?;
            }
            IndexOpcode::CopyFromIndex(reg) => {
                let value = self.regs.index(reg);
                self.regs.set_accumulator(acc, value);
            }
            IndexOpcode::LoadIndex(reg) => {
                let ea = self.operand_address(cur)?;
                let value = self.read(ea)?;
                self.regs.set_index(reg, value);
            }
            IndexOpcode::AddToIndex(reg) => {
                let ea = self.operand_address(cur)?;
                let operand = self.read(ea)?;
                let sum = self.regs.add_setting_flags(self.regs.index(reg), operand);
                self.regs.set_index(reg, sum);
            }
            IndexOpcode::ExchangeIndex(reg) => {
                let index = self.regs.index(reg);
                let value = self.regs.accumulator(acc);
                self.regs.set_index(reg, value);
                self.regs.set_accumulator(acc, index);
            }
            IndexOpcode::IncrementSkip(reg) => self.index_step_skip(reg, 1),
            IndexOpcode::DecrementSkip(reg) => self.index_step_skip(reg, 0o177777),
            IndexOpcode::JumpLoadY => {
                let ea = self.operand_address(cur)?;
                self.check_jump(cur, ea)?;
                self.regs.y = u16::from(self.regs.p);
                self.regs.p = ea;
            }
            IndexOpcode::JumpIndexedY => {
                // The following word is an immediate offset, not an
                // address, so it is never indirect.
                let offset = self.next_word()?;
                let target = Address::from_low_bits(offset.wrapping_add(self.regs.y));
                self.check_jump(cur, target)?;
                self.regs.p = target;
            }
        }
        Ok(())
    }

    fn indexed_operand_address(
        &mut self,
        cur: &CurrentInstruction,
        reg: IndexRegister,
    ) -> Result<Address, Fault> {
        let base = self.operand_address(cur)?;
        Ok(Address::from_low_bits(
            u16::from(base).wrapping_add(self.regs.index(reg)),
        ))
    }

    fn index_step_skip(&mut self, reg: IndexRegister, step: u16) {
        let value = self.regs.index(reg).wrapping_add(step);
        self.regs.set_index(reg, value);
        if value == 0 {
            self.skip();
        }
    }
}
