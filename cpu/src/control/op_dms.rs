//! The dynamic mapping system instructions.
//!
//! Those which load map registers or change the mapping state are
//! privileged: with memory protect enabled they abort with a
//! privileged-instruction violation.
use tracing::{event, Level};

use base::prelude::*;

use super::{ControlUnit, CurrentInstruction};
use crate::abort::Fault;
use crate::mapping::{MapSelector, MAP_SIZE};

const STORE_MAP: u16 = 0o100000;

impl ControlUnit {
    pub(super) fn op_dms(&mut self, cur: &CurrentInstruction, op: DmsOpcode) -> Result<(), Fault> {
        let acc = cur.instruction.accumulator();
        match op {
            DmsOpcode::TransferMapsMemory => self.transfer_maps_memory(cur),
            DmsOpcode::TransferMapsSequential => {
                self.privileged(cur)?;
                let mut register = self.regs.a;
                let mut value = self.regs.b;
                let mut count = self.regs.x as i16;
                while count > 0 {
                    self.mapping.set_map_register(register, value);
                    register = register.wrapping_add(1);
                    value = value.wrapping_add(1);
                    count -= 1;
                }
                self.regs.a = register;
                self.regs.b = value;
                self.regs.x = count as u16;
                Ok(())
            }
            DmsOpcode::CrossLoad => {
                let ea = self.operand_address(cur)?;
                let value = self.read_via(ea, MapSelector::Alternate)?;
                self.regs.set_accumulator(acc, value);
                Ok(())
            }
            DmsOpcode::CrossStore => {
                let ea = self.operand_address(cur)?;
                let value = self.regs.accumulator(acc);
                self.write_via(ea, MapSelector::Alternate, value)
            }
            DmsOpcode::CrossCompare => {
                let ea = self.operand_address(cur)?;
                if self.read_via(ea, MapSelector::Alternate)? != self.regs.accumulator(acc) {
                    self.skip();
                }
                Ok(())
            }
            DmsOpcode::LoadFence => {
                self.privileged(cur)?;
                let value = self.regs.accumulator(acc);
                self.mapping.set_fence_status(value);
                Ok(())
            }
            DmsOpcode::ReadStatus => {
                let status = self.mapping.status_register(self.protect_enabled());
                self.regs.set_accumulator(acc, status);
                Ok(())
            }
            DmsOpcode::ReadViolation => {
                let violation = self.mapping.violation_register();
                self.regs.set_accumulator(acc, violation);
                Ok(())
            }
            DmsOpcode::DisableJump => self.map_jump(cur, None, false),
            DmsOpcode::DisableJumpSubroutine => self.map_jump(cur, None, true),
            DmsOpcode::SystemJump => self.map_jump(cur, Some(false), false),
            DmsOpcode::SystemJumpSubroutine => self.map_jump(cur, Some(false), true),
            DmsOpcode::UserJump => self.map_jump(cur, Some(true), false),
            DmsOpcode::UserJumpSubroutine => self.map_jump(cur, Some(true), true),
            DmsOpcode::SystemMap => self.transfer_whole_map(cur, MapSelector::System),
            DmsOpcode::UserMap => self.transfer_whole_map(cur, MapSelector::User),
            DmsOpcode::PortAMap => self.transfer_whole_map(cur, MapSelector::PortA),
            DmsOpcode::PortBMap => self.transfer_whole_map(cur, MapSelector::PortB),
            DmsOpcode::StoreStatus => {
                let ea = self.operand_address(cur)?;
                let status = self.mapping.status_register(self.protect_enabled());
                self.write(ea, status)
            }
            DmsOpcode::JumpRestoreStatus => {
                let status_at = self.operand_address(cur)?;
                let target = self.operand_address(cur)?;
                self.privileged(cur)?;
                let status = self.read(status_at)?;
                self.mapping.restore_status(status);
                event!(
                    Level::TRACE,
                    "JRS to {:05o}; mapping {}, user map {}",
                    target,
                    self.mapping.is_enabled(),
                    self.mapping.is_user_map()
                );
                self.regs.p = target;
                Ok(())
            }
        }
    }

    /// Aborts the instruction if memory protect is enabled.
    fn privileged(&mut self, cur: &CurrentInstruction) -> Result<(), Fault> {
        if self.protect_enabled() && !cur.interrupt_entry {
            Err(self.mapping.privileged_violation(cur.instruction).into())
        } else {
            Ok(())
        }
    }

    /// XMM: A holds the first map register number, B the memory
    /// address and X the count.  A positive count loads map
    /// registers from memory; a negative one stores them.
    fn transfer_maps_memory(&mut self, cur: &CurrentInstruction) -> Result<(), Fault> {
        let count = self.regs.x as i16;
        if count > 0 {
            self.privileged(cur)?;
        }
        while self.regs.x != 0 {
            let address = Address::from_low_bits(self.regs.b);
            if (self.regs.x as i16) > 0 {
                let value = self.read(address)?;
                self.mapping.set_map_register(self.regs.a, value);
                self.regs.x -= 1;
            } else {
                let value = self.mapping.map_register(self.regs.a);
                self.write(address, value)?;
                self.regs.x = self.regs.x.wrapping_add(1);
            }
            self.regs.a = self.regs.a.wrapping_add(1);
            self.regs.b = self.regs.b.wrapping_add(1);
        }
        Ok(())
    }

    /// SY*, US*, PA*, PB*: bit 15 of the register selects a store
    /// of the whole map into memory (set) or a load from memory
    /// (clear).  The register is left pointing past the block.
    fn transfer_whole_map(&mut self, cur: &CurrentInstruction, map: MapSelector) -> Result<(), Fault> {
        let acc = cur.instruction.accumulator();
        let register = self.regs.accumulator(acc);
        let store = register & STORE_MAP != 0;
        if !store {
            self.privileged(cur)?;
        }
        let base = self.mapping.map_base(map);
        let mut address = Address::from_low_bits(register);
        for n in 0..MAP_SIZE {
            let map_register = u16::try_from(base + n).unwrap_or_default();
            if store {
                let value = self.mapping.map_register(map_register);
                self.write(address, value)?;
            } else {
                let value = self.read(address)?;
                self.mapping.set_map_register(map_register, value);
            }
            address = address.wrapping_increment();
        }
        self.regs
            .set_accumulator(acc, u16::from(address) | (register & STORE_MAP));
        Ok(())
    }

    /// DJP, DJS, SJP, SJS, UJP, UJS: change the mapping state
    /// (`None` disables mapping, otherwise it is enabled with the
    /// user or system map), then jump or jump to subroutine.
    fn map_jump(
        &mut self,
        cur: &CurrentInstruction,
        user_map: Option<bool>,
        subroutine: bool,
    ) -> Result<(), Fault> {
        let ea = self.operand_address(cur)?;
        self.privileged(cur)?;
        match user_map {
            None => self.mapping.disable(),
            Some(user) => self.mapping.enable(user),
        }
        if subroutine {
            let ret = u16::from(self.regs.p);
            self.write(ea, ret)?;
            self.regs.p = ea.wrapping_increment();
        } else {
            self.regs.p = ea;
        }
        Ok(())
    }
}
