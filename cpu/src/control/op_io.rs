use tracing::{event, Level};

use base::prelude::*;

use super::{ControlUnit, CurrentInstruction};
use crate::abort::{Fault, Violation};
use crate::io::IoSignal;
use crate::iostatus::select_code;
use crate::stop::StopReason;

impl ControlUnit {
    /// Implements the I/O group (HLT, STF, CLF, SFC, SFS, MIA, LIA,
    /// OTA, STC, CLC and their B-register forms).
    pub(super) fn op_io(&mut self, cur: &CurrentInstruction, op: IoOpcode) -> Result<(), Fault> {
        let inst = cur.instruction;
        let code = inst.select_code();
        let acc = inst.accumulator();

        // The instruction after any I/O instruction is executed
        // before an interrupt (other than power fail or memory
        // protect) is granted.
        self.ion_defer = true;

        if self.protect_enabled()
            && !cur.interrupt_entry
            && (op == IoOpcode::Halt || code != select_code::OVERFLOW)
        {
            if op == IoOpcode::LoadInto {
                self.regs.set_accumulator(acc, 0);
            }
            return Err(Violation::Io { select_code: code }.into());
        }

        let signal = match IoSignal::from_opcode(op) {
            Some(signal) => signal,
            None => {
                if inst.hold_clear() {
                    self.io_signal(cur, code, IoSignal::ClearFlag, 0);
                }
                event!(Level::DEBUG, "HLT {:02o} at {:05o}", code, cur.address);
                return Err(StopReason::Halt {
                    instruction: inst,
                    address: cur.address,
                }
                .into());
            }
        };

        let data = self.regs.accumulator(acc);
        let result = self.io_signal(cur, code, signal, data);
        match op {
            IoOpcode::MergeInto | IoOpcode::LoadInto => {
                self.regs.set_accumulator(acc, result.data);
            }
            IoOpcode::SkipIfFlagClear | IoOpcode::SkipIfFlagSet => {
                if result.skip {
                    self.skip();
                }
            }
            _ => (),
        }
        if op.uses_hold_clear_bit() && inst.hold_clear() {
            self.io_signal(cur, code, IoSignal::ClearFlag, 0);
        }
        Ok(())
    }
}
