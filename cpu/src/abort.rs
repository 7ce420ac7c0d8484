//! Protection violations and the way they end an instruction early.
//!
//! A violation detected anywhere inside an instruction (during
//! address translation, a memory write, or the instruction's own
//! checks) is returned as `Err(Fault::Abort(..))` and propagated
//! with `?` to [`ControlUnit::step`](crate::ControlUnit::step), which
//! is the only place it is handled.  Whatever the instruction did
//! before the violation (for example, loading a register) stays
//! done; only the violating access is suppressed.
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use base::prelude::*;

use crate::iostatus::{select_code, IoStatus};
use crate::mapping::MemoryProtect;
use crate::stop::StopReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A write below the memory protect fence.
    MemoryProtect { address: Address },
    /// An I/O instruction (or HLT) executed with memory protect on.
    Io { select_code: SelectCode },
    ReadProtect { page: PageNumber },
    WriteProtect { page: PageNumber },
    /// A user-map write to the unmapped part of the base page.
    BasePage { address: Address },
    /// A mapping instruction executed with memory protect on.
    Privileged { instruction: Instruction },
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MemoryProtect { address } => {
                write!(f, "write to protected address {address:05o}")
            }
            Violation::Io { select_code } => {
                write!(f, "protected I/O instruction for select code {select_code:02o}")
            }
            Violation::ReadProtect { page } => write!(f, "read from read-protected page {page:02o}"),
            Violation::WriteProtect { page } => {
                write!(f, "write to write-protected page {page:02o}")
            }
            Violation::BasePage { address } => {
                write!(f, "write to unmapped base page address {address:05o}")
            }
            Violation::Privileged { instruction } => {
                write!(f, "privileged instruction {instruction}")
            }
        }
    }
}

/// The ways in which an instruction can finish other than normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Abort(Violation),
    Stop(StopReason),
    /// The instruction gave way to a pending interrupt and will be
    /// executed again once the interrupt has been serviced.
    Retry,
}

impl From<Violation> for Fault {
    fn from(v: Violation) -> Fault {
        Fault::Abort(v)
    }
}

impl From<StopReason> for Fault {
    fn from(r: StopReason) -> Fault {
        Fault::Stop(r)
    }
}

/// Performs the processor's response to an aborted instruction: the
/// memory protect flag is set (which will interrupt, if the
/// interrupt system allows) and the violation register stops
/// following the program counter until memory protect is enabled
/// again.
pub(crate) fn resume_after_abort(
    status: &mut IoStatus,
    protect: &mut MemoryProtect,
    violation: &Violation,
) {
    event!(
        Level::DEBUG,
        "instruction at {:05o} aborted: {}",
        protect.violation_register(),
        violation
    );
    status.set_flag(select_code::MEMORY_PROTECT);
    protect.freeze();
}

#[test]
fn test_resume_after_abort_sets_flag_and_freezes() {
    let mut status = IoStatus::default();
    let mut protect = MemoryProtect::default();
    protect.arm();
    protect.note_instruction(Address::from(0o100_u8));
    resume_after_abort(
        &mut status,
        &mut protect,
        &Violation::MemoryProtect {
            address: Address::from(0o50_u8),
        },
    );
    assert!(status.flag(select_code::MEMORY_PROTECT));
    assert!(status.flag_buffer(select_code::MEMORY_PROTECT));
    protect.note_instruction(Address::from(0o200_u8));
    assert_eq!(protect.violation_register(), Address::from(0o100_u8));
}
