//! Reasons for which simulation stops and control returns to the
//! caller.
//!
//! Most abnormal conditions on this machine are visible only to the
//! program running on it (a memory protect violation becomes an
//! interrupt, a DMA overrun becomes a device status bit).  The
//! conditions here are the ones which matter to the operator.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::prelude::*;

/// Describes whether a particular kind of stop can be masked.
#[derive(Debug, PartialEq, Eq)]
pub enum StopMaskability {
    Maskable,
    Unmaskable,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum StopKind {
    Halt,
    Breakpoint,
    IndirectLoop,
    Unimplemented,
    NonexistentDevice,
    InstructionLimit,
}

impl StopKind {
    #[must_use]
    pub fn maskable(&self) -> StopMaskability {
        match self {
            StopKind::Unimplemented | StopKind::NonexistentDevice => StopMaskability::Maskable,
            StopKind::Halt
            | StopKind::Breakpoint
            | StopKind::IndirectLoop
            | StopKind::InstructionLimit => StopMaskability::Unmaskable,
        }
    }

    #[must_use]
    pub const fn all_stop_kinds() -> [StopKind; 6] {
        [
            StopKind::Halt,
            StopKind::Breakpoint,
            StopKind::IndirectLoop,
            StopKind::Unimplemented,
            StopKind::NonexistentDevice,
            StopKind::InstructionLimit,
        ]
    }
}

impl Display for StopKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            StopKind::Halt => "halt",
            StopKind::Breakpoint => "breakpoint",
            StopKind::IndirectLoop => "indirect-loop",
            StopKind::Unimplemented => "unimplemented",
            StopKind::NonexistentDevice => "nonexistent-device",
            StopKind::InstructionLimit => "instruction-limit",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// A HLT instruction was executed.  P has already been advanced
    /// past it.
    Halt {
        instruction: Instruction,
        address: Address,
    },

    /// An instruction fetch was about to take place from an address
    /// at which a breakpoint is set.
    Breakpoint { address: Address },

    /// Indirect address resolution exceeded the configured chain
    /// length.  P still points at the instruction.
    IndirectLoop { address: Address },

    /// An instruction word which has no defined meaning was
    /// fetched.  P still points at the instruction.
    Unimplemented {
        instruction: Instruction,
        address: Address,
    },

    /// An I/O instruction (or DMA cycle) addressed a select code
    /// with no device.  `address` is the location of the instruction
    /// which did so.
    NonexistentDevice {
        select_code: SelectCode,
        address: Address,
    },

    /// The caller's limit on the number of steps was reached.
    InstructionLimit,
}

impl StopReason {
    pub fn kind(&self) -> StopKind {
        match self {
            StopReason::Halt { .. } => StopKind::Halt,
            StopReason::Breakpoint { .. } => StopKind::Breakpoint,
            StopReason::IndirectLoop { .. } => StopKind::IndirectLoop,
            StopReason::Unimplemented { .. } => StopKind::Unimplemented,
            StopReason::NonexistentDevice { .. } => StopKind::NonexistentDevice,
            StopReason::InstructionLimit => StopKind::InstructionLimit,
        }
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            StopReason::Halt {
                instruction,
                address,
            } => write!(
                f,
                "programmed halt {:06o} at {:05o}",
                instruction.bits(),
                address
            ),
            StopReason::Breakpoint { address } => write!(f, "breakpoint at {address:05o}"),
            StopReason::IndirectLoop { address } => write!(
                f,
                "indirect address loop in instruction at {address:05o}"
            ),
            StopReason::Unimplemented {
                instruction,
                address,
            } => write!(
                f,
                "unimplemented instruction {:06o} at {:05o}",
                instruction.bits(),
                address
            ),
            StopReason::NonexistentDevice {
                select_code,
                address,
            } => write!(
                f,
                "no device at select code {select_code:02o} (instruction at {address:05o})"
            ),
            StopReason::InstructionLimit => f.write_str("instruction limit reached"),
        }
    }
}

impl Error for StopReason {}

#[test]
fn test_stop_reason_display() {
    let halt = StopReason::Halt {
        instruction: Instruction::new(0o102077),
        address: Address::from_low_bits(0o2005),
    };
    assert_eq!(halt.to_string(), "programmed halt 102077 at 02005");
    assert_eq!(halt.kind(), StopKind::Halt);
    let nxd = StopReason::NonexistentDevice {
        select_code: SelectCode::from_low_bits(0o41),
        address: Address::from_low_bits(0o100),
    };
    assert_eq!(
        nxd.to_string(),
        "no device at select code 41 (instruction at 00100)"
    );
}

#[test]
fn test_only_configurable_stops_are_maskable() {
    for kind in StopKind::all_stop_kinds() {
        let expected = matches!(kind, StopKind::Unimplemented | StopKind::NonexistentDevice);
        assert_eq!(kind.maskable() == StopMaskability::Maskable, expected, "{kind}");
    }
}
