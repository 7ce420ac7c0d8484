//! The dynamic mapping system and memory protect.
//!
//! ## Maps
//!
//! There are four maps (system, user, port A and port B) of 32
//! registers each, one register per logical page.  A map register
//! looks like this:
//!
//! | Read protect | Write protect | (unused) | Physical page |
//! | ------------ | ------------- | -------- | ------------- |
//! | 15           | 14            | 13-10    | 9-0           |
//!
//! The registers are numbered 0 to 127: the system map first, then
//! the user map, then the two DMA port maps.
//!
//! ## Base page fence
//!
//! Part of logical page 0 is not mapped at all: it always refers to
//! physical page 0, so that the system and user programs can share
//! it.  Which part is decided by the fence address and direction bit
//! held in the status register: with the direction bit set,
//! addresses below the fence are unmapped; with it clear, addresses
//! at or above the fence are unmapped.
//!
//! ## Memory protect
//!
//! Memory protect is a separate, older, mechanism.  When it is
//! enabled (that is, when control is set on select code 5) writes to
//! addresses from 2 up to (but not including) the memory protect
//! fence are forbidden, as are jumps below the fence and I/O
//! instructions.  Memory protect must be enabled for the mapping
//! system's own violations to abort an instruction.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;
use base::u15;

use crate::abort::Violation;

#[cfg(test)]
mod tests;

/// The number of map registers in each map.
pub const MAP_SIZE: usize = 32;
/// The total number of map registers.
pub const MAP_REGISTERS: usize = 4 * MAP_SIZE;

const READ_PROTECT: u16 = 0o100000;
const WRITE_PROTECT: u16 = 0o040000;
const PHYSICAL_PAGE: u16 = 0o001777;

const STATUS_ENABLED_AT_INTERRUPT: u16 = 0o100000;
const STATUS_USER_AT_INTERRUPT: u16 = 0o040000;
const STATUS_ENABLED: u16 = 0o020000;
const STATUS_USER: u16 = 0o010000;
const STATUS_PROTECT: u16 = 0o004000;
const STATUS_FENCE_DIRECTION: u16 = 0o002000;
const STATUS_FENCE: u16 = 0o001777;

const VIOLATION_READ: u16 = 0o100000;
const VIOLATION_WRITE: u16 = 0o040000;
const VIOLATION_BASE_PAGE: u16 = 0o020000;
const VIOLATION_PRIVILEGED: u16 = 0o010000;
const VIOLATION_ENABLED: u16 = 0o000200;
const VIOLATION_USER: u16 = 0o000100;

/// Addresses 0 and 1 are the A and B registers, which are never
/// protected.
const FIRST_PROTECTED: Address = u15!(2);

/// Selects the map through which an access is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MapSelector {
    /// Whichever of the system and user maps is current.
    Current,
    /// Whichever of the system and user maps is not current (used by
    /// the cross-map instructions).
    Alternate,
    System,
    User,
    PortA,
    PortB,
}

impl MapSelector {
    /// The number of the selected map (0 to 3).
    fn map_number(self, user_map: bool) -> usize {
        match self {
            MapSelector::Current => usize::from(user_map),
            MapSelector::Alternate => usize::from(!user_map),
            MapSelector::System => 0,
            MapSelector::User => 1,
            MapSelector::PortA => 2,
            MapSelector::PortB => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccessKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapIndexError(pub usize);

impl Display for MapIndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map register {} does not exist (there are {MAP_REGISTERS})",
            self.0
        )
    }
}

impl Error for MapIndexError {}

/// The memory protect fence and violation register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryProtect {
    fence: Address,
    /// The address of the most recent instruction, while armed.
    violation_address: Address,
    evr_armed: bool,
    /// The first address which caused a violation since memory
    /// protect was last enabled.
    fault_address: Option<Address>,
}

impl Default for MemoryProtect {
    fn default() -> MemoryProtect {
        MemoryProtect {
            fence: Address::ZERO,
            violation_address: Address::ZERO,
            evr_armed: true,
            fault_address: None,
        }
    }
}

impl MemoryProtect {
    pub fn fence(&self) -> Address {
        self.fence
    }

    pub fn set_fence(&mut self, fence: Address) {
        self.fence = fence;
    }

    /// Records the address of an instruction about to execute.
    pub fn note_instruction(&mut self, address: Address) {
        if self.evr_armed {
            self.violation_address = address;
        }
    }

    /// Called when memory protect is enabled (STC 5).
    pub fn arm(&mut self) {
        self.evr_armed = true;
        self.fault_address = None;
    }

    /// Called when an instruction is aborted.
    pub fn freeze(&mut self) {
        self.evr_armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.evr_armed
    }

    /// The value read by LIA 5.
    pub fn violation_register(&self) -> Address {
        self.violation_address
    }

    pub fn fault_address(&self) -> Option<Address> {
        self.fault_address
    }

    fn record_fault(&mut self, address: Address) {
        if self.fault_address.is_none() {
            self.fault_address = Some(address);
        }
    }

    pub fn check_write(&mut self, address: Address) -> Result<(), Violation> {
        if address >= FIRST_PROTECTED && address < self.fence {
            self.record_fault(address);
            Err(Violation::MemoryProtect { address })
        } else {
            Ok(())
        }
    }

    /// Jumps are checked against the fence alone, so a jump into the
    /// A or B register is allowed when the fence is at 0 or 1.
    pub fn check_jump(&mut self, target: Address) -> Result<(), Violation> {
        if target < self.fence {
            self.record_fault(target);
            Err(Violation::MemoryProtect { address: target })
        } else {
            Ok(())
        }
    }

    pub fn reset(&mut self) {
        *self = MemoryProtect::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingUnit {
    #[serde(skip)]
    maps: Vec<u16>,
    enabled: bool,
    user_map: bool,
    /// Holds the at-interrupt bits and the base page fence; the
    /// other status bits are computed when read.
    status: u16,
    violation: u16,
    violation_latched: bool,
    pub protect: MemoryProtect,
}

impl Default for MappingUnit {
    fn default() -> MappingUnit {
        MappingUnit::new()
    }
}

impl MappingUnit {
    pub fn new() -> MappingUnit {
        MappingUnit {
            maps: vec![0; MAP_REGISTERS],
            enabled: false,
            user_map: false,
            status: 0,
            violation: 0,
            violation_latched: false,
            protect: MemoryProtect::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_user_map(&self) -> bool {
        self.user_map
    }

    /// Turns mapping on, selecting either the user or the system map.
    pub fn enable(&mut self, user_map: bool) {
        self.enabled = true;
        self.user_map = user_map;
    }

    /// Turns mapping off.  The map selection is kept.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn read_map_entry(&self, index: usize) -> Result<u16, MapIndexError> {
        self.maps.get(index).copied().ok_or(MapIndexError(index))
    }

    pub fn write_map_entry(&mut self, index: usize, value: u16) -> Result<(), MapIndexError> {
        match self.maps.get_mut(index) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(MapIndexError(index)),
        }
    }

    /// Reads map register `n`, as the map transfer instructions
    /// number them (only the low 7 bits are significant).
    pub(crate) fn map_register(&self, n: u16) -> u16 {
        self.maps[usize::from(n) % MAP_REGISTERS]
    }

    pub(crate) fn set_map_register(&mut self, n: u16, value: u16) {
        self.maps[usize::from(n) % MAP_REGISTERS] = value;
    }

    /// The index of the first register of the selected map.
    pub fn map_base(&self, selector: MapSelector) -> usize {
        selector.map_number(self.user_map) * MAP_SIZE
    }

    /// Is `va` (in logical page 0) on the unmapped side of the base
    /// page fence?
    fn base_page_unmapped(&self, va: Address) -> bool {
        let fence = self.status & STATUS_FENCE;
        let offset = u16::from(va.offset());
        if self.status & STATUS_FENCE_DIRECTION != 0 {
            offset < fence
        } else {
            offset >= fence
        }
    }

    fn map_entry(&self, va: Address, selector: MapSelector) -> u16 {
        self.maps[self.map_base(selector) + usize::from(va.page())]
    }

    fn physical(entry: u16, va: Address) -> PhysicalAddress {
        PhysicalAddress::from_physical_page(
            Unsigned10Bit::from_low_bits(entry & PHYSICAL_PAGE),
            va.offset(),
        )
    }

    /// Translates the logical address `va` to a physical address.
    ///
    /// Mapping-system violations are latched in the violation
    /// register, but only abort the access when memory protect is
    /// enabled; otherwise the access proceeds as if the page were
    /// not protected.
    pub fn translate(
        &mut self,
        va: Address,
        selector: MapSelector,
        access: AccessKind,
        protect_enabled: bool,
    ) -> Result<PhysicalAddress, Violation> {
        if !self.enabled {
            return Ok(PhysicalAddress::from(va));
        }
        let map = selector.map_number(self.user_map);
        if va.page().is_zero() && self.base_page_unmapped(va) {
            if access == AccessKind::Write && protect_enabled && map == 1 && va >= FIRST_PROTECTED
            {
                self.latch_violation(VIOLATION_BASE_PAGE, va, map);
                return Err(Violation::BasePage { address: va });
            }
            return Ok(PhysicalAddress::from(va));
        }
        let entry = self.map_entry(va, selector);
        let fault = match access {
            AccessKind::Read if entry & READ_PROTECT != 0 => Some((
                VIOLATION_READ,
                Violation::ReadProtect { page: va.page() },
            )),
            AccessKind::Write if entry & WRITE_PROTECT != 0 => Some((
                VIOLATION_WRITE,
                Violation::WriteProtect { page: va.page() },
            )),
            _ => None,
        };
        if let Some((bits, violation)) = fault {
            self.latch_violation(bits, va, map);
            if protect_enabled {
                return Err(violation);
            }
        }
        Ok(Self::physical(entry, va))
    }

    /// Translates an address for a DMA cycle.  Protection bits and
    /// the base page fence do not apply, and nothing is latched.
    pub fn translate_unchecked(&self, va: Address, selector: MapSelector) -> PhysicalAddress {
        if self.enabled {
            Self::physical(self.map_entry(va, selector), va)
        } else {
            PhysicalAddress::from(va)
        }
    }

    fn latch_violation(&mut self, kind: u16, va: Address, map: usize) {
        if self.violation_latched {
            return;
        }
        self.violation_latched = true;
        let mut value = kind | u16::from(va.page());
        if self.enabled {
            value |= VIOLATION_ENABLED;
        }
        if map == 1 {
            value |= VIOLATION_USER;
        }
        event!(
            Level::DEBUG,
            "mapping violation at {:05o}; violation register is now {:06o}",
            va,
            value
        );
        self.violation = value;
    }

    /// Latches a privileged-instruction violation and returns it.
    pub fn privileged_violation(&mut self, instruction: Instruction) -> Violation {
        if !self.violation_latched {
            self.violation_latched = true;
            let mut value = VIOLATION_PRIVILEGED;
            if self.enabled {
                value |= VIOLATION_ENABLED;
            }
            if self.user_map {
                value |= VIOLATION_USER;
            }
            self.violation = value;
        }
        Violation::Privileged { instruction }
    }

    /// Called as each instruction begins, so that its first violation
    /// (if any) is the one latched.
    pub fn begin_instruction(&mut self) {
        self.violation_latched = false;
    }

    pub fn violation_register(&self) -> u16 {
        self.violation
    }

    pub fn status_register(&self, protect_enabled: bool) -> u16 {
        let mut value = self.status;
        if self.enabled {
            value |= STATUS_ENABLED;
        }
        if self.user_map {
            value |= STATUS_USER;
        }
        if protect_enabled {
            value |= STATUS_PROTECT;
        }
        value
    }

    /// Loads the base page fence and direction (bits 10-0).
    pub fn set_fence_status(&mut self, value: u16) {
        self.status = (self.status & !(STATUS_FENCE_DIRECTION | STATUS_FENCE))
            | (value & (STATUS_FENCE_DIRECTION | STATUS_FENCE));
    }

    /// Restores the mapping state from a status word previously
    /// stored by SSM: bit 15 enables mapping and bit 14 selects the
    /// user map.
    pub fn restore_status(&mut self, value: u16) {
        self.enabled = value & STATUS_ENABLED_AT_INTERRUPT != 0;
        self.user_map = value & STATUS_USER_AT_INTERRUPT != 0;
    }

    /// Records the mapping state in the status register and selects
    /// the system map, as the processor does when it grants an
    /// interrupt.
    pub fn enter_interrupt(&mut self) {
        self.status &= !(STATUS_ENABLED_AT_INTERRUPT | STATUS_USER_AT_INTERRUPT);
        if self.enabled {
            self.status |= STATUS_ENABLED_AT_INTERRUPT;
        }
        if self.user_map {
            self.status |= STATUS_USER_AT_INTERRUPT;
        }
        self.user_map = false;
    }

    /// Clears everything except the map registers themselves.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.user_map = false;
        self.status = 0;
        self.violation = 0;
        self.violation_latched = false;
        self.protect.reset();
    }
}
