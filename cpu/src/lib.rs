//! This crate simulates the processor of an HP 2100-family
//! minicomputer: the instruction set (including the extended
//! arithmetic, index and dynamic mapping groups), memory protect,
//! the interrupt system and the two DMA channels.
//!
//! [`ControlUnit`] is the whole machine.  Peripherals are attached to
//! it as implementations of [`Device`].
#![crate_name = "cpu"]

mod abort;
mod boot;
mod config;
mod context;
mod control;
mod dma;
mod interrupt;
mod io;
mod iostatus;
mod mapping;
mod memory;
mod registers;
mod stop;
mod stopunit;

pub use abort::Violation;
pub use boot::{LoadError, LOADER_WORDS};
pub use config::{ConfigError, MachineConfig, StopConfig, MAX_MEMORY_WORDS, MEMORY_INCREMENT};
pub use context::Context;
pub use control::ControlUnit;
pub use dma::{DmaChannel, DmaController, DmaPort};
pub use io::schedule::EventQueue;
pub use io::{
    Device, DeviceTable, DeviceTableError, FloatingBus, IoContext, IoResult, IoSignal,
    PaperTapeReader, TapePunch, OVERRUN_BIT,
};
pub use iostatus::{select_code, DeviceBits, IoStatus};
pub use mapping::{MapIndexError, MapSelector, MappingUnit, MemoryProtect, MAP_REGISTERS, MAP_SIZE};
pub use registers::Registers;
pub use stop::{StopKind, StopMaskability, StopReason};
pub use stopunit::{StopUnit, UnmaskableStop};

/// The default select code of the paper tape reader.
pub const PAPER_TAPE_READER: base::prelude::Unsigned6Bit = base::prelude::u6!(0o12);

/// The default select code of the tape punch.
pub const TAPE_PUNCH: base::prelude::Unsigned6Bit = base::prelude::u6!(0o13);
