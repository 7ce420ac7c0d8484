//! Names for the quantities the machine deals in.
//!
//! Memory is organised as 1024-word pages.  A logical address (the
//! kind a program computes) has 15 bits: a 5-bit page number and a
//! 10-bit offset.  When the mapping hardware is enabled, the page
//! number is replaced by a 10-bit physical page number taken from a
//! map register, giving a 20-bit physical address.
use serde::Serialize;

use super::unsigned::{Unsigned10Bit, Unsigned15Bit, Unsigned20Bit, Unsigned5Bit, Unsigned6Bit};

/// A logical memory address.
pub type Address = Unsigned15Bit;

/// A physical memory address.
pub type PhysicalAddress = Unsigned20Bit;

/// The bus address of an I/O device.
pub type SelectCode = Unsigned6Bit;

/// A logical page number.
pub type PageNumber = Unsigned5Bit;

/// The number of words in a page.
pub const PAGE_SIZE: usize = 1024;

const OFFSET_BITS: u32 = 10;

impl Unsigned15Bit {
    pub const fn page(self) -> Unsigned5Bit {
        Unsigned5Bit::from_low_bits((self.bits >> OFFSET_BITS) as u8)
    }

    pub const fn offset(self) -> Unsigned10Bit {
        Unsigned10Bit::from_low_bits(self.bits)
    }

    pub const fn from_page_and_offset(page: Unsigned5Bit, offset: Unsigned10Bit) -> Unsigned15Bit {
        Unsigned15Bit::from_low_bits(((page.bits as u16) << OFFSET_BITS) | offset.bits)
    }

    /// The first address of the page containing this address.
    pub const fn page_base(self) -> Unsigned15Bit {
        Unsigned15Bit::from_low_bits(self.bits & !(Unsigned10Bit::MAX.bits))
    }
}

impl Unsigned20Bit {
    pub const fn from_physical_page(page: Unsigned10Bit, offset: Unsigned10Bit) -> Unsigned20Bit {
        Unsigned20Bit::from_low_bits(((page.bits as u32) << OFFSET_BITS) | offset.bits as u32)
    }

    pub const fn physical_page(self) -> Unsigned10Bit {
        Unsigned10Bit::from_low_bits((self.bits >> OFFSET_BITS) as u16)
    }
}

/// Many instructions name one of the two accumulators with a single
/// bit (bit 11 of the instruction word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Accumulator {
    A,
    B,
}

impl Accumulator {
    /// The memory address at which this register can also be accessed.
    pub const fn address(self) -> Unsigned15Bit {
        match self {
            Accumulator::A => Unsigned15Bit::ZERO,
            Accumulator::B => Unsigned15Bit::ONE,
        }
    }
}

#[test]
fn test_page_and_offset() {
    let a = Unsigned15Bit::from_low_bits(0o12345);
    assert_eq!(u8::from(a.page()), (0o12345_u16 >> 10) as u8);
    assert_eq!(u16::from(a.offset()), 0o12345 & 0o1777);
    assert_eq!(Unsigned15Bit::from_page_and_offset(a.page(), a.offset()), a);
    assert_eq!(u16::from(a.page_base()), 0o12000);
}

#[test]
fn test_physical_page() {
    let pa = Unsigned20Bit::from_physical_page(
        Unsigned10Bit::from_low_bits(0o1777),
        Unsigned10Bit::from_low_bits(0o17),
    );
    assert_eq!(u32::from(pa), 0o3776017);
    assert_eq!(pa.physical_page(), Unsigned10Bit::MAX);
}
