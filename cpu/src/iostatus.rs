//! The per-device status flip-flops.
//!
//! Each device has a command, control, flag, flag buffer and service
//! request flip-flop.  We keep each kind as a 64-bit vector indexed
//! by select code, so that the interrupt and DMA logic can examine
//! all devices at once.
use std::fmt::{self, Debug, Formatter};

use serde::Serialize;

use base::prelude::*;

/// Select codes which are wired to parts of the processor rather
/// than to I/O cards.
pub mod select_code {
    use base::prelude::SelectCode;
    use base::u6;

    pub const INTERRUPT_SYSTEM: SelectCode = u6!(0o0);
    pub const OVERFLOW: SelectCode = u6!(0o1);
    pub const DMA_ADDRESS_0: SelectCode = u6!(0o2);
    pub const DMA_ADDRESS_1: SelectCode = u6!(0o3);
    pub const POWER_FAIL: SelectCode = u6!(0o4);
    pub const MEMORY_PROTECT: SelectCode = u6!(0o5);
    pub const DMA_CONTROL_0: SelectCode = u6!(0o6);
    pub const DMA_CONTROL_1: SelectCode = u6!(0o7);
    /// The lowest select code available to I/O cards.
    pub const FIRST_EXTERNAL: SelectCode = u6!(0o10);
}

/// One status bit for each select code.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBits(u64);

impl DeviceBits {
    pub const fn new(bits: u64) -> DeviceBits {
        DeviceBits(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    fn mask(code: SelectCode) -> u64 {
        1_u64 << u8::from(code)
    }

    pub fn is_set(&self, code: SelectCode) -> bool {
        self.0 & Self::mask(code) != 0
    }

    pub fn set(&mut self, code: SelectCode) {
        self.0 |= Self::mask(code);
    }

    pub fn clear(&mut self, code: SelectCode) {
        self.0 &= !Self::mask(code);
    }

    pub fn assign(&mut self, code: SelectCode, value: bool) {
        if value {
            self.set(code)
        } else {
            self.clear(code)
        }
    }

    /// The lowest-numbered (that is, highest priority) select code
    /// whose bit is set.
    pub fn lowest(&self) -> Option<SelectCode> {
        if self.0 == 0 {
            None
        } else {
            Some(SelectCode::from_low_bits(self.0.trailing_zeros() as u8))
        }
    }
}

impl std::ops::BitAnd for DeviceBits {
    type Output = DeviceBits;
    fn bitand(self, rhs: DeviceBits) -> DeviceBits {
        DeviceBits(self.0 & rhs.0)
    }
}

impl Debug for DeviceBits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceBits({:#024o})", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IoStatus {
    pub command: DeviceBits,
    pub control: DeviceBits,
    pub flag: DeviceBits,
    pub flag_buffer: DeviceBits,
    pub service_request: DeviceBits,
}

impl IoStatus {
    pub fn flag(&self, code: SelectCode) -> bool {
        self.flag.is_set(code)
    }

    /// Setting a device flag also sets its flag buffer; it is the
    /// flag buffer which the interrupt logic clears on acknowledge.
    pub fn set_flag(&mut self, code: SelectCode) {
        self.flag.set(code);
        self.flag_buffer.set(code);
    }

    pub fn clear_flag(&mut self, code: SelectCode) {
        self.flag.clear(code);
        self.flag_buffer.clear(code);
    }

    pub fn flag_buffer(&self, code: SelectCode) -> bool {
        self.flag_buffer.is_set(code)
    }

    pub fn clear_flag_buffer(&mut self, code: SelectCode) {
        self.flag_buffer.clear(code);
    }

    pub fn control(&self, code: SelectCode) -> bool {
        self.control.is_set(code)
    }

    pub fn set_control(&mut self, code: SelectCode) {
        self.control.set(code);
    }

    pub fn clear_control(&mut self, code: SelectCode) {
        self.control.clear(code);
    }

    pub fn command(&self, code: SelectCode) -> bool {
        self.command.is_set(code)
    }

    pub fn set_command(&mut self, code: SelectCode) {
        self.command.set(code);
    }

    pub fn clear_command(&mut self, code: SelectCode) {
        self.command.clear(code);
    }

    pub fn service_request(&self, code: SelectCode) -> bool {
        self.service_request.is_set(code)
    }

    pub fn set_service_request(&mut self, code: SelectCode) {
        self.service_request.set(code);
    }

    pub fn clear_service_request(&mut self, code: SelectCode) {
        self.service_request.clear(code);
    }

    /// Clears every status bit belonging to `code`.
    pub fn clear_device(&mut self, code: SelectCode) {
        self.command.clear(code);
        self.control.clear(code);
        self.flag.clear(code);
        self.flag_buffer.clear(code);
        self.service_request.clear(code);
    }
}

#[test]
fn test_lowest() {
    assert_eq!(DeviceBits::new(0).lowest(), None);
    assert_eq!(
        DeviceBits::new(0b1011000).lowest(),
        Some(SelectCode::from_low_bits(3))
    );
    assert_eq!(
        DeviceBits::new(1 << 63).lowest(),
        Some(SelectCode::from_low_bits(0o77))
    );
}

#[test]
fn test_flag_sets_flag_buffer() {
    let code = SelectCode::from_low_bits(0o12);
    let mut status = IoStatus::default();
    status.set_flag(code);
    assert!(status.flag(code));
    assert!(status.flag_buffer(code));
    status.clear_flag_buffer(code);
    assert!(status.flag(code));
    assert!(!status.flag_buffer(code));
    status.set_flag(code);
    status.clear_flag(code);
    assert!(!status.flag(code));
    assert!(!status.flag_buffer(code));
}

#[test]
fn test_devices_own_one_bit() {
    let mut status = IoStatus::default();
    let a = SelectCode::from_low_bits(0o10);
    let b = SelectCode::from_low_bits(0o11);
    status.set_control(a);
    status.set_flag(a);
    status.set_command(a);
    status.set_service_request(a);
    assert!(!status.control(b));
    assert!(!status.flag(b));
    assert!(!status.command(b));
    assert!(!status.service_request(b));
    status.clear_device(a);
    assert_eq!(status, IoStatus::default());
}
