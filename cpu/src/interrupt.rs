//! The interrupt priority chain.
//!
//! Devices are chained in select-code order; the lowest select code
//! has the highest priority.  A device with both control and flag set
//! breaks the chain, so no device of lower priority can interrupt
//! while it is in that state.  The device which breaks the chain
//! interrupts if its flag buffer is still set (the flag buffer is
//! cleared when the interrupt is acknowledged, so a device interrupts
//! only once for each setting of its flag).
use tracing::{event, Level};

use base::prelude::*;

use crate::iostatus::{select_code, DeviceBits, IoStatus};

/// Select codes 0 to 3 do not take part in the priority chain.
const CHAINED: DeviceBits = DeviceBits::new(!0o17);

/// Returns the select code of the device which is requesting an
/// interrupt, if any.  When the interrupt system is off (`ion` is
/// false) only power fail and memory protect can interrupt.
pub fn compute_pending_interrupt(status: &IoStatus, ion: bool) -> Option<SelectCode> {
    let terminator = (status.control & status.flag & CHAINED).lowest()?;
    if !status.flag_buffer(terminator) {
        return None;
    }
    if !ion && terminator > select_code::MEMORY_PROTECT {
        return None;
    }
    Some(terminator)
}

/// Acknowledges the interrupt from `code`, returning the address of
/// its trap cell.
pub fn acknowledge(status: &mut IoStatus, code: SelectCode) -> Address {
    event!(Level::DEBUG, "granting interrupt to select code {:02o}", code);
    status.clear_flag_buffer(code);
    Address::from(u8::from(code))
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;
    use base::u6;

    fn status_with(control: u64, flag: u64, flag_buffer: u64) -> IoStatus {
        IoStatus {
            control: DeviceBits::new(control),
            flag: DeviceBits::new(flag),
            flag_buffer: DeviceBits::new(flag_buffer),
            ..IoStatus::default()
        }
    }

    #[test]
    fn test_no_request_without_control() {
        let status = status_with(0, 1 << 0o12, 1 << 0o12);
        assert_eq!(compute_pending_interrupt(&status, true), None);
    }

    #[test]
    fn test_highest_priority_wins() {
        let both = (1 << 0o12) | (1 << 0o20);
        let status = status_with(both, both, both);
        assert_eq!(compute_pending_interrupt(&status, true), Some(u6!(0o12)));
    }

    #[test]
    fn test_acknowledged_device_holds_off_lower_priority() {
        let both = (1 << 0o12) | (1 << 0o20);
        let mut status = status_with(both, both, both);
        assert_eq!(acknowledge(&mut status, u6!(0o12)), Address::from(0o12_u8));
        // Device 12 is still being serviced (control and flag are
        // still set) so device 20 cannot interrupt.
        assert_eq!(compute_pending_interrupt(&status, true), None);
        status.clear_flag(u6!(0o12));
        assert_eq!(compute_pending_interrupt(&status, true), Some(u6!(0o20)));
    }

    #[test]
    fn test_interrupt_system_off() {
        let devices = (1 << 0o5) | (1 << 0o12);
        let status = status_with(devices, devices, devices);
        assert_eq!(compute_pending_interrupt(&status, false), Some(u6!(0o5)));
        let status = status_with(1 << 0o12, 1 << 0o12, 1 << 0o12);
        assert_eq!(compute_pending_interrupt(&status, false), None);
    }

    #[test]
    fn test_internal_codes_never_interrupt() {
        let status = status_with(0o17, 0o17, 0o17);
        assert_eq!(compute_pending_interrupt(&status, true), None);
    }

    #[proptest]
    fn priority_ordering(control: u64, flag: u64, flag_buffer: u64, ion: bool) {
        let status = status_with(control, flag, flag_buffer);
        let candidates = control & flag & !0o17;
        match compute_pending_interrupt(&status, ion) {
            None => {
                if candidates != 0 {
                    let terminator = candidates.trailing_zeros();
                    let fbf = flag_buffer & (1 << terminator) != 0;
                    assert!(!fbf || (!ion && terminator > 5));
                }
            }
            Some(code) => {
                let code = u32::from(u8::from(code));
                assert!(code >= 4);
                // The granted device is the chain terminator: no
                // higher priority device has control and flag set.
                assert_eq!(candidates.trailing_zeros(), code);
                assert_ne!(flag_buffer & (1 << code), 0);
                assert!(ion || code <= 5);
            }
        }
    }
}
