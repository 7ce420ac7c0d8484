//! Instruction timing.
//!
//! Simulated time advances by one memory cycle for each memory
//! access an instruction makes (including the instruction fetch and
//! each level of indirection), and by one cycle for each word moved
//! by a DMA channel.  The extended arithmetic instructions also
//! spend some cycles computing, which are added here.

use std::time::Duration;

use base::prelude::*;

/// Converts a count of memory cycles into simulated time.
pub(crate) fn cycles_to_duration(cycles: u32, cycle_time: Duration) -> Duration {
    cycle_time.saturating_mul(cycles)
}

/// The cycles an extended arithmetic instruction spends beyond its
/// memory accesses.  These figures are approximate.
pub(crate) fn eau_extra_cycles(op: ExtendedOpcode) -> u32 {
    match op {
        ExtendedOpcode::Multiply => 10,
        ExtendedOpcode::Divide => 16,
        ExtendedOpcode::DoubleLoad | ExtendedOpcode::DoubleStore => 0,
        ExtendedOpcode::Shift(_, count) => 1 + u32::from(count) / 2,
        ExtendedOpcode::Dms(_) | ExtendedOpcode::Index(_) => 0,
    }
}

#[test]
fn test_cycles_to_duration() {
    let cycle = Duration::from_nanos(650);
    assert_eq!(cycles_to_duration(0, cycle), Duration::ZERO);
    assert_eq!(cycles_to_duration(3, cycle), Duration::from_nanos(1950));
}

#[test]
fn test_long_shifts_cost_more_than_short_ones() {
    let short = eau_extra_cycles(ExtendedOpcode::Shift(LongShift::LogicalLeft, 1));
    let long = eau_extra_cycles(ExtendedOpcode::Shift(LongShift::LogicalLeft, 16));
    assert!(long > short);
}
