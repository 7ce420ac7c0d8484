use test_strategy::proptest;

use base::prelude::*;

use super::*;

fn addr(n: u16) -> Address {
    Address::try_from(n).expect("test address should fit in 15 bits")
}

fn unit_with_maps(maps: &[u16]) -> MappingUnit {
    let mut unit = MappingUnit::new();
    for (i, value) in maps.iter().enumerate() {
        unit.write_map_entry(i, *value)
            .expect("test map index should be in range");
    }
    unit
}

#[test]
fn test_disabled_mapping_is_identity() {
    let mut unit = unit_with_maps(&[0o100077; MAP_REGISTERS]);
    assert_eq!(
        unit.translate(addr(0o12345), MapSelector::Current, AccessKind::Read, true),
        Ok(PhysicalAddress::from(0o12345_u16))
    );
}

#[test]
fn test_translation_uses_selected_map() {
    let mut unit = MappingUnit::new();
    // System map page 3 -> physical page 0o1001, user map page 3 ->
    // physical page 7.
    unit.write_map_entry(3, 0o1001).expect("in range");
    unit.write_map_entry(MAP_SIZE + 3, 0o7).expect("in range");
    unit.enable(false);
    let va = addr(0o6123);
    assert_eq!(
        unit.translate(va, MapSelector::Current, AccessKind::Read, false),
        Ok(PhysicalAddress::try_from(0o2002123_u32).expect("fits"))
    );
    assert_eq!(
        unit.translate(va, MapSelector::Alternate, AccessKind::Read, false),
        Ok(PhysicalAddress::from(0o16123_u16))
    );
    unit.enable(true);
    assert_eq!(
        unit.translate(va, MapSelector::Current, AccessKind::Read, false),
        Ok(PhysicalAddress::from(0o16123_u16))
    );
    assert_eq!(
        unit.translate(va, MapSelector::System, AccessKind::Read, false),
        Ok(PhysicalAddress::try_from(0o2002123_u32).expect("fits"))
    );
}

#[test]
fn test_write_protect_aborts_only_with_protect_enabled() {
    let mut unit = MappingUnit::new();
    unit.write_map_entry(2, WRITE_PROTECT | 0o5).expect("in range");
    unit.enable(false);
    let va = addr(0o4010);
    assert_eq!(
        unit.translate(va, MapSelector::Current, AccessKind::Read, true),
        Ok(PhysicalAddress::from(0o12010_u16))
    );
    assert_eq!(
        unit.translate(va, MapSelector::Current, AccessKind::Write, true),
        Err(Violation::WriteProtect { page: va.page() })
    );
    assert_eq!(
        unit.violation_register(),
        VIOLATION_WRITE | VIOLATION_ENABLED | 2
    );
    unit.begin_instruction();
    assert_eq!(
        unit.translate(va, MapSelector::Current, AccessKind::Write, false),
        Ok(PhysicalAddress::from(0o12010_u16))
    );
}

#[test]
fn test_first_violation_wins() {
    let mut unit = MappingUnit::new();
    unit.write_map_entry(MAP_SIZE + 2, READ_PROTECT).expect("in range");
    unit.write_map_entry(MAP_SIZE + 3, WRITE_PROTECT).expect("in range");
    unit.enable(true);
    unit.begin_instruction();
    assert!(unit
        .translate(addr(0o4000), MapSelector::Current, AccessKind::Read, true)
        .is_err());
    assert!(unit
        .translate(addr(0o6000), MapSelector::Current, AccessKind::Write, true)
        .is_err());
    assert_eq!(
        unit.violation_register(),
        VIOLATION_READ | VIOLATION_ENABLED | VIOLATION_USER | 2
    );
    unit.begin_instruction();
    assert!(unit
        .translate(addr(0o6000), MapSelector::Current, AccessKind::Write, true)
        .is_err());
    assert_eq!(
        unit.violation_register(),
        VIOLATION_WRITE | VIOLATION_ENABLED | VIOLATION_USER | 3
    );
}

#[test]
fn test_base_page_violation_needs_user_map_write() {
    let mut unit = MappingUnit::new();
    // Addresses below 0o100 are unmapped.
    unit.set_fence_status(STATUS_FENCE_DIRECTION | 0o100);
    unit.enable(false);
    assert_eq!(
        unit.translate(addr(0o50), MapSelector::Current, AccessKind::Write, true),
        Ok(PhysicalAddress::from(0o50_u16))
    );
    unit.enable(true);
    assert_eq!(
        unit.translate(addr(0o50), MapSelector::Current, AccessKind::Read, true),
        Ok(PhysicalAddress::from(0o50_u16))
    );
    assert_eq!(
        unit.translate(addr(0o50), MapSelector::Current, AccessKind::Write, true),
        Err(Violation::BasePage { address: addr(0o50) })
    );
    assert_eq!(unit.violation_register() & VIOLATION_BASE_PAGE, VIOLATION_BASE_PAGE);
    // A and B are never protected.
    assert!(unit
        .translate(addr(1), MapSelector::Current, AccessKind::Write, true)
        .is_ok());
}

#[test]
fn test_map_index_range() {
    let mut unit = MappingUnit::new();
    assert_eq!(unit.read_map_entry(MAP_REGISTERS), Err(MapIndexError(MAP_REGISTERS)));
    assert_eq!(
        unit.write_map_entry(MAP_REGISTERS, 0),
        Err(MapIndexError(MAP_REGISTERS))
    );
    assert_eq!(unit.write_map_entry(MAP_REGISTERS - 1, 0o123), Ok(()));
    assert_eq!(unit.read_map_entry(MAP_REGISTERS - 1), Ok(0o123));
}

#[test]
fn test_status_register() {
    let mut unit = MappingUnit::new();
    unit.set_fence_status(0o177777);
    assert_eq!(unit.status_register(false), 0o003777);
    unit.enable(true);
    assert_eq!(
        unit.status_register(true),
        STATUS_ENABLED | STATUS_USER | STATUS_PROTECT | 0o3777
    );
    unit.enter_interrupt();
    assert!(!unit.is_user_map());
    assert_eq!(
        unit.status_register(false),
        STATUS_ENABLED_AT_INTERRUPT | STATUS_USER_AT_INTERRUPT | STATUS_ENABLED | 0o3777
    );
    unit.disable();
    unit.restore_status(unit.status_register(false));
    assert!(unit.is_enabled());
    assert!(unit.is_user_map());
}

#[test]
fn test_memory_protect_fence() {
    let mut mp = MemoryProtect::default();
    mp.set_fence(addr(0o2000));
    assert!(mp.check_write(addr(0)).is_ok());
    assert!(mp.check_write(addr(1)).is_ok());
    assert_eq!(
        mp.check_write(addr(2)),
        Err(Violation::MemoryProtect { address: addr(2) })
    );
    assert!(mp.check_write(addr(0o1777)).is_err());
    assert!(mp.check_write(addr(0o2000)).is_ok());
    assert!(mp.check_jump(addr(1)).is_err());
    assert!(mp.check_jump(addr(0o2000)).is_ok());
    // The first fault is the one recorded.
    assert_eq!(mp.fault_address(), Some(addr(2)));
    mp.arm();
    assert_eq!(mp.fault_address(), None);
}

#[test]
fn test_jump_to_registers_allowed_with_fence_at_zero() {
    let mut mp = MemoryProtect::default();
    mp.set_fence(addr(0));
    assert!(mp.check_jump(addr(0)).is_ok());
    assert!(mp.check_jump(addr(1)).is_ok());
    mp.set_fence(addr(2));
    assert_eq!(
        mp.check_jump(addr(1)),
        Err(Violation::MemoryProtect { address: addr(1) })
    );
    assert!(mp.check_jump(addr(2)).is_ok());
    assert_eq!(mp.fault_address(), Some(addr(1)));
}

#[test]
fn test_violation_register_latch() {
    let mut mp = MemoryProtect::default();
    mp.note_instruction(addr(0o100));
    mp.freeze();
    mp.note_instruction(addr(0o200));
    assert_eq!(mp.violation_register(), addr(0o100));
    mp.arm();
    mp.note_instruction(addr(0o300));
    assert_eq!(mp.violation_register(), addr(0o300));
}

#[proptest]
fn translation_is_idempotent(
    #[strategy(proptest::collection::vec(proptest::num::u16::ANY, MAP_REGISTERS))] maps: Vec<u16>,
    #[strategy(0u16..0o100000)] va: u16,
    fence_status: u16,
    user_map: bool,
    write: bool,
    protect_enabled: bool,
) {
    let mut unit = unit_with_maps(&maps);
    unit.set_fence_status(fence_status);
    unit.enable(user_map);
    let access = if write {
        AccessKind::Write
    } else {
        AccessKind::Read
    };
    let first = unit.translate(addr(va), MapSelector::Current, access, protect_enabled);
    unit.begin_instruction();
    let second = unit.translate(addr(va), MapSelector::Current, access, protect_enabled);
    assert_eq!(first, second);
}

#[proptest]
fn base_page_fence_ignores_map_contents(
    #[strategy(proptest::collection::vec(proptest::num::u16::ANY, MAP_REGISTERS))] maps: Vec<u16>,
    #[strategy(0u16..0o2000)] va: u16,
    #[strategy(0u16..0o2000)] fence: u16,
    below: bool,
    user_map: bool,
) {
    let mut unit = unit_with_maps(&maps);
    unit.set_fence_status(if below { STATUS_FENCE_DIRECTION | fence } else { fence });
    unit.enable(user_map);
    let forbidden = if below { va < fence } else { va >= fence };
    let result = unit.translate(addr(va), MapSelector::Current, AccessKind::Read, true);
    if forbidden {
        assert_eq!(result, Ok(PhysicalAddress::from(va)));
    } else {
        let entry = maps[usize::from(user_map) * MAP_SIZE];
        if entry & READ_PROTECT != 0 {
            assert!(result.is_err());
        } else {
            assert_eq!(
                result,
                Ok(PhysicalAddress::from_physical_page(
                    Unsigned10Bit::from_low_bits(entry & PHYSICAL_PAGE),
                    addr(va).offset()
                ))
            );
        }
    }
}
