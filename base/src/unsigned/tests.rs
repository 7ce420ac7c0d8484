use super::{ConversionFailed, Unsigned10Bit, Unsigned15Bit, Unsigned20Bit, Unsigned5Bit, Unsigned6Bit};

#[test]
fn test_limits() {
    assert_eq!(Unsigned5Bit::MAX.bits, 0o37);
    assert_eq!(Unsigned6Bit::MAX.bits, 0o77);
    assert_eq!(Unsigned10Bit::MAX.bits, 0o1777);
    assert_eq!(Unsigned15Bit::MAX.bits, 0o77777);
    assert_eq!(Unsigned20Bit::MAX.bits, 0o3777777);
    assert_eq!(Unsigned15Bit::ZERO.bits, 0);
}

#[test]
fn test_try_from_u16() {
    assert_eq!(Unsigned15Bit::try_from(0o77777_u16), Ok(Unsigned15Bit::MAX));
    assert_eq!(
        Unsigned15Bit::try_from(0o100000_u16),
        Err(ConversionFailed::TooLarge)
    );
    assert_eq!(
        Unsigned6Bit::try_from(0o100_u16),
        Err(ConversionFailed::TooLarge)
    );
    assert_eq!(Unsigned6Bit::try_from(0o12_u16).map(u8::from), Ok(0o12));
}

#[test]
fn test_from_low_bits_truncates() {
    assert_eq!(Unsigned15Bit::from_low_bits(0o177777), Unsigned15Bit::MAX);
    assert_eq!(Unsigned15Bit::from_low_bits(0o100001).bits(), 1);
    assert_eq!(Unsigned6Bit::from_low_bits(0o1277).bits(), 0o77);
}

#[test]
fn test_wrapping_add_wraps_at_width() {
    assert_eq!(
        Unsigned15Bit::MAX.wrapping_add(Unsigned15Bit::ONE),
        Unsigned15Bit::ZERO
    );
    assert_eq!(
        Unsigned15Bit::MAX.wrapping_increment(),
        Unsigned15Bit::ZERO
    );
    assert_eq!(
        Unsigned5Bit::MAX.wrapping_add(Unsigned5Bit::from_low_bits(2)),
        Unsigned5Bit::ONE
    );
}

#[test]
fn test_wrapping_sub_wraps_at_width() {
    assert_eq!(
        Unsigned15Bit::ZERO.wrapping_sub(Unsigned15Bit::ONE),
        Unsigned15Bit::MAX
    );
    assert_eq!(
        Unsigned20Bit::ZERO.wrapping_sub(Unsigned20Bit::ONE),
        Unsigned20Bit::MAX
    );
}

#[test]
fn test_checked_add() {
    assert_eq!(Unsigned15Bit::MAX.checked_add(Unsigned15Bit::ONE), None);
    assert_eq!(
        Unsigned15Bit::ZERO.checked_add(Unsigned15Bit::ONE),
        Some(Unsigned15Bit::ONE)
    );
}

#[test]
fn test_not_stays_in_range() {
    assert_eq!(!Unsigned6Bit::ZERO, Unsigned6Bit::MAX);
    assert_eq!(!Unsigned15Bit::MAX, Unsigned15Bit::ZERO);
}

#[test]
fn test_widening() {
    let a = Unsigned15Bit::from_low_bits(0o12345);
    assert_eq!(u32::from(Unsigned20Bit::from(a)), 0o12345);
    assert_eq!(
        Unsigned15Bit::from(Unsigned10Bit::from_low_bits(0o1777)).bits(),
        0o1777
    );
}

#[test]
fn test_display_is_octal() {
    assert_eq!(Unsigned15Bit::from_low_bits(0o1234).to_string(), "1234");
    assert_eq!(
        format!("{:?}", Unsigned6Bit::from_low_bits(0o12)),
        "Unsigned6Bit{bits: 0o12}"
    );
}

mod u15_proptests {
    use super::super::Unsigned15Bit;
    use test_strategy::proptest;

    #[proptest]
    fn wrapping_add_matches_masked_native(a: Unsigned15Bit, b: Unsigned15Bit) {
        let expected = (u32::from(a) + u32::from(b)) & 0o77777;
        assert_eq!(u32::from(a.wrapping_add(b)), expected);
    }

    #[proptest]
    fn sub_undoes_add(a: Unsigned15Bit, b: Unsigned15Bit) {
        assert_eq!(a.wrapping_add(b).wrapping_sub(b), a);
    }
}
