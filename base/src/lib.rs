//! The `base` crate defines the things which are useful in both the
//! simulator and other associated tools (a loader or an assembler,
//! for example): fixed-width machine quantities, the binary layout
//! of instructions and some supporting collections.

mod error;
mod types;
mod unsigned;

pub mod collections;
pub mod instruction;
pub mod prelude;

#[macro_export]
macro_rules! u6 {
    ($n:expr) => {
        $crate::prelude::Unsigned6Bit::new::<{ $n }>()
    };
}

#[macro_export]
macro_rules! u15 {
    ($n:expr) => {
        $crate::prelude::Unsigned15Bit::new::<{ $n }>()
    };
}

#[test]
fn test_u6() {
    use prelude::Unsigned6Bit;
    let m: Unsigned6Bit = u6!(0o12);
    let n: Unsigned6Bit = Unsigned6Bit::try_from(0o12_u8).expect("test data should be in range");
    assert_eq!(m, n);
}

#[test]
fn test_u15() {
    use prelude::Unsigned15Bit;
    let p: Unsigned15Bit = u15!(0o77777);
    assert_eq!(p, Unsigned15Bit::MAX);
}
