//! Fixed-width unsigned integer types.
//!
//! The machine has several quantities which are narrower than any
//! native integer type: 6-bit device select codes, 5-bit page
//! numbers, 10-bit page offsets, 15-bit logical addresses and 20-bit
//! physical addresses.  Each of these gets its own type, so that
//! arithmetic on them wraps at the right width and so that an
//! address of one kind cannot be handed to code expecting another.

use std::fmt::{self, Debug, Display, Formatter, Octal};

use serde::Serialize;

use super::error::ConversionFailed;

#[cfg(test)]
mod tests;

/// This macro implements conversions from native types to
/// Unsigned*Bit which are always possible (e.g. From<u8> for
/// Unsigned15Bit).
macro_rules! from_native_type_to_self {
    ($SelfT:ty, $($from:ty)*) => {
        $(
            impl From<$from> for $SelfT {
                fn from(n: $from) -> Self {
                    Self {
                        bits: n.into(),
                    }
                }
            }
        )*
    }
}

/// This macro implements conversions from Unsigned*Bit to native
/// types which are always possible (e.g. From<Unsigned15Bit> for
/// u32).
macro_rules! from_self_to_native_type {
    ($SelfT:ty, $($to:ty)*) => {
        $(
            impl From<$SelfT> for $to {
                fn from(n: $SelfT) -> $to {
                    // The value range of $SelfT is known to fit,
                    // even where the inner type does not (for
                    // example Unsigned5Bit in a u8, to usize).
                    n.bits as $to
                }
            }
        )*
    }
}

/// This macro implements conversions from native types to
/// Unsigned*Bit where the value may not fit.  For example
/// TryFrom<u16> for Unsigned15Bit.
macro_rules! try_from_native_type_to_self {
    ($SelfT:ty, $InnerT:ty, $($from:ty)*) => {
        $(
            impl TryFrom<$from> for $SelfT {
                type Error = ConversionFailed;
                fn try_from(n: $from) -> Result<Self, ConversionFailed> {
                    match <$InnerT>::try_from(n) {
                        Ok(bits) if bits <= Self::VALUE_BITS => Ok(Self { bits }),
                        _ => Err(ConversionFailed::TooLarge),
                    }
                }
            }
        )*
    }
}

/// This macro implements the base functionality of the fixed-width
/// types.  `SelfT` is the name of the type we are defining, `BITS`
/// is its width and `InnerT` is the native type which stores those
/// bits.
macro_rules! fixed_width_unsigned_impl {
    ($SelfT:ident, $BITS:expr, $InnerT:ty) => {
        impl $SelfT {
            pub const BITS: u32 = $BITS;
            const MODULUS: u64 = (1 << $BITS);
            const VALUE_BITS: $InnerT = (Self::MODULUS - 1) as $InnerT;

            pub const MAX: Self = Self {
                bits: Self::VALUE_BITS,
            };
            pub const ZERO: Self = Self { bits: 0 };
            pub const ONE: Self = Self { bits: 1 };

            // Out-of-range values fail at compile time.  It's pub so
            // that it can be used in u15!() and similar.
            pub const fn new<const N: $InnerT>() -> $SelfT {
                struct Helper<const M: $InnerT>;
                impl<const M: $InnerT> Helper<M> {
                    const U: $SelfT = {
                        if M > $SelfT::VALUE_BITS {
                            panic!("input value is out of range")
                        } else {
                            $SelfT { bits: M }
                        }
                    };
                }
                Helper::<N>::U
            }

            /// Keeps only the low-order bits of `n` which fit, in the
            /// way that the hardware truncates a wider bus value.
            pub const fn from_low_bits(n: $InnerT) -> $SelfT {
                $SelfT {
                    bits: n & Self::VALUE_BITS,
                }
            }

            pub const fn bits(self) -> $InnerT {
                self.bits
            }

            pub const fn is_zero(self) -> bool {
                self.bits == 0
            }

            pub const fn wrapping_add(self, rhs: $SelfT) -> $SelfT {
                Self::from_low_bits(self.bits.wrapping_add(rhs.bits))
            }

            pub const fn wrapping_sub(self, rhs: $SelfT) -> $SelfT {
                Self::from_low_bits(self.bits.wrapping_sub(rhs.bits))
            }

            pub const fn wrapping_increment(self) -> $SelfT {
                self.wrapping_add(Self::ONE)
            }

            pub fn checked_add(self, rhs: $SelfT) -> Option<$SelfT> {
                match self.bits.checked_add(rhs.bits) {
                    Some(sum) if sum <= Self::VALUE_BITS => Some(Self { bits: sum }),
                    _ => None,
                }
            }
        }

        impl Display for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Octal for $SelfT {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
                Octal::fmt(&self.bits, f)
            }
        }

        impl Debug for $SelfT {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, concat!(stringify!($SelfT), "{{bits: {:#o}}}"), self.bits)
            }
        }

        impl std::ops::BitAnd<$InnerT> for $SelfT {
            type Output = Self;
            fn bitand(self, mask: $InnerT) -> Self {
                Self {
                    bits: self.bits & mask,
                }
            }
        }

        impl std::ops::BitOr<$InnerT> for $SelfT {
            type Output = Self;
            fn bitor(self, mask: $InnerT) -> Self {
                Self::from_low_bits(self.bits | mask)
            }
        }

        impl std::ops::Not for $SelfT {
            type Output = Self;
            fn not(self) -> Self {
                Self::from_low_bits(!self.bits)
            }
        }

        #[cfg(test)]
        impl proptest::arbitrary::Arbitrary for $SelfT {
            type Parameters = ();
            type Strategy = proptest::strategy::Map<
                std::ops::RangeInclusive<$InnerT>,
                fn($InnerT) -> $SelfT,
            >;

            fn arbitrary_with(_: ()) -> Self::Strategy {
                use proptest::strategy::Strategy;
                (0..=Self::VALUE_BITS).prop_map($SelfT::from_low_bits as fn($InnerT) -> $SelfT)
            }
        }
    };
}

/// A page number within a logical address space of 32 pages.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Unsigned5Bit {
    pub(crate) bits: u8,
}

/// Device select codes range from 0 to 0o77.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Unsigned6Bit {
    pub(crate) bits: u8,
}

/// An offset within a 1024-word page, or a physical page number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Unsigned10Bit {
    pub(crate) bits: u16,
}

/// A logical (program-visible) memory address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Unsigned15Bit {
    pub(crate) bits: u16,
}

/// A physical memory address, covering up to a megaword.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Unsigned20Bit {
    pub(crate) bits: u32,
}

fixed_width_unsigned_impl!(Unsigned5Bit, 5, u8);
try_from_native_type_to_self!(Unsigned5Bit, u8, u8 u16 u32 u64 usize);
from_self_to_native_type!(Unsigned5Bit, u8 u16 u32 u64 usize);

fixed_width_unsigned_impl!(Unsigned6Bit, 6, u8);
try_from_native_type_to_self!(Unsigned6Bit, u8, u8 u16 u32 u64 usize);
from_self_to_native_type!(Unsigned6Bit, u8 u16 u32 u64 usize);

fixed_width_unsigned_impl!(Unsigned10Bit, 10, u16);
from_native_type_to_self!(Unsigned10Bit, u8);
try_from_native_type_to_self!(Unsigned10Bit, u16, u16 u32 u64 usize);
from_self_to_native_type!(Unsigned10Bit, u16 u32 u64 usize);

fixed_width_unsigned_impl!(Unsigned15Bit, 15, u16);
from_native_type_to_self!(Unsigned15Bit, u8);
try_from_native_type_to_self!(Unsigned15Bit, u16, u16 u32 u64 usize);
from_self_to_native_type!(Unsigned15Bit, u16 u32 u64 usize);

fixed_width_unsigned_impl!(Unsigned20Bit, 20, u32);
from_native_type_to_self!(Unsigned20Bit, u8 u16);
try_from_native_type_to_self!(Unsigned20Bit, u32, u32 u64 usize);
from_self_to_native_type!(Unsigned20Bit, u32 u64 usize);

impl From<Unsigned5Bit> for Unsigned6Bit {
    fn from(n: Unsigned5Bit) -> Unsigned6Bit {
        Unsigned6Bit { bits: n.bits }
    }
}

impl From<Unsigned10Bit> for Unsigned15Bit {
    fn from(n: Unsigned10Bit) -> Unsigned15Bit {
        Unsigned15Bit { bits: n.bits }
    }
}

impl From<Unsigned15Bit> for Unsigned20Bit {
    fn from(n: Unsigned15Bit) -> Unsigned20Bit {
        Unsigned20Bit {
            bits: u32::from(n.bits),
        }
    }
}
