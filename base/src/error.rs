//! Conversion errors for the fixed-width types.

use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// A native integer was too wide for the fixed-width type it was
/// being converted into.  Machine words never hold negative values,
/// so that is the only way a conversion can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionFailed {
    TooLarge,
}

impl Error for ConversionFailed {}

impl Display for ConversionFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConversionFailed::TooLarge => f.write_str("value does not fit in the field"),
        }
    }
}
