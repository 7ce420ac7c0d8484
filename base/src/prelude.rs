//! The prelude exports the types which are useful in representing
//! things to do with the machine.  Providing this prelude is the main
//! purpose of the base crate.
pub use super::error::ConversionFailed;
pub use super::instruction::*;
pub use super::types::*;
pub use super::unsigned::*;
pub use super::{u15, u6};
