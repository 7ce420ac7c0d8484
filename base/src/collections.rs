//! Collection types not provided by the standard library.
pub mod pq;
