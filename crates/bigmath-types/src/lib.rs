#![forbid(unsafe_code)]
#![doc = "Common types and error codes for the bigmath arbitrary-precision library."]

pub mod error;

pub use error::*;
