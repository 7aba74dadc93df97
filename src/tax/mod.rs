//! Tax helpers used by the matcher

pub mod vat;

pub use vat::*;
