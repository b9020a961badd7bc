//! # Domain Layer
//!
//! Pure ledger logic. No I/O, no clocks; callers pass blocks in and read
//! blocks out.

mod ledger;
mod orphans;
mod value_objects;

pub use ledger::*;
pub use orphans::*;
pub use value_objects::*;
