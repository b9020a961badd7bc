//! # Domain Layer - Transaction Pool
//!
//! - `roles`: `RoleBehavior`, what each node role does with transactions
//! - `pool`: `TransactionPool`, the per-node collections and latency means
//! - `value_objects`: `TransactionConfig` and admission outcomes

pub mod pool;
pub mod roles;
pub mod value_objects;

pub use pool::*;
pub use roles::*;
pub use value_objects::*;
