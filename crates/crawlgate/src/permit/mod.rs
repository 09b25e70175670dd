//! Slot pool for bounding concurrent crawls.
//!
//! The pool hands out [`Lease`]s. A lease is the only way to hold a slot:
//! - `SlotPool::acquire` / `try_acquire` → `Lease` (slot held)
//! - `Lease::release` consumes the lease (slot returned)
//! - dropping a `Lease` on any other path also returns the slot
//!
//! Because `release` takes the lease by value, releasing twice does not compile.

mod lease;
mod pool;

pub use lease::Lease;
pub use pool::{PermitError, SlotPool};
