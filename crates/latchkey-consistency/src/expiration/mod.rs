//! Lease expiration
//!
//! Records are reclaimed without any client calling Release: `LockPick` keeps
//! one timer per key and, when it fires, releases the record through
//! `LockDb::release_if_unchanged`. `Burglar` sweeps the store on an interval so
//! records whose timers were never armed are still reclaimed.

mod burglar;
mod lock_pick;

pub use burglar::*;
pub use lock_pick::*;
