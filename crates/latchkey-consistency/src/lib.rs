//! Latchkey Consistency - lock storage and lease expiration
//!
//! This crate provides:
//! - The `LockDb` store boundary and its in-memory implementation
//! - `LockPick`, which arms one expiration timer per held key
//! - `Burglar`, which periodically re-arms timers for every live record

pub mod expiration;
pub mod lock;

pub use expiration::{Burglar, LockPick, TimerLockPick};
pub use lock::{Lock, LockDb, MemoryLockDb};
