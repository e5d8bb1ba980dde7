//! Lock records and the lock store

mod model;
mod store;

pub use model::*;
pub use store::*;
