pub mod locket;

pub use locket::LocketService;
