//! Sync domain models and backend contracts.

mod events;
mod outcome;
mod retry;
mod service;

pub use events::*;
pub use outcome::*;
pub use retry::*;
pub use service::*;
