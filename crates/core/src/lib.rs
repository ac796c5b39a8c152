//! Shared building blocks for measurement sync backends.
//!
//! Backends (see `scalesync-athlyze`) depend on this crate for the
//! measurement model, the typed sync outcome, and the collaborator
//! contracts a host application implements (secret storage, event sink).

pub mod errors;
pub mod measurements;
pub mod secrets;
pub mod sync;

pub use errors::{Error, Result};
pub use measurements::Measurement;
