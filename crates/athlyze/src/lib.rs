//! Athlyze measurement sync.
//!
//! Pushes body-composition measurements to the Athlyze REST API:
//! single inserts, updates and deletes matched by wire date, batch sync with
//! partial-failure accounting, and a drain loop that clears the remote
//! collection. OAuth access tokens are refreshed transparently by
//! [`TokenProvider`].
//!
//! Most hosts only need [`AthlyzeService`], which implements
//! [`scalesync_core::sync::SyncService`].

pub mod auth;
pub mod client;
pub mod config;
pub mod date_key;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod service;
pub mod types;

pub use auth::{AuthorizationMetadata, Credential, TokenProvider};
pub use client::{AthlyzeClient, MeasurementApi};
pub use config::AthlyzeConfig;
pub use engine::AthlyzeSync;
pub use error::{AthlyzeError, AuthError, Result};
pub use service::AthlyzeService;
pub use types::{EntryPage, RemoteEntry};
