//! [`SyncService`] implementation wiring configuration, credentials and the
//! engine together.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::Mutex;

use scalesync_core::secrets::SecretStore;
use scalesync_core::sync::{LogSyncEventSink, SyncEventSink, SyncOutcome, SyncService};
use scalesync_core::Measurement;

use crate::auth::{Credential, TokenProvider};
use crate::config::AthlyzeConfig;
use crate::engine::AthlyzeSync;
use crate::error::{AuthError, Result};

pub const SERVICE_NAME: &str = "athlyze";

/// Athlyze backend as seen by the host application.
///
/// The engine is built on first use from the settings in the store and
/// rebuilt whenever the configured base URL changes.
pub struct AthlyzeService {
    store: Arc<dyn SecretStore>,
    tokens: Arc<TokenProvider>,
    events: Arc<dyn SyncEventSink>,
    engine: Mutex<Option<(String, Arc<AthlyzeSync>)>>,
}

impl AthlyzeService {
    pub fn new(store: Arc<dyn SecretStore>) -> std::result::Result<Self, AuthError> {
        let tokens = Arc::new(TokenProvider::new(Arc::clone(&store))?);
        Ok(Self {
            store,
            tokens,
            events: Arc::new(LogSyncEventSink),
            engine: Mutex::new(None),
        })
    }

    pub fn with_event_sink(mut self, events: Arc<dyn SyncEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Persist a new API base URL; the next operation uses it.
    pub fn set_base_url(&self, base_url: &str) -> Result<String> {
        AthlyzeConfig::set_base_url(self.store.as_ref(), base_url)
    }

    pub async fn authorize(&self, credential: Credential) -> std::result::Result<(), AuthError> {
        self.tokens.authorize(credential).await
    }

    pub async fn is_authorized(&self) -> bool {
        self.tokens.is_authorized().await
    }

    pub async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        self.tokens.sign_out().await
    }

    pub async fn check_connection(&self) -> SyncOutcome {
        self.engine().await?.check_connection().await
    }

    async fn engine(&self) -> SyncOutcome<Arc<AthlyzeSync>> {
        let config = AthlyzeConfig::load(self.store.as_ref())?;
        let mut cached = self.engine.lock().await;
        if let Some((base_url, engine)) = cached.as_ref() {
            if *base_url == config.base_url {
                return Ok(Arc::clone(engine));
            }
        }

        debug!("[Athlyze] Building engine for {}", config.base_url);
        let client = config.build_client()?;
        let engine = Arc::new(
            AthlyzeSync::new(Arc::new(client), Arc::clone(&self.tokens))
                .with_event_sink(Arc::clone(&self.events)),
        );
        *cached = Some((config.base_url, Arc::clone(&engine)));
        Ok(engine)
    }
}

#[async_trait]
impl SyncService for AthlyzeService {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn sync(&self, measurements: &[Measurement]) -> SyncOutcome {
        self.engine().await?.full_sync(measurements).await
    }

    async fn insert(&self, measurement: &Measurement) -> SyncOutcome {
        self.engine().await?.insert(measurement).await
    }

    async fn update(&self, measurement: &Measurement) -> SyncOutcome {
        self.engine().await?.update(measurement).await
    }

    async fn delete(&self, date: DateTime<Utc>) -> SyncOutcome {
        self.engine().await?.delete(date).await
    }

    async fn clear(&self) -> SyncOutcome {
        self.engine().await?.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SERVER_KEY;
    use scalesync_core::secrets::InMemorySecretStore;
    use scalesync_core::sync::SyncErrorKind;

    #[tokio::test]
    async fn engine_is_rebuilt_when_base_url_changes() {
        let store = Arc::new(InMemorySecretStore::new());
        let service = AthlyzeService::new(store.clone()).unwrap();

        let first = service.engine().await.unwrap();
        let again = service.engine().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        service.set_base_url("http://127.0.0.1:9/api").unwrap();
        assert_eq!(
            store.get_secret(SERVER_KEY).unwrap().as_deref(),
            Some("http://127.0.0.1:9/api/")
        );
        let rebuilt = service.engine().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[tokio::test]
    async fn unauthorized_service_denies_every_operation() {
        let service = AthlyzeService::new(Arc::new(InMemorySecretStore::new())).unwrap();
        assert_eq!(service.name(), "athlyze");
        assert!(!service.is_authorized().await);

        let failure = service.clear().await.unwrap_err();
        assert_eq!(failure.kind(), SyncErrorKind::PermissionDenied);
        let failure = service.sync(&[]).await.unwrap_err();
        assert_eq!(failure.kind(), SyncErrorKind::PermissionDenied);
    }
}
