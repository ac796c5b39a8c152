//! Athlyze sync engine.
//!
//! Stateless between calls: every operation asks the [`TokenProvider`] for a
//! fresh credential, talks to the API, and maps whatever happened into a
//! [`SyncOutcome`]. The remote collection is the source of truth and is never
//! cached. Identity is resolved by exact wire date (see [`crate::date_key`]);
//! when several remote entries share a date the first one returned wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use scalesync_core::sync::{
    NoopSyncEventSink, SyncErrorKind, SyncEventSink, SyncFailure, SyncOperation,
    SyncOperationMetrics, SyncOutcome,
};
use scalesync_core::Measurement;

use crate::auth::TokenProvider;
use crate::client::MeasurementApi;
use crate::date_key;
use crate::error::AthlyzeError;
use crate::mapper;
use crate::types::RemoteEntry;

/// Per-operation counters reported to the event sink.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    attempted: usize,
    failed: usize,
}

/// Map an API call failure, naming the call in `context`.
fn call_failure(err: AthlyzeError, context: &str) -> SyncFailure {
    match err {
        AthlyzeError::Api { status, message } => {
            SyncFailure::api(format!("{} response error ({}): {}", context, status, message))
                .with_status(status)
        }
        err if err.is_transport() => {
            let message = format!("{} failed: {}", context, err);
            SyncFailure::new(SyncErrorKind::UnknownError, Some(message), None).with_cause(err)
        }
        other => SyncFailure::from(other),
    }
}

fn insert_failure(date: &str, err: AthlyzeError) -> SyncFailure {
    match err {
        AthlyzeError::Api { status, message } => SyncFailure::api(format!(
            "athlyze {} insert response error {}",
            date, message
        ))
        .with_status(status),
        other => call_failure(other, &format!("athlyze {} insert", date)),
    }
}

/// Faults that will hit every remaining item of a batch as well.
fn aborts_batch(err: &AthlyzeError) -> bool {
    err.is_transport() || matches!(err, AthlyzeError::Auth(_))
}

pub struct AthlyzeSync {
    api: Arc<dyn MeasurementApi>,
    tokens: Arc<TokenProvider>,
    events: Arc<dyn SyncEventSink>,
}

impl AthlyzeSync {
    pub fn new(api: Arc<dyn MeasurementApi>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            api,
            tokens,
            events: Arc::new(NoopSyncEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn SyncEventSink>) -> Self {
        self.events = events;
        self
    }

    /// POST one measurement.
    pub async fn insert(&self, measurement: &Measurement) -> SyncOutcome {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = {
            let tally = &mut tally;
            self.authorized(move |token| async move {
                tally.attempted = 1;
                let date = date_key::encode(measurement.timestamp);
                self.insert_with(&token, measurement, &date)
                    .await
                    .map_err(|err| {
                        tally.failed = 1;
                        insert_failure(&date, err)
                    })
            })
            .await
        };
        self.finish(SyncOperation::Insert, started, tally, &outcome);
        outcome
    }

    /// Overwrite the remote entry recorded at the measurement's date.
    ///
    /// Fails with `no entry found for date: ...` when nothing matches; this is
    /// not an upsert.
    pub async fn update(&self, measurement: &Measurement) -> SyncOutcome {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = {
            let tally = &mut tally;
            self.authorized(move |token| async move {
                let date = date_key::encode(measurement.timestamp);
                let existing = self.find_entry(&token, &date).await?;
                if !mapper::looks_matched(&existing, measurement) {
                    debug!(
                        "[Athlyze] Entry {} has date {} but was returned for {}",
                        existing.id, existing.date, date
                    );
                }

                let mut entry = mapper::to_remote_with_key(measurement, date.clone());
                entry.id = existing.id;
                tally.attempted = 1;
                self.api
                    .update(&token, existing.id, &entry)
                    .await
                    .map_err(|e| {
                        tally.failed = 1;
                        call_failure(
                            e,
                            &format!("athlyze update of entry {} ({})", existing.id, date),
                        )
                    })
            })
            .await
        };
        self.finish(SyncOperation::Update, started, tally, &outcome);
        outcome
    }

    /// Remove the remote entry recorded at `date`. A missing entry is a failure.
    pub async fn delete(&self, date: DateTime<Utc>) -> SyncOutcome {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = {
            let tally = &mut tally;
            self.authorized(move |token| async move {
                let key = date_key::encode(date);
                let existing = self.find_entry(&token, &key).await?;
                tally.attempted = 1;
                self.api.delete(&token, existing.id).await.map_err(|e| {
                    tally.failed = 1;
                    call_failure(
                        e,
                        &format!("athlyze delete of entry {} ({})", existing.id, key),
                    )
                })
            })
            .await
        };
        self.finish(SyncOperation::Delete, started, tally, &outcome);
        outcome
    }

    /// Insert every measurement, in order, with one credential for the batch.
    ///
    /// Remote rejections are counted and the batch continues; a transport or
    /// credential fault aborts it at once.
    pub async fn full_sync(&self, measurements: &[Measurement]) -> SyncOutcome {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = {
            let tally = &mut tally;
            self.authorized(move |token| async move {
                let total = measurements.len();
                for (index, measurement) in measurements.iter().enumerate() {
                    tally.attempted += 1;
                    let date = date_key::encode(measurement.timestamp);
                    match self.insert_with(&token, measurement, &date).await {
                        Ok(()) => {}
                        Err(err) if aborts_batch(&err) => {
                            tally.failed += 1;
                            let failure = insert_failure(&date, err);
                            let message = format!(
                                "full sync aborted at item {} of {}: {}",
                                index + 1,
                                total,
                                failure.message().unwrap_or("insert failed")
                            );
                            warn!("[Athlyze] {}", message);
                            return Err(failure.with_message(message));
                        }
                        Err(err) => {
                            tally.failed += 1;
                            warn!("[Athlyze] {}", insert_failure(&date, err));
                        }
                    }
                }

                if tally.failed == 0 {
                    Ok(())
                } else {
                    Err(SyncFailure::api(format!(
                        "{} of {} measurements failed to sync",
                        tally.failed, total
                    )))
                }
            })
            .await
        };
        self.finish(SyncOperation::FullSync, started, tally, &outcome);
        outcome
    }

    /// Delete every remote entry.
    ///
    /// Lists the first page, deletes what it holds, and lists again until the
    /// backend reports zero entries. The listing is live: entries inserted
    /// concurrently by another client keep the loop going.
    pub async fn clear(&self) -> SyncOutcome {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = {
            let tally = &mut tally;
            self.authorized(move |token| async move {
                loop {
                    let page = self
                        .api
                        .list_entries(&token)
                        .await
                        .map_err(|e| call_failure(e, "athlyze listing"))?;

                    let remaining = page.known_count();
                    if remaining == Some(0) {
                        return Ok(());
                    }

                    let entries = page.entries();
                    if entries.is_empty() {
                        return match remaining {
                            None => Ok(()),
                            Some(count) => Err(SyncFailure::api(format!(
                                "listing reported {} entries but returned none",
                                count
                            ))),
                        };
                    }

                    debug!("[Athlyze] Clearing page of {} entries", entries.len());
                    for entry in entries {
                        tally.attempted += 1;
                        if let Err(e) = self.api.delete(&token, entry.id).await {
                            tally.failed += 1;
                            return Err(call_failure(
                                e,
                                &format!("athlyze delete of entry {} ({})", entry.id, entry.date),
                            ));
                        }
                    }
                }
            })
            .await
        };
        self.finish(SyncOperation::Clear, started, tally, &outcome);
        outcome
    }

    /// Verify the account is reachable: one listing with a known count.
    pub async fn check_connection(&self) -> SyncOutcome {
        let started = Instant::now();
        let outcome = self
            .authorized(move |token| async move {
                let page = self
                    .api
                    .list_entries(&token)
                    .await
                    .map_err(|e| call_failure(e, "athlyze listing"))?;
                match page.known_count() {
                    Some(_) => Ok(()),
                    None => Err(SyncFailure::api("not successfully connected")),
                }
            })
            .await;
        self.finish(SyncOperation::CheckConnection, started, Tally::default(), &outcome);
        outcome
    }

    /// Run `action` with a fresh access token, or fail with PERMISSION_DENIED.
    async fn authorized<F, Fut>(&self, action: F) -> SyncOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = SyncOutcome>,
    {
        match self
            .tokens
            .with_fresh_credential(|credential| action(credential.access_token))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("[Athlyze] No usable credential: {}", err);
                Err(AthlyzeError::from(err).into())
            }
        }
    }

    /// POST a measurement under its already encoded wire date.
    async fn insert_with(
        &self,
        token: &str,
        measurement: &Measurement,
        date: &str,
    ) -> crate::error::Result<()> {
        let entry = mapper::to_remote_with_key(measurement, date.to_string());
        self.api.insert(token, &entry).await
    }

    /// First remote entry recorded at `date`.
    async fn find_entry(&self, token: &str, date: &str) -> SyncOutcome<RemoteEntry> {
        let page = self
            .api
            .entries_by_date(token, date)
            .await
            .map_err(|e| call_failure(e, &format!("athlyze lookup of {}", date)))?;

        let first = page
            .first()
            .ok_or_else(|| SyncFailure::api(format!("no entry found for date: {}", date)))?;
        let matches = page.entries().len();
        if matches > 1 {
            warn!(
                "[Athlyze] {} entries share date {}; using entry {}",
                matches,
                date,
                first.id
            );
        }
        Ok(first.clone())
    }

    fn finish(
        &self,
        operation: SyncOperation,
        started: Instant,
        tally: Tally,
        outcome: &SyncOutcome,
    ) {
        self.events.emit(SyncOperationMetrics {
            operation,
            attempted: tally.attempted,
            failed: tally.failed,
            duration_ms: started.elapsed().as_millis() as i64,
            status: SyncOperationMetrics::status_for(outcome.as_ref().err().map(|f| f.kind())),
        });
    }
}
