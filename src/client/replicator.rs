//! # Log Replicator
//!
//! Maintains a live local mirror of a remote log. A sync pass adopts the
//! server's snapshot, catches up on any facts recorded since, then follows
//! live appends through blocking reads. Every observed state is published
//! on a watch channel for embedders.
//!
//! Recovery is deliberately blunt: any failure, at any phase, discards the
//! local mirror and restarts the pass from the snapshot fetch after a fixed
//! delay. There is no resume and no backoff curve. A pass is therefore
//! always safe to restart, whatever it was doing when it died.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::db::rules::IntegrationRule;
use crate::db::{Fact, Snapshot};

use super::errors::{ReplicatorError, ReplicatorResult};

/// Pause between failed sync passes.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

// ============================================================================
// Replicator
// ============================================================================

/// A client that mirrors one remote log.
///
/// The mirror folds facts through its own copy of the log's integration
/// rule rather than trusting server state beyond the initial snapshot, so
/// a mirror and the server agree exactly when their rules agree.
pub struct Replicator {
    /// Base URL of the remote log, e.g. `http://localhost:8000/foo`.
    url: String,
    rule: Arc<dyn IntegrationRule>,
    http: reqwest::Client,
    retry_delay: Duration,
    snapshots: watch::Sender<Snapshot>,
}

impl Replicator {
    /// Create a replicator for the log at `url`, folding with `rule`.
    pub fn new(url: impl Into<String>, rule: Arc<dyn IntegrationRule>) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::empty());
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            rule,
            http: reqwest::Client::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            snapshots,
        }
    }

    /// Replace the pause between failed sync passes.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Base URL of the mirrored log.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Watch the mirrored snapshot. Receivers see every published state,
    /// starting from the empty snapshot until the first sync pass lands.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Mirror the remote log forever. Never returns; failed passes are
    /// retried from scratch after the retry delay.
    pub async fn run(&self) {
        loop {
            if let Err(error) = self.sync_once().await {
                warn!(
                    url = %self.url,
                    error = %error,
                    delay_secs = self.retry_delay.as_secs_f64(),
                    "sync pass failed; restarting from snapshot"
                );
                sleep(self.retry_delay).await;
            }
        }
    }

    /// One full pass: adopt snapshot, catch up, follow. Only leaves via
    /// an error; the follow phase polls indefinitely.
    async fn sync_once(&self) -> ReplicatorResult<()> {
        let Snapshot { mut age, mut state } = self.fetch_snapshot().await?;
        info!(url = %self.url, age, "snapshot adopted");
        self.publish(age, &state);

        let missed = self.fetch_since(age + 1).await?;
        if !missed.is_empty() {
            info!(url = %self.url, count = missed.len(), "catching up");
        }
        for fact in missed {
            state = self.rule.integrate(&state, &fact)?;
            age += 1;
            self.publish(age, &state);
        }

        loop {
            match self.fetch_fact(age + 1).await? {
                Some(fact) => {
                    state = self.rule.integrate(&state, &fact)?;
                    age += 1;
                    self.publish(age, &state);
                    debug!(url = %self.url, fact = age, "integrated");
                }
                // Server-side long-poll expiry; ask again for the same slot.
                None => continue,
            }
        }
    }

    fn publish(&self, age: u64, state: &Value) {
        self.snapshots.send_replace(Snapshot::new(age, state.clone()));
    }

    // ========================================================================
    // Remote reads
    // ========================================================================

    async fn fetch_snapshot(&self) -> ReplicatorResult<Snapshot> {
        let response = self.checked(self.http.get(&self.url).send().await?)?;
        Ok(response.json().await?)
    }

    async fn fetch_since(&self, from: u64) -> ReplicatorResult<Vec<Fact>> {
        let url = format!("{}/{from}..", self.url);
        let response = self.checked(self.http.get(&url).send().await?)?;
        Ok(response.json().await?)
    }

    /// Blocking read of fact `number`. `None` means the server expired the
    /// long poll without a fact arriving.
    async fn fetch_fact(&self, number: u64) -> ReplicatorResult<Option<Fact>> {
        let url = format!("{}/{number}", self.url);
        let response = self.checked(self.http.get(&url).send().await?)?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(Fact::new(response.text().await?)))
    }

    fn checked(&self, response: Response) -> ReplicatorResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ReplicatorError::Status {
                status: response.status(),
                url: response.url().to_string(),
            })
        }
    }
}
