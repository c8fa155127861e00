//! Cached health checking for the remote backend.
//!
//! Every operation that touches the remote API consults this cache first, so
//! a down or misconfigured backend costs at most one failed probe per TTL
//! window instead of one failed call per user action.

use crate::cloudinary::CloudinaryClient;
use chrono::Utc;
use depot_core::constants::STATUS_CACHE_TTL_SECS;
use depot_core::BackendStatus;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CacheState {
    status: BackendStatus,
    checked_at: Option<Instant>,
}

/// Time-cached reachability state for the remote backend.
///
/// The mutex also serializes concurrent refreshes, so two near-simultaneous
/// requests trigger a single probe.
pub struct StatusCache {
    ttl: Duration,
    inner: Mutex<CacheState>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(STATUS_CACHE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        StatusCache {
            ttl,
            inner: Mutex::new(CacheState {
                status: BackendStatus::default(),
                checked_at: None,
            }),
        }
    }

    fn should_refresh(&self, state: &CacheState) -> bool {
        match state.checked_at {
            None => true,
            Some(checked_at) => checked_at.elapsed() > self.ttl,
        }
    }

    /// Return the backend status, probing the remote API only when the cached
    /// value has aged past the TTL.
    ///
    /// A refresh recomputes `configured` from credential presence, runs one
    /// ping probe when configured, and stamps `last_check` regardless of the
    /// probe's outcome.
    pub async fn check_status(&self, client: &CloudinaryClient) -> BackendStatus {
        let mut state = self.inner.lock().await;

        if !self.should_refresh(&state) {
            return state.status.clone();
        }

        state.status.configured = client.is_configured();
        state.status.online = false;
        state.status.error = false;
        state.status.error_message.clear();

        if state.status.configured {
            match client.ping().await {
                Ok(()) => state.status.online = true,
                Err(e) => {
                    state.status.error = true;
                    state.status.error_message = e.to_string();
                    tracing::error!(error = %e, "Cloudinary connection error");
                }
            }
        }

        state.status.last_check = Some(Utc::now());
        state.checked_at = Some(Instant::now());

        state.status.clone()
    }

    /// Fold an operation failure into the cached status so a later status
    /// check reflects it without a fresh round trip.
    pub async fn record_error(&self, message: impl Into<String>) {
        let mut state = self.inner.lock().await;
        state.status.online = false;
        state.status.error = true;
        state.status.error_message = message.into();
    }

    /// The cached status as-is, without triggering a refresh.
    pub async fn current(&self) -> BackendStatus {
        self.inner.lock().await.status.clone()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
