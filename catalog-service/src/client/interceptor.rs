//! Client-side token attachment and background refresh
//!
//! The refresh task is the only owner of the cached token; it publishes new
//! values through a watch channel and the interceptor reads the latest one
//! per call. The token is attached to every outgoing call whether or not the
//! target method requires authorization — simplicity over precision, a known
//! inefficiency kept on purpose: the server ignores the header on open
//! methods.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, error, warn};

use grpc_auth::AUTHORIZATION_KEY;

use super::AuthClient;

/// Consecutive refresh failures tolerated before the process is considered
/// unrecoverable: with no valid credential there is nothing left to serve.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Attaches the currently cached bearer token to every outgoing call.
#[derive(Clone)]
pub struct ClientAuthInterceptor {
    token: watch::Receiver<AsciiMetadataValue>,
    refresh_now: Arc<Notify>,
}

impl ClientAuthInterceptor {
    /// Log in once synchronously (a failure here fails construction), then
    /// spawn the background refresh loop.
    pub async fn connect(
        mut auth_client: AuthClient,
        refresh_period: Duration,
    ) -> anyhow::Result<Self> {
        let token = auth_client.login().await.context("initial login failed")?;
        let (tx, rx) = watch::channel(bearer_value(&token)?);

        let refresh_now = Arc::new(Notify::new());
        tokio::spawn(refresh_loop(
            auth_client,
            tx,
            refresh_now.clone(),
            refresh_period,
        ));

        Ok(Self {
            token: rx,
            refresh_now,
        })
    }

    /// Ask the refresh loop to re-login ahead of schedule, e.g. after a call
    /// failed with `Unauthenticated`.
    pub fn refresh_now(&self) {
        self.refresh_now.notify_one();
    }
}

impl Interceptor for ClientAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let token = self.token.borrow().clone();
        request.metadata_mut().insert(AUTHORIZATION_KEY, token);
        Ok(request)
    }
}

fn bearer_value(token: &str) -> anyhow::Result<AsciiMetadataValue> {
    format!("Bearer {token}")
        .parse()
        .context("token is not valid ASCII metadata")
}

/// Tracks consecutive refresh failures against the fatal bound.
#[derive(Debug)]
struct RefreshState {
    consecutive_failures: u32,
    max_failures: u32,
}

impl RefreshState {
    fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Returns true once the failure budget is exhausted.
    fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures > self.max_failures
    }
}

async fn refresh_loop(
    mut client: AuthClient,
    tx: watch::Sender<AsciiMetadataValue>,
    refresh_now: Arc<Notify>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately; consume it so the
    // loop starts with a full period after the login done at construction.
    ticker.tick().await;

    let mut state = RefreshState::new(MAX_CONSECUTIVE_FAILURES);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh_now.notified() => {}
        }

        if !try_refresh(&mut client, &tx, &mut state).await {
            // One immediate retry before waiting for the next tick.
            try_refresh(&mut client, &tx, &mut state).await;
        }
    }
}

async fn try_refresh(
    client: &mut AuthClient,
    tx: &watch::Sender<AsciiMetadataValue>,
    state: &mut RefreshState,
) -> bool {
    let outcome = match client.login().await {
        Ok(token) => bearer_value(&token).map_err(|e| e.to_string()),
        Err(status) => Err(status.to_string()),
    };

    match outcome {
        Ok(value) => {
            let _ = tx.send(value);
            state.record_success();
            debug!("access token refreshed");
            true
        }
        Err(reason) => {
            warn!(
                consecutive = state.consecutive_failures + 1,
                error = %reason,
                "token refresh failed"
            );
            if state.record_failure() {
                error!(
                    "token refresh failed more than {MAX_CONSECUTIVE_FAILURES} consecutive \
                     times; no valid credential remains, terminating"
                );
                std::process::exit(1);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_budget_trips_after_the_bound() {
        let mut state = RefreshState::new(MAX_CONSECUTIVE_FAILURES);

        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            assert!(!state.record_failure());
        }
        // The 11th consecutive failure is fatal.
        assert!(state.record_failure());
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut state = RefreshState::new(MAX_CONSECUTIVE_FAILURES);

        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            assert!(!state.record_failure());
        }
        state.record_success();

        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            assert!(!state.record_failure());
        }
        assert!(state.record_failure());
    }

    #[test]
    fn bearer_value_formats_the_header() {
        let value = bearer_value("abc.def.ghi").unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc.def.ghi");
    }
}
