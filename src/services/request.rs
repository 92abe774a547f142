//! Request tokens and the caller-facing analytics view
//!
//! Every analytics request is tagged with a token from a monotonically
//! increasing counter. A result is surfaced only if its token is still the
//! latest one issued; results of superseded requests are dropped silently.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::debug;

use crate::types::{
    CategoryPairing, FetchError, PairingAnalyticsResult, RevenueLift, ServicePairing,
    StandaloneRate,
};

/// Generation number of one analytics request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Issues request tokens and answers "is this still the latest request?"
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }
}

/// Assembled output for a presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsOutput {
    pub pairings: Vec<ServicePairing>,
    pub category_pairings: Vec<CategoryPairing>,
    pub standalone_rates: Vec<StandaloneRate>,
    pub revenue_lift: Vec<RevenueLift>,
    pub is_loading: bool,
    /// Message of the last fetch failure, cleared by the next success
    pub error: Option<String>,
}

impl AnalyticsOutput {
    pub fn from_result(result: PairingAnalyticsResult) -> Self {
        Self {
            pairings: result.pairings,
            category_pairings: result.category_pairings,
            standalone_rates: result.standalone_rates,
            revenue_lift: result.revenue_lift,
            is_loading: false,
            error: None,
        }
    }

    /// Successful run with nothing in range
    pub fn has_no_data(&self) -> bool {
        !self.is_loading
            && self.error.is_none()
            && self.pairings.is_empty()
            && self.category_pairings.is_empty()
            && self.standalone_rates.is_empty()
            && self.revenue_lift.is_empty()
    }
}

/// Latest analytics output, guarded by request tokens.
///
/// Call [`begin`](Self::begin) when a request starts and
/// [`complete`](Self::complete) with its outcome; a completion for any token
/// other than the latest is discarded.
#[derive(Debug, Default)]
pub struct AnalyticsView {
    tracker: RequestTracker,
    output: Mutex<AnalyticsOutput>,
}

impl AnalyticsView {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AnalyticsOutput> {
        self.output
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start a request: issue its token and mark the view loading
    pub fn begin(&self) -> RequestToken {
        let mut output = self.lock();
        let token = self.tracker.issue();
        output.is_loading = true;
        token
    }

    /// Apply a request's outcome. Returns false if the token was stale.
    pub fn complete(
        &self,
        token: RequestToken,
        result: Result<PairingAnalyticsResult, FetchError>,
    ) -> bool {
        let mut output = self.lock();
        if !self.tracker.is_current(token) {
            debug!(
                stale = token.generation(),
                latest = ?self.tracker.latest().map(RequestToken::generation),
                "dropping stale analytics result"
            );
            return false;
        }

        *output = match result {
            Ok(result) => AnalyticsOutput::from_result(result),
            Err(e) => AnalyticsOutput {
                error: Some(e.to_string()),
                ..AnalyticsOutput::default()
            },
        };
        true
    }

    pub fn snapshot(&self) -> AnalyticsOutput {
        self.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }
}

/// Outcome notice sent when a spawned analysis finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub token: RequestToken,
    /// False when a newer request superseded this one
    pub applied: bool,
}

/// Run `job` on a background thread and publish its outcome to `view`.
///
/// The token is issued before the thread starts, so requests are ordered by
/// call order, not by finish order.
pub fn spawn_analysis<F>(view: Arc<AnalyticsView>, job: F) -> (RequestToken, mpsc::Receiver<Completion>)
where
    F: FnOnce() -> Result<PairingAnalyticsResult, FetchError> + Send + 'static,
{
    let token = view.begin();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let applied = view.complete(token, job());
        let _ = tx.send(Completion { token, applied });
    });
    (token, rx)
}
