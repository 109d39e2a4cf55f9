//! Application state.
//!
//! [`AppState`] owns the in-memory request list and is the only place
//! requests are created or mutated. It is handed its collaborators (store,
//! AI service, connectivity) at construction and can be shared between
//! tasks as a [`SharedState`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::{AiCollaborator, AiError, Analysis, GroundedInfo, GroundedQuery};
use crate::config::LifecycleConfig;
use crate::connectivity::{Connectivity, OnlineFlag};
use crate::error::{Error, Result};
use crate::lifecycle;
use crate::pulse::{PulseBlocked, PulseLimiter, DEFAULT_COOLDOWN};
use crate::queue::OfflineQueue;
use crate::request::{
    clamp_urgency_score, RequestDraft, RequestStatus, SosRequest, DEFAULT_URGENCY_SCORE,
};
use crate::storage::KeyValueStore;
use crate::verification::{self, ChecklistItem};

/// Message shown when a draft is missing its location or description.
pub const INCOMPLETE_DRAFT_MESSAGE: &str = "Please provide a location and a brief description.";

/// Default simulated pulse send time.
pub const DEFAULT_PULSE_LATENCY: Duration = Duration::from_secs(1);

/// Application state shared between tasks.
pub type SharedState = Arc<Mutex<AppState>>;

/// Tunables for request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSettings {
    /// Urgency score given to requests queued while offline.
    pub default_urgency_score: u8,
    /// Minimum time between pulses for one request.
    pub pulse_cooldown: Duration,
    /// Simulated time taken to send a pulse.
    pub pulse_latency: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_urgency_score: DEFAULT_URGENCY_SCORE,
            pulse_cooldown: DEFAULT_COOLDOWN,
            pulse_latency: DEFAULT_PULSE_LATENCY,
        }
    }
}

impl From<&LifecycleConfig> for AppSettings {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            default_urgency_score: config.default_urgency_score,
            pulse_cooldown: Duration::from_secs(config.pulse_cooldown_secs),
            pulse_latency: Duration::from_millis(config.pulse_latency_ms),
        }
    }
}

/// Outcome of replaying the offline queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Requests dispatched and removed from the queue.
    pub sent: Vec<String>,
    /// Requests that failed and remain queued.
    pub still_queued: Vec<String>,
}

enum ReplayPlan {
    Done(ReplayReport),
    Send(Vec<SosRequest>),
}

type ReplayResults = Vec<(SosRequest, std::result::Result<Analysis, AiError>)>;

async fn analyze_queued(ai: &dyn AiCollaborator, queued: Vec<SosRequest>) -> ReplayResults {
    let mut results = Vec::with_capacity(queued.len());
    for request in queued {
        let analysis = ai
            .score_and_summarize(&request.description, request.emergency_type)
            .await;
        results.push((request, analysis));
    }
    results
}

impl ReplayReport {
    /// Whether the replay had nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.still_queued.is_empty()
    }
}

/// The request list and the operations that change it.
#[derive(Debug)]
pub struct AppState {
    queue: OfflineQueue,
    ai: Arc<dyn AiCollaborator>,
    online: OnlineFlag,
    settings: AppSettings,
    requests: Vec<SosRequest>,
    pulses: HashMap<String, PulseLimiter>,
}

impl AppState {
    /// Build the state from its collaborators.
    ///
    /// The request list starts as `initial` followed by any requests still
    /// in the offline queue, oldest first. Only the read side of
    /// `connectivity` is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the offline queue cannot be read.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        ai: Arc<dyn AiCollaborator>,
        connectivity: &Connectivity,
        settings: AppSettings,
        initial: Vec<SosRequest>,
    ) -> Result<Self> {
        let queue = OfflineQueue::new(store);
        let queued = queue.load()?;
        if !queued.is_empty() {
            info!("Restored {} queued request(s)", queued.len());
        }
        let mut requests = initial;
        for request in queued {
            if !requests.iter().any(|r| r.id == request.id) {
                requests.push(request);
            }
        }

        Ok(Self {
            queue,
            ai,
            online: connectivity.flag(),
            settings,
            requests,
            pulses: HashMap::new(),
        })
    }

    /// Wrap the state for sharing between tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Every known request. Submissions made in this session come first.
    #[must_use]
    pub fn requests(&self) -> &[SosRequest] {
        &self.requests
    }

    /// Look a request up by id.
    #[must_use]
    pub fn request(&self, id: &str) -> Option<&SosRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// The durable offline queue.
    #[must_use]
    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Whether the network is currently believed to be reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.is_online()
    }

    /// The AI collaborator.
    #[must_use]
    pub fn collaborator(&self) -> &Arc<dyn AiCollaborator> {
        &self.ai
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    fn request_mut(&mut self, id: &str) -> Result<&mut SosRequest> {
        self.requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::request_not_found(id))
    }

    /// Create a request from a draft.
    ///
    /// Offline, the request is queued with the default urgency score and no
    /// AI call is made. Online, the AI collaborator is called exactly once
    /// and its score and summary are used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDraft`] for an incomplete draft and
    /// [`Error::Analysis`] if the AI call fails.
    pub async fn submit_request(&mut self, draft: RequestDraft) -> Result<SosRequest> {
        if !draft.is_complete() {
            return Err(Error::invalid_draft(INCOMPLETE_DRAFT_MESSAGE));
        }

        if !self.online.is_online() {
            info!("Offline mode detected. Queuing request.");
            let description = draft.description.clone();
            let request = draft.into_request(
                format!("offline-{}", Uuid::new_v4()),
                RequestStatus::Queued,
                self.settings.default_urgency_score,
                description,
            );
            self.queue.enqueue(&request)?;
            self.requests.insert(0, request.clone());
            return Ok(request);
        }

        let analysis = self
            .ai
            .score_and_summarize(&draft.description, draft.emergency_type)
            .await
            .map_err(Error::Analysis)?;

        let request = draft.into_request(
            format!("online-{}", Uuid::new_v4()),
            RequestStatus::Pending,
            clamp_urgency_score(i64::from(analysis.urgency_score)),
            analysis.summary,
        );
        info!(
            "Dispatched request {} with urgency {}",
            request.id, request.urgency_score
        );
        self.requests.insert(0, request.clone());
        Ok(request)
    }

    /// Move a request forward in its lifecycle.
    ///
    /// A queued request moved on by hand leaves the offline queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotFound`] for an unknown id and
    /// [`Error::InvalidTransition`] if the status would move backwards.
    pub fn update_request_status(&mut self, id: &str, status: RequestStatus) -> Result<SosRequest> {
        let request = self.request_mut(id)?;
        let was_queued = request.status == RequestStatus::Queued;
        lifecycle::advance(request, status)?;
        let updated = request.clone();
        self.dequeue_if_dispatched(was_queued, &updated)?;
        Ok(updated)
    }

    /// Assign a volunteer, which puts a pending request in progress.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotFound`] for an unknown id and
    /// [`Error::NotAcceptable`] unless the request is pending.
    pub fn assign_volunteer(&mut self, id: &str, volunteer_id: &str) -> Result<SosRequest> {
        let request = self.request_mut(id)?;
        lifecycle::assign(request, volunteer_id)?;
        info!("Volunteer {} accepted request {}", volunteer_id, id);
        Ok(request.clone())
    }

    fn dequeue_if_dispatched(&self, was_queued: bool, request: &SosRequest) -> Result<()> {
        if was_queued && request.status != RequestStatus::Queued {
            self.queue.remove_ids(std::slice::from_ref(&request.id))?;
        }
        Ok(())
    }

    /// Claim a pulse slot for a request and return how long the send takes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotFound`], [`Error::PulseInFlight`] or
    /// [`Error::PulseCooldown`].
    pub fn begin_pulse(&mut self, id: &str, now: Instant) -> Result<Duration> {
        if self.request(id).is_none() {
            return Err(Error::request_not_found(id));
        }
        let cooldown = self.settings.pulse_cooldown;
        let limiter = self
            .pulses
            .entry(id.to_string())
            .or_insert_with(|| PulseLimiter::new(cooldown));

        match limiter.try_begin(now) {
            Ok(()) => Ok(self.settings.pulse_latency),
            Err(PulseBlocked::InFlight) => Err(Error::PulseInFlight),
            Err(PulseBlocked::Cooldown(_)) => Err(Error::PulseCooldown {
                remaining_secs: limiter.remaining_secs(now),
            }),
        }
    }

    /// Record a sent pulse and start the cooldown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotFound`] if the request disappeared.
    pub fn complete_pulse(&mut self, id: &str, now: Instant) -> Result<DateTime<Utc>> {
        let sent_at = Utc::now();
        match self.request_mut(id) {
            Ok(request) => request.last_pulse_timestamp = Some(sent_at),
            Err(e) => {
                self.abort_pulse(id);
                return Err(e);
            }
        }
        if let Some(limiter) = self.pulses.get_mut(id) {
            limiter.complete(now);
        }
        debug!("Pulse recorded for {}", id);
        Ok(sent_at)
    }

    /// Release a claimed pulse slot without starting the cooldown.
    pub fn abort_pulse(&mut self, id: &str) {
        if let Some(limiter) = self.pulses.get_mut(id) {
            limiter.abort();
        }
    }

    /// Send an "I'm still here" pulse for a request.
    ///
    /// # Errors
    ///
    /// See [`AppState::begin_pulse`].
    pub async fn send_pulse(&mut self, id: &str) -> Result<DateTime<Utc>> {
        let latency = self.begin_pulse(id, Instant::now())?;
        tokio::time::sleep(latency).await;
        self.complete_pulse(id, Instant::now())
    }

    /// Whole seconds until the next pulse for `id` may be sent.
    #[must_use]
    pub fn pulse_remaining_secs(&self, id: &str, now: Instant) -> u64 {
        self.pulses
            .get(id)
            .map_or(0, |limiter| limiter.remaining_secs(now))
    }

    /// Resubmit every queued request.
    ///
    /// Each dispatched request keeps its id, becomes pending, and takes the
    /// AI score and summary. Failures stay queued. Does nothing while
    /// offline. Use [`replay_queue`] on shared state so the lock is not held
    /// across AI calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the offline queue cannot be read or written.
    pub async fn process_queue(&mut self) -> Result<ReplayReport> {
        let queued = match self.plan_replay()? {
            ReplayPlan::Done(report) => return Ok(report),
            ReplayPlan::Send(queued) => queued,
        };
        let ai = Arc::clone(&self.ai);
        let results = analyze_queued(ai.as_ref(), queued).await;
        self.apply_replay(results)
    }

    fn plan_replay(&self) -> Result<ReplayPlan> {
        let queued = self.queue.load()?;
        if queued.is_empty() {
            return Ok(ReplayPlan::Done(ReplayReport::default()));
        }
        if !self.online.is_online() {
            debug!("Still offline; {} request(s) stay queued", queued.len());
            return Ok(ReplayPlan::Done(ReplayReport {
                sent: Vec::new(),
                still_queued: queued.into_iter().map(|r| r.id).collect(),
            }));
        }
        info!("Processing {} queued requests...", queued.len());
        Ok(ReplayPlan::Send(queued))
    }

    /// Apply analysis results to requests that are still queued.
    ///
    /// A request that left the queue while its analysis was running is
    /// skipped and appears in neither list of the report.
    fn apply_replay(&mut self, results: ReplayResults) -> Result<ReplayReport> {
        let still_in_queue: Vec<String> = self.queue.load()?.into_iter().map(|r| r.id).collect();
        let mut report = ReplayReport::default();

        for (queued_request, outcome) in results {
            if !still_in_queue.contains(&queued_request.id) {
                debug!(
                    "Request {} left the queue during replay; skipping",
                    queued_request.id
                );
                continue;
            }
            match outcome {
                Ok(analysis) => {
                    let score = clamp_urgency_score(i64::from(analysis.urgency_score));
                    match self.requests.iter_mut().find(|r| r.id == queued_request.id) {
                        Some(request) => {
                            if request.status == RequestStatus::Queued {
                                request.status = RequestStatus::Pending;
                            }
                            request.urgency_score = score;
                            request.description = analysis.summary;
                        }
                        None => {
                            let mut request = queued_request.clone();
                            request.status = RequestStatus::Pending;
                            request.urgency_score = score;
                            request.description = analysis.summary;
                            self.requests.insert(0, request);
                        }
                    }
                    info!("Request {} successfully sent.", queued_request.id);
                    report.sent.push(queued_request.id);
                }
                Err(e) => {
                    warn!(
                        "Failed to send queued request {}. It will remain in the queue. ({})",
                        queued_request.id, e
                    );
                    report.still_queued.push(queued_request.id);
                }
            }
        }

        self.queue.remove_ids(&report.sent)?;
        Ok(report)
    }

    /// Run an AI web-search investigation of a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VerificationGate`] if the tier does not allow it and
    /// [`Error::Lookup`] if the lookup fails.
    pub async fn investigate(&self, id: &str) -> Result<GroundedInfo> {
        let request = self.request(id).ok_or_else(|| Error::request_not_found(id))?;
        let query = verification::investigation_query(request)?;
        debug!("Investigating {}: {}", id, query);
        self.ai
            .grounded_lookup(&GroundedQuery::search(query))
            .await
            .map_err(Error::Lookup)
    }

    /// The Aegis evidence checklist of a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestNotFound`] or [`Error::VerificationGate`].
    pub fn evidence(&self, id: &str) -> Result<Vec<ChecklistItem>> {
        let request = self.request(id).ok_or_else(|| Error::request_not_found(id))?;
        verification::evidence_checklist(request)
    }
}

/// Send a pulse without holding the state lock during the send.
///
/// # Errors
///
/// See [`AppState::begin_pulse`].
pub async fn send_pulse(state: &Mutex<AppState>, id: &str) -> Result<DateTime<Utc>> {
    let latency = state.lock().await.begin_pulse(id, Instant::now())?;
    tokio::time::sleep(latency).await;
    state.lock().await.complete_pulse(id, Instant::now())
}

/// Resubmit every queued request without holding the state lock during AI
/// calls.
///
/// Requests that leave the queue while the replay runs, for example by a
/// manual status change, are left as they are.
///
/// # Errors
///
/// Returns an error if the offline queue cannot be read or written.
pub async fn replay_queue(state: &Mutex<AppState>) -> Result<ReplayReport> {
    let (ai, queued) = {
        let guard = state.lock().await;
        match guard.plan_replay()? {
            ReplayPlan::Done(report) => return Ok(report),
            ReplayPlan::Send(queued) => (Arc::clone(&guard.ai), queued),
        }
    };
    let results = analyze_queued(ai.as_ref(), queued).await;
    state.lock().await.apply_replay(results)
}

async fn replay(state: &Mutex<AppState>) {
    match replay_queue(state).await {
        Ok(report) if report.is_empty() => {}
        Ok(report) => info!(
            "Queue replay: {} sent, {} still queued",
            report.sent.len(),
            report.still_queued.len()
        ),
        Err(e) => warn!("Queue replay failed: {}", e),
    }
}

/// Replay the offline queue now if online, then on every reconnect.
///
/// The task ends when every [`Connectivity`] handle is dropped. The state
/// only holds an [`OnlineFlag`], so it does not keep the task alive.
#[must_use]
pub fn spawn_queue_replayer(state: SharedState, connectivity: &Connectivity) -> JoinHandle<()> {
    let mut rx = connectivity.subscribe();
    tokio::spawn(async move {
        if *rx.borrow_and_update() {
            replay(&state).await;
        }
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online {
                replay(&state).await;
            }
        }
        debug!("Queue replayer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockCollaborator;
    use crate::request::{EmergencyType, Location, VerificationTier};
    use crate::seed;
    use crate::storage::{MemoryStore, QUEUED_REQUESTS_KEY};

    fn settings() -> AppSettings {
        AppSettings {
            pulse_latency: Duration::ZERO,
            ..AppSettings::default()
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        ai: Arc<MockCollaborator>,
        connectivity: Connectivity,
        state: AppState,
    }

    fn fixture_with(ai: MockCollaborator, online: bool) -> Fixture {
        crate::logging::init_test_logging();
        let store = Arc::new(MemoryStore::new());
        let ai = Arc::new(ai);
        let connectivity = Connectivity::new(online);
        let state = AppState::new(
            store.clone(),
            ai.clone(),
            &connectivity,
            settings(),
            seed::requests(Utc::now()),
        )
        .unwrap();
        Fixture {
            store,
            ai,
            connectivity,
            state,
        }
    }

    fn fixture(online: bool) -> Fixture {
        fixture_with(MockCollaborator::new().with_analysis(8, "Rising water"), online)
    }

    fn flood_draft(description: &str) -> RequestDraft {
        RequestDraft::new(
            "user-1",
            EmergencyType::Flood,
            description,
            Location::from_address("Test St"),
        )
    }

    #[tokio::test]
    async fn test_offline_submit_queues_without_ai_call() {
        let mut f = fixture(false);
        let request = f
            .state
            .submit_request(flood_draft("Water up to the knees"))
            .await
            .unwrap();

        assert!(request.id.starts_with("offline-"));
        assert_eq!(request.status, RequestStatus::Queued);
        assert_eq!(request.urgency_score, 5);
        assert_eq!(request.description, "Water up to the knees");
        assert_eq!(f.ai.analysis_calls(), 0);
        assert_eq!(f.state.queue().len().unwrap(), 1);
        assert_eq!(f.state.requests()[0].id, request.id);
    }

    #[tokio::test]
    async fn test_online_submit_calls_ai_once() {
        let mut f = fixture(true);
        let request = f
            .state
            .submit_request(flood_draft("Water up to the knees"))
            .await
            .unwrap();

        assert!(request.id.starts_with("online-"));
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.urgency_score, 8);
        assert_eq!(request.description, "Rising water");
        assert_eq!(f.ai.analysis_calls(), 1);
        assert!(f.state.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_online_submit_failure_is_analysis_error() {
        let mut f = fixture_with(MockCollaborator::new().failing_on("boom"), true);
        let before = f.state.requests().len();

        let err = f
            .state
            .submit_request(flood_draft("boom"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Analysis(_)));
        assert!(err.is_retryable());
        assert_eq!(f.state.requests().len(), before);
    }

    #[tokio::test]
    async fn test_incomplete_draft_rejected() {
        let mut f = fixture(true);
        let draft = RequestDraft::new(
            "user-1",
            EmergencyType::Fire,
            "Smoke",
            Location::from_address("   "),
        );
        let err = f.state.submit_request(draft).await.unwrap_err();
        assert_eq!(err.to_string(), INCOMPLETE_DRAFT_MESSAGE);
        assert_eq!(f.ai.analysis_calls(), 0);
    }

    #[tokio::test]
    async fn test_queued_requests_restored_on_startup() {
        let f = fixture(false);
        let mut state = f.state;
        let queued = state.submit_request(flood_draft("first")).await.unwrap();

        let restored = AppState::new(
            f.store.clone(),
            f.ai.clone(),
            &Connectivity::offline(),
            settings(),
            seed::requests(Utc::now()),
        )
        .unwrap();
        let requests = restored.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].id, "sos-1");
        assert_eq!(requests[4].id, queued.id);
    }

    #[tokio::test]
    async fn test_restored_queue_keeps_stored_order() {
        let mut f = fixture(false);
        let first = f.state.submit_request(flood_draft("first")).await.unwrap();
        let second = f.state.submit_request(flood_draft("second")).await.unwrap();

        let restored = AppState::new(
            f.store.clone(),
            f.ai.clone(),
            &Connectivity::offline(),
            settings(),
            Vec::new(),
        )
        .unwrap();
        let ids: Vec<&str> = restored.requests().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_replay_removes_only_successful_items() {
        let mut f = fixture_with(MockCollaborator::new().failing_on("unreachable"), false);
        let ok = f.state.submit_request(flood_draft("Water rising")).await.unwrap();
        let bad = f
            .state
            .submit_request(flood_draft("unreachable village"))
            .await
            .unwrap();

        f.connectivity.set_online(true);
        let report = f.state.process_queue().await.unwrap();

        assert_eq!(report.sent, vec![ok.id.clone()]);
        assert_eq!(report.still_queued, vec![bad.id.clone()]);

        let remaining: Vec<String> = f
            .state
            .queue()
            .load()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(remaining, vec![bad.id.clone()]);

        let sent = f.state.request(&ok.id).unwrap();
        assert_eq!(sent.status, RequestStatus::Pending);
        assert_eq!(sent.description, "Flood: Water rising");
        assert_eq!(f.state.request(&bad.id).unwrap().status, RequestStatus::Queued);
    }

    #[tokio::test]
    async fn test_replay_while_offline_keeps_everything() {
        let mut f = fixture(false);
        let queued = f.state.submit_request(flood_draft("x")).await.unwrap();

        let report = f.state.process_queue().await.unwrap();
        assert!(report.sent.is_empty());
        assert_eq!(report.still_queued, vec![queued.id]);
        assert_eq!(f.ai.analysis_calls(), 0);
    }

    #[tokio::test]
    async fn test_replay_empty_queue() {
        let mut f = fixture(true);
        assert!(f.state.process_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_store_left_as_empty_array() {
        let mut f = fixture(false);
        f.state.submit_request(flood_draft("x")).await.unwrap();
        f.connectivity.set_online(true);
        f.state.process_queue().await.unwrap();

        assert_eq!(
            f.store.get(QUEUED_REQUESTS_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_update_status_forward_only() {
        let mut f = fixture(true);
        let updated = f
            .state
            .update_request_status("sos-2", RequestStatus::Resolved)
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Resolved);

        let err = f
            .state
            .update_request_status("sos-2", RequestStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_update_unknown_request() {
        let mut f = fixture(true);
        let err = f
            .state
            .update_request_status("sos-404", RequestStatus::Resolved)
            .unwrap_err();
        assert!(matches!(err, Error::RequestNotFound { .. }));
    }

    #[test]
    fn test_assign_volunteer_keeps_tier() {
        let mut f = fixture(true);
        let updated = f.state.assign_volunteer("sos-4-aegis-verified", "user-2").unwrap();

        assert_eq!(updated.status, RequestStatus::InProgress);
        assert!(updated.is_assigned_to("user-2"));
        assert_eq!(updated.tier(), VerificationTier::AegisVerified);
    }

    #[test]
    fn test_second_volunteer_cannot_take_mission() {
        let mut f = fixture(true);
        let err = f.state.assign_volunteer("sos-1", "user-999").unwrap_err();

        assert!(matches!(
            err,
            Error::NotAcceptable {
                status: RequestStatus::InProgress,
                ..
            }
        ));
        let request = f.state.request("sos-1").unwrap();
        assert_eq!(request.volunteer_id.as_deref(), Some("user-2"));
        assert_eq!(request.status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn test_queued_request_cannot_be_accepted() {
        let mut f = fixture(false);
        let queued = f.state.submit_request(flood_draft("x")).await.unwrap();

        let err = f.state.assign_volunteer(&queued.id, "user-2").unwrap_err();
        assert!(matches!(err, Error::NotAcceptable { .. }));
        assert_eq!(f.state.queue().len().unwrap(), 1);
        assert!(f.state.request(&queued.id).unwrap().volunteer_id.is_none());
    }

    #[tokio::test]
    async fn test_pulse_sets_timestamp_then_cools_down() {
        let mut f = fixture(true);
        let sent_at = f.state.send_pulse("sos-1").await.unwrap();

        let request = f.state.request("sos-1").unwrap();
        assert_eq!(request.last_pulse_timestamp, Some(sent_at));
        assert_eq!(request.tier(), VerificationTier::Unverified);

        let err = f.state.send_pulse("sos-1").await.unwrap_err();
        assert!(matches!(err, Error::PulseCooldown { remaining_secs } if remaining_secs > 0 && remaining_secs <= 30));
        assert!(f.state.pulse_remaining_secs("sos-1", Instant::now()) > 0);
    }

    #[tokio::test]
    async fn test_pulse_cooldown_is_per_request() {
        let mut f = fixture(true);
        f.state.send_pulse("sos-1").await.unwrap();
        assert!(f.state.send_pulse("sos-2").await.is_ok());
    }

    #[test]
    fn test_pulse_in_flight_guard() {
        let mut f = fixture(true);
        let now = Instant::now();
        f.state.begin_pulse("sos-1", now).unwrap();

        let err = f.state.begin_pulse("sos-1", now).unwrap_err();
        assert!(matches!(err, Error::PulseInFlight));

        f.state.abort_pulse("sos-1");
        assert!(f.state.begin_pulse("sos-1", now).is_ok());
    }

    #[tokio::test]
    async fn test_pulse_unknown_request() {
        let mut f = fixture(true);
        assert!(matches!(
            f.state.send_pulse("nope").await,
            Err(Error::RequestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_shared_pulse() {
        let f = fixture(true);
        let shared = f.state.into_shared();
        send_pulse(&shared, "sos-3").await.unwrap();
        assert!(matches!(
            send_pulse(&shared, "sos-3").await,
            Err(Error::PulseCooldown { .. })
        ));
    }

    #[tokio::test]
    async fn test_investigate_gated_by_tier() {
        let f = fixture(true);
        let err = f.state.investigate("sos-3").await.unwrap_err();
        assert!(matches!(err, Error::VerificationGate { .. }));
        assert_eq!(f.ai.lookup_calls(), 0);

        f.state.investigate("sos-2").await.unwrap();
        let lookups = f.ai.lookups();
        assert_eq!(
            lookups[0].query(),
            "Fire reported at Chandni Chowk, Delhi. Description: Shop on fire in Chandni Chowk, heavy smoke visible."
        );
    }

    #[test]
    fn test_evidence_only_for_aegis() {
        let f = fixture(true);
        assert!(!f.state.evidence("sos-4-aegis-verified").unwrap().is_empty());
        assert!(f.state.evidence("sos-1").is_err());
    }

    #[tokio::test]
    async fn test_replayer_runs_on_reconnect() {
        let mut f = fixture(false);
        let queued = f.state.submit_request(flood_draft("Water rising")).await.unwrap();
        let connectivity = f.connectivity.clone();
        let shared = f.state.into_shared();

        let handle = spawn_queue_replayer(shared.clone(), &connectivity);
        connectivity.set_online(true);

        let dispatched = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let state = shared.lock().await;
                    if state.request(&queued.id).map(|r| r.status) == Some(RequestStatus::Pending) {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(dispatched.is_ok());
        assert!(shared.lock().await.queue().is_empty().unwrap());
        handle.abort();
    }

    #[tokio::test]
    async fn test_replayer_runs_at_startup_when_online() {
        let offline = fixture(false);
        let mut state = offline.state;
        let queued = state.submit_request(flood_draft("x")).await.unwrap();

        let connectivity = Connectivity::online();
        let restarted = AppState::new(
            offline.store.clone(),
            offline.ai.clone(),
            &connectivity,
            settings(),
            Vec::new(),
        )
        .unwrap()
        .into_shared();

        let handle = spawn_queue_replayer(restarted.clone(), &connectivity);
        let dispatched = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if restarted.lock().await.queue().is_empty().unwrap() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(dispatched.is_ok());
        assert_eq!(
            restarted.lock().await.request(&queued.id).map(|r| r.status),
            Some(RequestStatus::Pending)
        );
        handle.abort();
    }

    async fn wait_for_analysis(ai: &MockCollaborator) {
        let started = tokio::time::timeout(Duration::from_secs(5), async {
            while ai.analysis_calls() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(started.is_ok());
    }

    #[tokio::test]
    async fn test_pulse_not_blocked_by_replay() {
        let slow = MockCollaborator::new().with_analysis_delay(Duration::from_millis(500));
        let mut f = fixture_with(slow, false);
        f.state.submit_request(flood_draft("x")).await.unwrap();
        f.connectivity.set_online(true);
        let shared = f.state.into_shared();

        let replaying = tokio::spawn({
            let shared = shared.clone();
            async move { replay_queue(&shared).await }
        });
        wait_for_analysis(&f.ai).await;

        let pulse = tokio::time::timeout(Duration::from_millis(200), send_pulse(&shared, "sos-1")).await;
        assert!(matches!(pulse, Ok(Ok(_))));

        let report = replaying.await.unwrap().unwrap();
        assert_eq!(report.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_skips_request_advanced_meanwhile() {
        let slow = MockCollaborator::new().with_analysis_delay(Duration::from_millis(300));
        let mut f = fixture_with(slow, false);
        let queued = f.state.submit_request(flood_draft("x")).await.unwrap();
        f.connectivity.set_online(true);
        let shared = f.state.into_shared();

        let replaying = tokio::spawn({
            let shared = shared.clone();
            async move { replay_queue(&shared).await }
        });
        wait_for_analysis(&f.ai).await;
        shared
            .lock()
            .await
            .update_request_status(&queued.id, RequestStatus::Resolved)
            .unwrap();

        let report = replaying.await.unwrap().unwrap();
        assert!(report.is_empty());

        let state = shared.lock().await;
        let request = state.request(&queued.id).unwrap();
        assert_eq!(request.status, RequestStatus::Resolved);
        assert_eq!(request.description, "x");
        assert!(state.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_replayer_stops_when_connectivity_dropped() {
        let Fixture {
            connectivity,
            state,
            ..
        } = fixture(false);
        let shared = state.into_shared();

        let handle = spawn_queue_replayer(shared.clone(), &connectivity);
        drop(connectivity);

        let finished = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(finished, Ok(Ok(()))));
    }

    #[test]
    fn test_settings_from_config() {
        let config = LifecycleConfig {
            default_urgency_score: 4,
            pulse_cooldown_secs: 10,
            pulse_latency_ms: 250,
        };
        let s = AppSettings::from(&config);
        assert_eq!(s.default_urgency_score, 4);
        assert_eq!(s.pulse_cooldown, Duration::from_secs(10));
        assert_eq!(s.pulse_latency, Duration::from_millis(250));
    }
}
