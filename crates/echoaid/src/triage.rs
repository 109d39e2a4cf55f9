//! Derived views over the request list.
//!
//! Everything here is a pure function of the current requests (and, for the
//! responder banner, the user list); nothing is cached.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::auth::User;
use crate::request::{RequestStatus, SosRequest};

/// Headline numbers for the responder dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Pending or in-progress requests.
    pub active_requests: usize,
    /// Distinct volunteers with an assigned request.
    pub volunteers_active: usize,
    /// Highest urgency among active requests, 0 if none.
    pub highest_urgency: u8,
    /// Requests resolved that were raised in the last 24 hours.
    pub resolved_today: usize,
}

/// Pending and in-progress requests, in list order.
#[must_use]
pub fn active_requests(requests: &[SosRequest]) -> Vec<&SosRequest> {
    requests.iter().filter(|r| r.status.is_active()).collect()
}

/// Active requests, most urgent first. Ties keep list order.
#[must_use]
pub fn triage_feed(requests: &[SosRequest]) -> Vec<&SosRequest> {
    let mut feed = active_requests(requests);
    feed.sort_by(|a, b| b.urgency_score.cmp(&a.urgency_score));
    feed
}

/// Compute the dashboard numbers as of `now`.
#[must_use]
pub fn dashboard_stats(requests: &[SosRequest], now: DateTime<Utc>) -> DashboardStats {
    let active = active_requests(requests);
    let volunteers: HashSet<&str> = requests
        .iter()
        .filter_map(|r| r.volunteer_id.as_deref())
        .collect();
    let since = now - Duration::hours(24);

    DashboardStats {
        active_requests: active.len(),
        volunteers_active: volunteers.len(),
        highest_urgency: active.iter().map(|r| r.urgency_score).max().unwrap_or(0),
        resolved_today: requests
            .iter()
            .filter(|r| r.status == RequestStatus::Resolved && r.timestamp > since)
            .count(),
    }
}

/// A volunteer's missions: in-progress first, then newest first.
#[must_use]
pub fn my_missions<'a>(requests: &'a [SosRequest], volunteer_id: &str) -> Vec<&'a SosRequest> {
    let mut missions: Vec<&SosRequest> = requests
        .iter()
        .filter(|r| r.is_assigned_to(volunteer_id))
        .collect();
    missions.sort_by(|a, b| {
        let a_active = a.status == RequestStatus::InProgress;
        let b_active = b.status == RequestStatus::InProgress;
        b_active
            .cmp(&a_active)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    missions
}

/// Requests raised by one requester, in list order.
#[must_use]
pub fn requests_for_requester<'a>(
    requests: &'a [SosRequest],
    requester_id: &str,
) -> Vec<&'a SosRequest> {
    requests
        .iter()
        .filter(|r| r.requester_id == requester_id)
        .collect()
}

/// The verified responder heading to a requester.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachingResponder<'a> {
    /// The mission.
    pub request: &'a SosRequest,
    /// The Aegis-verified volunteer.
    pub responder: &'a User,
    /// Code the responder will show on arrival.
    pub verification_code: Option<&'a str>,
}

/// The first in-progress request of `requester_id` whose volunteer is
/// Aegis-verified, for the safe-approach banner.
#[must_use]
pub fn approaching_responder<'a>(
    requests: &'a [SosRequest],
    users: &'a [User],
    requester_id: &str,
) -> Option<ApproachingResponder<'a>> {
    let request = requests.iter().find(|r| {
        r.requester_id == requester_id
            && r.status == RequestStatus::InProgress
            && r.volunteer_id.is_some()
    })?;
    let volunteer_id = request.volunteer_id.as_deref()?;
    let responder = users
        .iter()
        .find(|u| u.id == volunteer_id && u.is_aegis_verified)?;

    Some(ApproachingResponder {
        request,
        responder,
        verification_code: request.responder_verification_code.as_deref(),
    })
}
