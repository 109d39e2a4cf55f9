//! Request lifecycle rules.
//!
//! Statuses only move forward: `Queued -> Pending -> InProgress -> Resolved`.
//! Steps may be skipped (a pending request can be resolved without a
//! volunteer) but never reversed. Re-applying the current status is allowed
//! and is a no-op.

use crate::error::{Error, Result};
use crate::request::{RequestStatus, SosRequest};

/// Whether `from -> to` is a legal status change.
#[must_use]
pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
    to >= from
}

/// Move a request to a new status.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] if the change would regress the status.
pub fn advance(request: &mut SosRequest, to: RequestStatus) -> Result<()> {
    if !can_transition(request.status, to) {
        return Err(Error::InvalidTransition {
            id: request.id.clone(),
            from: request.status,
            to,
        });
    }
    request.status = to;
    Ok(())
}

/// Assign a volunteer and mark the mission in progress.
///
/// Only pending requests can be accepted: a queued request has not been
/// dispatched yet and an in-progress one already has its volunteer. Only the
/// volunteer and status change; the verification tier is left alone.
///
/// # Errors
///
/// Returns [`Error::NotAcceptable`] for any status other than pending.
pub fn assign(request: &mut SosRequest, volunteer_id: &str) -> Result<()> {
    if request.status != RequestStatus::Pending {
        return Err(Error::NotAcceptable {
            id: request.id.clone(),
            status: request.status,
        });
    }
    request.status = RequestStatus::InProgress;
    request.volunteer_id = Some(volunteer_id.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{EmergencyType, Location, RequestDraft, Verification};

    fn request_with(status: RequestStatus) -> SosRequest {
        RequestDraft::new(
            "user-1",
            EmergencyType::Medical,
            "Fell down the stairs",
            Location::from_address("Bandra, Mumbai"),
        )
        .into_request("sos-t".to_string(), status, 8, "Fall".to_string())
    }

    #[test]
    fn test_forward_transitions_allowed() {
        use RequestStatus::{InProgress, Pending, Queued, Resolved};
        assert!(can_transition(Queued, Pending));
        assert!(can_transition(Pending, InProgress));
        assert!(can_transition(InProgress, Resolved));
        assert!(can_transition(Pending, Resolved));
        assert!(can_transition(Pending, Pending));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        use RequestStatus::{InProgress, Pending, Queued, Resolved};
        assert!(!can_transition(Pending, Queued));
        assert!(!can_transition(InProgress, Pending));
        assert!(!can_transition(Resolved, InProgress));
        assert!(!can_transition(Resolved, Queued));
    }

    #[test]
    fn test_advance_updates_status() {
        let mut request = request_with(RequestStatus::Pending);
        advance(&mut request, RequestStatus::Resolved).unwrap();
        assert_eq!(request.status, RequestStatus::Resolved);
    }

    #[test]
    fn test_advance_regression_leaves_request_untouched() {
        let mut request = request_with(RequestStatus::Resolved);
        let err = advance(&mut request, RequestStatus::Pending).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(request.status, RequestStatus::Resolved);
    }

    #[test]
    fn test_assign_sets_volunteer_and_in_progress() {
        let mut request = request_with(RequestStatus::Pending);
        request.verification = Verification::ClusterVerified { cluster_count: 3 };

        assign(&mut request, "user-2").unwrap();

        assert_eq!(request.status, RequestStatus::InProgress);
        assert_eq!(request.volunteer_id.as_deref(), Some("user-2"));
        assert_eq!(
            request.verification,
            Verification::ClusterVerified { cluster_count: 3 }
        );
    }

    #[test]
    fn test_assign_resolved_request_fails() {
        let mut request = request_with(RequestStatus::Resolved);
        assert!(assign(&mut request, "user-2").is_err());
        assert!(request.volunteer_id.is_none());
    }

    #[test]
    fn test_assign_queued_request_fails() {
        let mut request = request_with(RequestStatus::Queued);
        let err = assign(&mut request, "user-2").unwrap_err();
        assert!(matches!(
            err,
            Error::NotAcceptable {
                status: RequestStatus::Queued,
                ..
            }
        ));
        assert_eq!(request.status, RequestStatus::Queued);
    }

    #[test]
    fn test_second_accept_keeps_first_volunteer() {
        let mut request = request_with(RequestStatus::Pending);
        assign(&mut request, "user-2").unwrap();

        let err = assign(&mut request, "user-9").unwrap_err();
        assert!(matches!(err, Error::NotAcceptable { .. }));
        assert_eq!(request.volunteer_id.as_deref(), Some("user-2"));
    }
}
