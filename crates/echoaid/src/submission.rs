//! The SOS form flow.
//!
//! Wraps [`AppState::submit_request`] with what a requester sees: location
//! detection, a queued/dispatched/failed outcome, and, once dispatched, a
//! best-effort lookup of official safety advice.

use tracing::{error, warn};

use crate::ai::{GroundedInfo, GroundedQuery};
use crate::app::AppState;
use crate::error::Result;
use crate::geo::Geolocator;
use crate::request::{EmergencyType, Location, RequestDraft, RequestStatus, SosRequest};

/// Address recorded for a detected location.
pub const DETECTED_LOCATION_ADDRESS: &str = "Current Location Detected";

/// Message shown after queuing an SOS offline.
pub const QUEUED_MESSAGE: &str =
    "Request queued. You appear to be offline. Your request will be sent when you reconnect.";

/// Message shown after dispatching an SOS.
pub const DISPATCHED_MESSAGE: &str = "SOS request submitted successfully.";

/// Fill the location from the device position.
///
/// # Errors
///
/// Returns [`crate::Error::Geolocation`] if the position is unavailable; its
/// [`user_message`](crate::Error::user_message) asks for manual entry.
pub async fn detect_location(geolocator: &dyn Geolocator) -> Result<Location> {
    let position = geolocator.current_position().await?;
    Ok(Location {
        lat: position.lat,
        lng: position.lng,
        address: DETECTED_LOCATION_ADDRESS.to_string(),
    })
}

/// Question asked after dispatch to fetch immediate safety advice.
#[must_use]
pub fn safety_query(emergency_type: EmergencyType, address: &str) -> String {
    format!(
        "For an emergency of type \"{emergency_type}\" at {address}, what are the immediate \
         safety instructions and official advice from reliable sources?"
    )
}

/// What happened to a submitted SOS.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Sent and waiting for a volunteer.
    Dispatched {
        /// The created request.
        request: SosRequest,
        /// Safety advice, if the lookup succeeded.
        safety_info: Option<GroundedInfo>,
    },
    /// Saved locally until connectivity returns.
    Queued {
        /// The queued request.
        request: SosRequest,
    },
    /// Nothing was created.
    Failed {
        /// What to tell the requester.
        message: String,
        /// Whether submitting again may work.
        retryable: bool,
    },
}

impl SubmissionOutcome {
    /// The created request, if any.
    #[must_use]
    pub fn request(&self) -> Option<&SosRequest> {
        match self {
            Self::Dispatched { request, .. } | Self::Queued { request } => Some(request),
            Self::Failed { .. } => None,
        }
    }

    /// Status line for the requester.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Dispatched { .. } => DISPATCHED_MESSAGE.to_string(),
            Self::Queued { .. } => QUEUED_MESSAGE.to_string(),
            Self::Failed { message, .. } => format!("Submission failed: {message}"),
        }
    }

    /// The one-line tip for the emergency category, if a request exists.
    #[must_use]
    pub fn safety_tip(&self) -> Option<&'static str> {
        self.request().map(|r| r.emergency_type.safety_tip())
    }
}

/// Submit a draft and report the outcome.
///
/// A failed safety lookup after dispatch does not fail the submission.
pub async fn submit(state: &mut AppState, draft: RequestDraft) -> SubmissionOutcome {
    let request = match state.submit_request(draft).await {
        Ok(request) => request,
        Err(e) => {
            error!("SOS submission failed: {}", e);
            return SubmissionOutcome::Failed {
                message: e.user_message(),
                retryable: e.is_retryable(),
            };
        }
    };

    if request.status == RequestStatus::Queued {
        return SubmissionOutcome::Queued { request };
    }

    let query = safety_query(request.emergency_type, &request.location.address);
    let safety_info = match state
        .collaborator()
        .grounded_lookup(&GroundedQuery::search(query))
        .await
    {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("Failed to get grounded info: {}", e);
            None
        }
    };

    SubmissionOutcome::Dispatched {
        request,
        safety_info,
    }
}
