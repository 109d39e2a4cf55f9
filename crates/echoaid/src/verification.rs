//! Verification tier gating.
//!
//! The tier of a request decides which actions a volunteer is offered. This
//! is pure branching on the tier; nothing here changes a request.

use crate::error::{Error, Result};
use crate::request::{RequestStatus, SosRequest, Verification, VerificationTier};

/// Actions offered to the viewer of a request card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Affordances {
    /// Run an AI web-search investigation.
    pub investigate: bool,
    /// Open the Aegis evidence checklist.
    pub view_evidence: bool,
    /// Accept the mission.
    pub accept: bool,
    /// Show the "assigned to you" marker.
    pub assigned_to_viewer: bool,
}

/// Who is looking at a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer<'a> {
    /// The requester side; no volunteer actions.
    Requester,
    /// A volunteer with the given user id.
    Volunteer(&'a str),
}

/// Whether requests of this tier may be investigated further.
#[must_use]
pub fn is_investigable(tier: VerificationTier) -> bool {
    matches!(
        tier,
        VerificationTier::Unverified | VerificationTier::ClusterVerified
    )
}

/// Whether requests of this tier expose the detailed evidence view.
#[must_use]
pub fn has_evidence_view(tier: VerificationTier) -> bool {
    tier == VerificationTier::AegisVerified
}

/// Compute the actions offered for a request.
#[must_use]
pub fn affordances(request: &SosRequest, viewer: Viewer<'_>) -> Affordances {
    match viewer {
        Viewer::Requester => Affordances::default(),
        Viewer::Volunteer(user_id) => Affordances {
            investigate: is_investigable(request.tier()),
            view_evidence: has_evidence_view(request.tier()),
            accept: request.status == RequestStatus::Pending,
            assigned_to_viewer: request.is_assigned_to(user_id),
        },
    }
}

/// Short badge text for tiers that carry one.
#[must_use]
pub fn badge(verification: &Verification) -> Option<String> {
    match verification {
        Verification::OfficiallyVerified { official_source } => {
            Some(format!("Verified by {official_source}"))
        }
        Verification::ClusterVerified { cluster_count } => {
            Some(format!("{cluster_count} similar reports"))
        }
        Verification::AegisVerified {
            confidence_score, ..
        } => Some(format!("Aegis Verified ({confidence_score}%)")),
        Verification::Unverified => None,
    }
}

/// One line of the Aegis evidence checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// What was checked.
    pub text: String,
    /// Whether the check supports the report.
    pub verified: bool,
    /// Optional image.
    pub thumbnail: Option<String>,
}

/// Build the evidence checklist of an Aegis-verified request.
///
/// # Errors
///
/// Returns [`Error::VerificationGate`] for any other tier.
pub fn evidence_checklist(request: &SosRequest) -> Result<Vec<ChecklistItem>> {
    let Verification::AegisVerified { evidence, .. } = &request.verification else {
        return Err(Error::VerificationGate {
            action: "evidence view",
            tier: request.tier().to_string(),
        });
    };

    let plain = |text: &Option<String>, verified: bool| {
        text.as_ref().map(|t| ChecklistItem {
            text: t.clone(),
            verified,
            thumbnail: None,
        })
    };

    let social = evidence.social_media.as_ref().map(|s| ChecklistItem {
        text: s.text.clone(),
        verified: true,
        thumbnail: s.thumbnail.clone(),
    });

    // Seismic data is reported as the negative check.
    Ok([
        plain(&evidence.cluster_analysis, true),
        social,
        plain(&evidence.sensor_data, true),
        plain(&evidence.user_history, true),
        plain(&evidence.seismic_data, false),
    ]
    .into_iter()
    .flatten()
    .collect())
}

/// Build the web-search query used to investigate a request.
///
/// # Errors
///
/// Returns [`Error::VerificationGate`] when the tier is not investigable.
pub fn investigation_query(request: &SosRequest) -> Result<String> {
    if !is_investigable(request.tier()) {
        return Err(Error::VerificationGate {
            action: "investigate",
            tier: request.tier().to_string(),
        });
    }
    Ok(format!(
        "{} reported at {}. Description: {}",
        request.emergency_type, request.location.address, request.description
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        EmergencyType, Location, RequestDraft, SocialMediaEvidence, VerificationEvidence,
    };

    fn request(verification: Verification, status: RequestStatus) -> SosRequest {
        let mut request = RequestDraft::new(
            "user-4",
            EmergencyType::Flood,
            "Ground floor flooded",
            Location::from_address("Adyar, Chennai"),
        )
        .into_request("sos-v".to_string(), status, 10, "Flooded".to_string());
        request.verification = verification;
        request
    }

    fn aegis() -> Verification {
        Verification::AegisVerified {
            confidence_score: 95,
            cluster_count: Some(4),
            evidence: VerificationEvidence {
                cluster_analysis: Some("4 other SOS pings".to_string()),
                social_media: Some(SocialMediaEvidence {
                    text: "2 public photos".to_string(),
                    url: None,
                    thumbnail: Some("https://example.org/t.jpg".to_string()),
                }),
                sensor_data: Some("Severe flood warning zone".to_string()),
                user_history: None,
                seismic_data: Some("No seismic activity detected.".to_string()),
            },
        }
    }

    #[test]
    fn test_investigable_tiers() {
        assert!(is_investigable(VerificationTier::Unverified));
        assert!(is_investigable(VerificationTier::ClusterVerified));
        assert!(!is_investigable(VerificationTier::AegisVerified));
        assert!(!is_investigable(VerificationTier::OfficiallyVerified));
    }

    #[test]
    fn test_only_aegis_has_evidence_view() {
        assert!(has_evidence_view(VerificationTier::AegisVerified));
        assert!(!has_evidence_view(VerificationTier::Unverified));
        assert!(!has_evidence_view(VerificationTier::ClusterVerified));
        assert!(!has_evidence_view(VerificationTier::OfficiallyVerified));
    }

    #[test]
    fn test_requester_gets_no_actions() {
        let req = request(Verification::Unverified, RequestStatus::Pending);
        assert_eq!(affordances(&req, Viewer::Requester), Affordances::default());
    }

    #[test]
    fn test_volunteer_affordances_for_pending_unverified() {
        let req = request(Verification::Unverified, RequestStatus::Pending);
        let a = affordances(&req, Viewer::Volunteer("user-2"));
        assert!(a.investigate);
        assert!(!a.view_evidence);
        assert!(a.accept);
        assert!(!a.assigned_to_viewer);
    }

    #[test]
    fn test_volunteer_affordances_for_assigned_aegis() {
        let mut req = request(aegis(), RequestStatus::InProgress);
        req.volunteer_id = Some("user-2".to_string());
        let a = affordances(&req, Viewer::Volunteer("user-2"));
        assert!(!a.investigate);
        assert!(a.view_evidence);
        assert!(!a.accept);
        assert!(a.assigned_to_viewer);
    }

    #[test]
    fn test_badges() {
        let official = Verification::OfficiallyVerified {
            official_source: "IMD".to_string(),
        };
        assert_eq!(badge(&official).as_deref(), Some("Verified by IMD"));
        assert_eq!(
            badge(&Verification::ClusterVerified { cluster_count: 3 }).as_deref(),
            Some("3 similar reports")
        );
        assert!(badge(&Verification::Unverified).is_none());
    }

    #[test]
    fn test_evidence_checklist_order_and_negative_check() {
        let req = request(aegis(), RequestStatus::Pending);
        let items = evidence_checklist(&req).unwrap();
        assert_eq!(items.len(), 4);
        assert!(items[0].text.contains("SOS pings"));
        assert_eq!(
            items[1].thumbnail.as_deref(),
            Some("https://example.org/t.jpg")
        );
        assert!(items[..3].iter().all(|i| i.verified));
        assert!(!items[3].verified);
    }

    #[test]
    fn test_evidence_checklist_gated() {
        let req = request(Verification::Unverified, RequestStatus::Pending);
        let err = evidence_checklist(&req).unwrap_err();
        assert!(matches!(err, Error::VerificationGate { .. }));
    }

    #[test]
    fn test_investigation_query() {
        let req = request(
            Verification::ClusterVerified { cluster_count: 2 },
            RequestStatus::Pending,
        );
        assert_eq!(
            investigation_query(&req).unwrap(),
            "Flood reported at Adyar, Chennai. Description: Flooded"
        );

        let req = request(aegis(), RequestStatus::Pending);
        assert!(investigation_query(&req).is_err());
    }
}
