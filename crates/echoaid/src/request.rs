//! Core SOS request types for echoaid.
//!
//! This module defines the data model shared by every other part of the
//! crate: the request itself, its lifecycle status, the emergency category,
//! and the verification tier with its tier-specific evidence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency score assigned to requests queued while offline.
pub const DEFAULT_URGENCY_SCORE: u8 = 5;

/// Lowest urgency score.
pub const MIN_URGENCY_SCORE: u8 = 1;

/// Highest urgency score.
pub const MAX_URGENCY_SCORE: u8 = 10;

/// The kind of emergency being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    /// Injury or illness.
    Medical,
    /// Fire or smoke.
    Fire,
    /// Rising water.
    Flood,
    /// Seismic event.
    Earthquake,
    /// Anything else.
    Other,
}

impl EmergencyType {
    /// All categories, in the order they are offered on the SOS form.
    pub const ALL: [Self; 5] = [
        Self::Medical,
        Self::Fire,
        Self::Flood,
        Self::Earthquake,
        Self::Other,
    ];

    /// Immediate safety advice shown to a requester after sending an SOS.
    #[must_use]
    pub fn safety_tip(self) -> &'static str {
        match self {
            Self::Flood => "If possible, move to higher ground immediately.",
            Self::Earthquake => "Stay away from windows. Drop, Cover, and Hold On if you can.",
            Self::Fire => "Stay low to the ground to avoid smoke. Cover your mouth.",
            Self::Medical => "Focus on your breathing. Help is on the way.",
            Self::Other => "Try to find a safe location and stay aware of your surroundings.",
        }
    }
}

impl std::fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medical => write!(f, "Medical"),
            Self::Fire => write!(f, "Fire"),
            Self::Flood => write!(f, "Flood"),
            Self::Earthquake => write!(f, "Earthquake"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Where a request is in its lifecycle.
///
/// Declaration order is lifecycle order; see [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Saved locally while offline, not yet dispatched.
    Queued,
    /// Dispatched and waiting for a volunteer.
    Pending,
    /// A volunteer has accepted the mission.
    #[serde(rename = "In Progress")]
    InProgress,
    /// The emergency has been dealt with.
    Resolved,
}

impl RequestStatus {
    /// Whether the request is visible on the volunteer triage feed.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

/// Priority band derived from the numeric urgency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrgencyLevel {
    /// Score 1-3.
    Low,
    /// Score 4-6.
    Medium,
    /// Score 7-8.
    High,
    /// Score 9-10.
    Critical,
}

impl UrgencyLevel {
    /// Map an urgency score onto its band.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s > 8 => Self::Critical,
            s if s > 6 => Self::High,
            s if s > 3 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Banner label for the band.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL PRIORITY",
            Self::High => "HIGH PRIORITY",
            Self::Medium => "MEDIUM PRIORITY",
            Self::Low => "LOW PRIORITY",
        }
    }
}

/// Clamp an arbitrary score into the valid 1-10 range.
#[must_use]
pub fn clamp_urgency_score(score: i64) -> u8 {
    let clamped = score.clamp(i64::from(MIN_URGENCY_SCORE), i64::from(MAX_URGENCY_SCORE));
    u8::try_from(clamped).unwrap_or(DEFAULT_URGENCY_SCORE)
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Where the emergency is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Free-text address or landmark.
    pub address: String,
}

impl Location {
    /// A location known only by its address.
    #[must_use]
    pub fn from_address(address: impl Into<String>) -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            address: address.into(),
        }
    }

    /// The coordinate pair of this location.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Public social media corroborating a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMediaEvidence {
    /// What was found.
    pub text: String,
    /// Link to the post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Thumbnail image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Structured evidence behind an Aegis verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEvidence {
    /// Nearby corroborating SOS pings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_analysis: Option<String>,
    /// Social media cross-reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_media: Option<SocialMediaEvidence>,
    /// Environmental sensor readings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_data: Option<String>,
    /// Reporter track record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_history: Option<String>,
    /// Seismic readings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seismic_data: Option<String>,
}

/// Verification tier, without the tier-specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerificationTier {
    /// Nothing corroborates the request yet.
    Unverified,
    /// Several independent reports from the same area.
    ClusterVerified,
    /// Cross-checked by the Aegis pipeline.
    AegisVerified,
    /// Confirmed by an official agency.
    OfficiallyVerified,
}

impl std::fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "Unverified"),
            Self::ClusterVerified => write!(f, "ClusterVerified"),
            Self::AegisVerified => write!(f, "AegisVerified"),
            Self::OfficiallyVerified => write!(f, "OfficiallyVerified"),
        }
    }
}

/// Verification tier together with the data that tier carries.
///
/// On the wire the tier and its data are flat optional fields of the
/// request (`verificationState`, `clusterCount`, `confidenceScore`,
/// `officialSource`, `verificationDetails`). A missing state reads as
/// unverified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VerificationFields", into = "VerificationFields")]
pub enum Verification {
    /// Nothing corroborates the request yet.
    #[default]
    Unverified,
    /// Several independent reports from the same area.
    ClusterVerified {
        /// Number of reports in the cluster.
        cluster_count: u32,
    },
    /// Cross-checked by the Aegis pipeline.
    AegisVerified {
        /// Confidence percentage, 0-100.
        confidence_score: u8,
        /// Number of reports in the cluster, if one was found.
        cluster_count: Option<u32>,
        /// What the pipeline checked.
        evidence: VerificationEvidence,
    },
    /// Confirmed by an official agency.
    OfficiallyVerified {
        /// The confirming agency, e.g. `IMD` or `CWC`.
        official_source: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_state: Option<VerificationTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    official_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cluster_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_details: Option<VerificationEvidence>,
}

impl From<VerificationFields> for Verification {
    fn from(fields: VerificationFields) -> Self {
        match fields.verification_state {
            None | Some(VerificationTier::Unverified) => Self::Unverified,
            Some(VerificationTier::ClusterVerified) => Self::ClusterVerified {
                cluster_count: fields.cluster_count.unwrap_or(0),
            },
            Some(VerificationTier::AegisVerified) => Self::AegisVerified {
                confidence_score: fields.confidence_score.unwrap_or(0),
                cluster_count: fields.cluster_count,
                evidence: fields.verification_details.unwrap_or_default(),
            },
            Some(VerificationTier::OfficiallyVerified) => Self::OfficiallyVerified {
                official_source: fields.official_source.unwrap_or_default(),
            },
        }
    }
}

impl From<Verification> for VerificationFields {
    fn from(verification: Verification) -> Self {
        let state = Some(verification.tier());
        match verification {
            Verification::Unverified => Self {
                verification_state: state,
                ..Self::default()
            },
            Verification::ClusterVerified { cluster_count } => Self {
                verification_state: state,
                cluster_count: Some(cluster_count),
                ..Self::default()
            },
            Verification::AegisVerified {
                confidence_score,
                cluster_count,
                evidence,
            } => Self {
                verification_state: state,
                cluster_count,
                confidence_score: Some(confidence_score),
                verification_details: Some(evidence),
                ..Self::default()
            },
            Verification::OfficiallyVerified { official_source } => Self {
                verification_state: state,
                official_source: Some(official_source),
                ..Self::default()
            },
        }
    }
}

impl Verification {
    /// The tier of this verification.
    #[must_use]
    pub fn tier(&self) -> VerificationTier {
        match self {
            Self::Unverified => VerificationTier::Unverified,
            Self::ClusterVerified { .. } => VerificationTier::ClusterVerified,
            Self::AegisVerified { .. } => VerificationTier::AegisVerified,
            Self::OfficiallyVerified { .. } => VerificationTier::OfficiallyVerified,
        }
    }
}

/// An SOS request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    /// Unique identifier.
    pub id: String,
    /// Display name of the requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The user who raised the request.
    pub requester_id: String,
    /// The volunteer who accepted the mission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_id: Option<String>,
    /// Where the emergency is.
    pub location: Location,
    /// What kind of emergency it is.
    pub emergency_type: EmergencyType,
    /// Free-text description (the AI summary once dispatched).
    pub description: String,
    /// Attached photo or video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// When the request was created.
    pub timestamp: DateTime<Utc>,
    /// Priority from 1 (lowest) to 10 (highest).
    pub urgency_score: u8,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Last "I'm still here" heartbeat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pulse_timestamp: Option<DateTime<Utc>>,
    /// Verification tier and its data.
    #[serde(flatten)]
    pub verification: Verification,
    /// Code the responder shows on arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_verification_code: Option<String>,
}

impl SosRequest {
    /// The verification tier of this request.
    #[must_use]
    pub fn tier(&self) -> VerificationTier {
        self.verification.tier()
    }

    /// The priority band of this request.
    #[must_use]
    pub fn urgency_level(&self) -> UrgencyLevel {
        UrgencyLevel::from_score(self.urgency_score)
    }

    /// Whether this request is assigned to the given volunteer.
    #[must_use]
    pub fn is_assigned_to(&self, volunteer_id: &str) -> bool {
        self.volunteer_id.as_deref() == Some(volunteer_id)
    }
}

/// What a requester fills in before a request exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    /// The submitting user.
    pub requester_id: String,
    /// Display name of the submitting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the emergency is.
    pub location: Location,
    /// What kind of emergency it is.
    pub emergency_type: EmergencyType,
    /// What is happening.
    pub description: String,
    /// Attached photo or video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl RequestDraft {
    /// Create a draft with the required fields.
    #[must_use]
    pub fn new(
        requester_id: impl Into<String>,
        emergency_type: EmergencyType,
        description: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            name: None,
            location,
            emergency_type,
            description: description.into(),
            media_url: None,
        }
    }

    /// Set the requester display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the draft has both a description and an address.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.description.trim().is_empty() && !self.location.address.trim().is_empty()
    }

    /// Turn the draft into a request.
    #[must_use]
    pub fn into_request(
        self,
        id: String,
        status: RequestStatus,
        urgency_score: u8,
        description: String,
    ) -> SosRequest {
        SosRequest {
            id,
            name: self.name,
            requester_id: self.requester_id,
            volunteer_id: None,
            location: self.location,
            emergency_type: self.emergency_type,
            description,
            media_url: self.media_url,
            timestamp: Utc::now(),
            urgency_score,
            status,
            last_pulse_timestamp: None,
            verification: Verification::Unverified,
            responder_verification_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> SosRequest {
        RequestDraft::new(
            "user-1",
            EmergencyType::Fire,
            "Smoke from the kitchen",
            Location::from_address("Chandni Chowk, Delhi"),
        )
        .into_request(
            "sos-x".to_string(),
            RequestStatus::Pending,
            7,
            "Kitchen fire".to_string(),
        )
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RequestStatus::Queued.to_string(), "Queued");
        assert_eq!(RequestStatus::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn test_status_serializes_with_space() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: RequestStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(parsed, RequestStatus::InProgress);
    }

    #[test]
    fn test_status_is_active() {
        assert!(!RequestStatus::Queued.is_active());
        assert!(RequestStatus::Pending.is_active());
        assert!(RequestStatus::InProgress.is_active());
        assert!(!RequestStatus::Resolved.is_active());
    }

    #[test]
    fn test_urgency_level_bands() {
        assert_eq!(UrgencyLevel::from_score(10), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::from_score(9), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::from_score(8), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(7), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(6), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(4), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(3), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::from_score(1), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::Critical.label(), "CRITICAL PRIORITY");
    }

    #[test]
    fn test_clamp_urgency_score() {
        assert_eq!(clamp_urgency_score(0), 1);
        assert_eq!(clamp_urgency_score(-4), 1);
        assert_eq!(clamp_urgency_score(7), 7);
        assert_eq!(clamp_urgency_score(42), 10);
    }

    #[test]
    fn test_draft_completeness() {
        let draft = RequestDraft::new(
            "user-1",
            EmergencyType::Flood,
            "  ",
            Location::from_address("Test St"),
        );
        assert!(!draft.is_complete());

        let draft = RequestDraft::new(
            "user-1",
            EmergencyType::Flood,
            "Water rising",
            Location::from_address(""),
        );
        assert!(!draft.is_complete());

        let draft = RequestDraft::new(
            "user-1",
            EmergencyType::Flood,
            "Water rising",
            Location::from_address("Test St"),
        );
        assert!(draft.is_complete());
    }

    #[test]
    fn test_into_request_defaults() {
        let request = sample_request();
        assert_eq!(request.id, "sos-x");
        assert_eq!(request.description, "Kitchen fire");
        assert_eq!(request.tier(), VerificationTier::Unverified);
        assert!(request.volunteer_id.is_none());
        assert!(request.last_pulse_timestamp.is_none());
        assert_eq!(request.urgency_level(), UrgencyLevel::High);
    }

    #[test]
    fn test_request_json_uses_camel_case() {
        let json = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(json["requesterId"], "user-1");
        assert_eq!(json["emergencyType"], "Fire");
        assert_eq!(json["urgencyScore"], 7);
        assert_eq!(json["verificationState"], "Unverified");
        assert!(json.get("verification").is_none());
        assert!(json.get("volunteerId").is_none());
    }

    #[test]
    fn test_request_without_verification_defaults_to_unverified() {
        let mut json = serde_json::to_value(sample_request()).unwrap();
        json.as_object_mut().unwrap().remove("verificationState");
        let parsed: SosRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.verification, Verification::Unverified);
    }

    #[test]
    fn test_aegis_verification_is_flat_on_request() {
        let mut request = sample_request();
        request.verification = Verification::AegisVerified {
            confidence_score: 95,
            cluster_count: Some(4),
            evidence: VerificationEvidence {
                cluster_analysis: Some("4 other pings".to_string()),
                ..VerificationEvidence::default()
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["verificationState"], "AegisVerified");
        assert_eq!(json["confidenceScore"], 95);
        assert_eq!(json["clusterCount"], 4);
        assert_eq!(
            json["verificationDetails"]["clusterAnalysis"],
            "4 other pings"
        );
        assert!(json.get("officialSource").is_none());

        let parsed: SosRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.verification, request.verification);
    }

    #[test]
    fn test_reads_stored_request_with_flat_verification() {
        let json = serde_json::json!({
            "id": "sos-9",
            "requesterId": "user-3",
            "location": { "lat": 25.61, "lng": 85.14, "address": "Ghat Road, Patna" },
            "emergencyType": "Flood",
            "description": "Embankment breached",
            "timestamp": "2024-07-01T10:00:00Z",
            "urgencyScore": 9,
            "status": "In Progress",
            "verificationState": "OfficiallyVerified",
            "officialSource": "CWC"
        });
        let parsed: SosRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.status, RequestStatus::InProgress);
        assert_eq!(
            parsed.verification,
            Verification::OfficiallyVerified {
                official_source: "CWC".to_string()
            }
        );
    }

    #[test]
    fn test_is_assigned_to() {
        let mut request = sample_request();
        assert!(!request.is_assigned_to("user-2"));
        request.volunteer_id = Some("user-2".to_string());
        assert!(request.is_assigned_to("user-2"));
        assert!(!request.is_assigned_to("user-3"));
    }

    #[test]
    fn test_safety_tips_cover_all_types() {
        for kind in EmergencyType::ALL {
            assert!(!kind.safety_tip().is_empty());
        }
        assert!(EmergencyType::Flood.safety_tip().contains("higher ground"));
    }
}
