//! Demonstration data.
//!
//! A fresh session starts with a handful of users, requests spanning every
//! verification tier, and sample rumor and alert feeds. Timestamps are
//! relative to the `now` passed in.

use chrono::{DateTime, Duration, Utc};

use crate::auth::{User, UserRole};
use crate::feed::{AlertSeverity, AlertSource, OfficialAlert, Rumor, RumorDetails, RumorState};
use crate::request::{
    Coordinates, EmergencyType, Location, RequestStatus, SocialMediaEvidence, SosRequest,
    Verification, VerificationEvidence,
};

const AEGIS_THUMBNAIL: &str = "https://images.unsplash.com/photo-1567471936733-3a95c4d327a2?ixlib=rb-4.0.3&auto=format&fit=crop&w=100&q=80";

/// Seeded users: one per role.
#[must_use]
pub fn users() -> Vec<User> {
    vec![
        User {
            location: Some(Coordinates {
                lat: 28.6139,
                lng: 77.2090,
            }),
            ..User::new("user-1", "Arjun Sharma", "requester@test.com", UserRole::Requester)
        },
        User {
            location: Some(Coordinates {
                lat: 19.0760,
                lng: 72.8777,
            }),
            skills: vec!["First Aid".to_string(), "Driving".to_string()],
            is_aegis_verified: true,
            affiliation: Some("Mumbai Fire Brigade".to_string()),
            profile_photo: Some("https://i.pravatar.cc/150?u=david-r".to_string()),
            ..User::new("user-2", "David R.", "volunteer@test.com", UserRole::Volunteer)
        },
        User {
            location: Some(Coordinates {
                lat: 13.0827,
                lng: 80.2707,
            }),
            ..User::new("user-safe", "Priya Sharma", "safe@test.com", UserRole::Safe)
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn request(
    id: &str,
    requester: (&str, &str),
    location: Location,
    emergency_type: EmergencyType,
    description: &str,
    timestamp: DateTime<Utc>,
    urgency_score: u8,
    status: RequestStatus,
    verification: Verification,
) -> SosRequest {
    SosRequest {
        id: id.to_string(),
        name: Some(requester.1.to_string()),
        requester_id: requester.0.to_string(),
        volunteer_id: None,
        location,
        emergency_type,
        description: description.to_string(),
        media_url: None,
        timestamp,
        urgency_score,
        status,
        last_pulse_timestamp: None,
        verification,
        responder_verification_code: None,
    }
}

fn at(lat: f64, lng: f64, address: &str) -> Location {
    Location {
        lat,
        lng,
        address: address.to_string(),
    }
}

/// Seeded requests, one per verification tier.
#[must_use]
pub fn requests(now: DateTime<Utc>) -> Vec<SosRequest> {
    let mut bandra = request(
        "sos-1",
        ("user-1", "Arjun Sharma"),
        at(19.0760, 72.8777, "Bandra, Mumbai, Maharashtra"),
        EmergencyType::Medical,
        "A person has fallen and needs immediate medical attention near Bandra station.",
        now - Duration::minutes(5),
        9,
        RequestStatus::InProgress,
        Verification::Unverified,
    );
    bandra.volunteer_id = Some("user-2".to_string());
    bandra.responder_verification_code = Some("88-ALPHA".to_string());

    vec![
        bandra,
        request(
            "sos-2",
            ("user-1", "Arjun Sharma"),
            at(28.6358, 77.2244, "Chandni Chowk, Delhi"),
            EmergencyType::Fire,
            "Shop on fire in Chandni Chowk, heavy smoke visible.",
            now - Duration::hours(2),
            7,
            RequestStatus::Pending,
            Verification::ClusterVerified { cluster_count: 3 },
        ),
        request(
            "sos-3",
            ("user-3", "Anjali Mehta"),
            at(13.0827, 80.2707, "T. Nagar, Chennai, Tamil Nadu"),
            EmergencyType::Flood,
            "Street is flooding due to heavy rain, water entering homes.",
            now - Duration::minutes(10),
            8,
            RequestStatus::Pending,
            Verification::OfficiallyVerified {
                official_source: "IMD".to_string(),
            },
        ),
        request(
            "sos-4-aegis-verified",
            ("user-4", "Ravi Kumar"),
            at(13.0674, 80.2376, "Adyar, Chennai, Tamil Nadu"),
            EmergencyType::Flood,
            "Our ground floor is completely flooded! The water is rising fast and we're trapped on the second floor.",
            now - Duration::minutes(15),
            10,
            RequestStatus::Pending,
            Verification::AegisVerified {
                confidence_score: 95,
                cluster_count: Some(4),
                evidence: VerificationEvidence {
                    cluster_analysis: Some(
                        "4 other SOS pings detected within a 200-meter radius.".to_string(),
                    ),
                    social_media: Some(SocialMediaEvidence {
                        text: "Cross-referenced 2 public photos (Twitter) showing flooding at this location.".to_string(),
                        url: None,
                        thumbnail: Some(AEGIS_THUMBNAIL.to_string()),
                    }),
                    sensor_data: Some(
                        "Location is within the 'Severe Flood Warning' zone reported by the CWC."
                            .to_string(),
                    ),
                    user_history: Some(
                        "User is a 'Trusted Reporter' (previously verified).".to_string(),
                    ),
                    seismic_data: Some("No seismic activity detected.".to_string()),
                },
            },
        ),
    ]
}

fn rumor(
    id: &str,
    title: &str,
    state: RumorState,
    timestamp: DateTime<Utc>,
    location: Coordinates,
    description: &str,
    source_of_truth: Option<&str>,
) -> Rumor {
    Rumor {
        id: id.to_string(),
        title: title.to_string(),
        state,
        timestamp,
        location,
        details: RumorDetails {
            description: description.to_string(),
            source_of_truth: source_of_truth.map(str::to_string),
        },
    }
}

/// Seeded rumor feed.
#[must_use]
pub fn rumors(now: DateTime<Utc>) -> Vec<Rumor> {
    vec![
        rumor(
            "rumor-1",
            "Bridge collapse reported at ITO Bridge",
            RumorState::Investigating,
            now - Duration::minutes(2),
            Coordinates {
                lat: 28.6315,
                lng: 77.2502,
            },
            "Receiving a high volume of unverified reports about a potential collapse.",
            None,
        ),
        rumor(
            "rumor-2",
            "Gas leak at Dadar West",
            RumorState::Debunked,
            now - Duration::minutes(5),
            Coordinates {
                lat: 19.0176,
                lng: 72.8478,
            },
            "Initial reports of a gas leak have been investigated.",
            Some("Verified by Mahanagar Gas Ltd: No leak detected."),
        ),
        rumor(
            "rumor-3",
            "Power outage in Velachery",
            RumorState::Confirmed,
            now - Duration::minutes(12),
            Coordinates {
                lat: 12.9806,
                lng: 80.2212,
            },
            "Widespread power outage confirmed.",
            Some("Verified by TNEB."),
        ),
        rumor(
            "rumor-4",
            "Traffic jam on Delhi-Gurgaon Expressway",
            RumorState::Investigating,
            now - Duration::minutes(25),
            Coordinates {
                lat: 28.5004,
                lng: 77.0708,
            },
            "Multiple reports of a severe traffic jam. Checking traffic cameras.",
            None,
        ),
    ]
}

/// Seeded official alerts.
#[must_use]
pub fn alerts(now: DateTime<Utc>) -> Vec<OfficialAlert> {
    vec![
        OfficialAlert {
            id: "alert-1".to_string(),
            source: AlertSource::Imd,
            title: "Cyclone Warning for Coastal Tamil Nadu".to_string(),
            description: "A severe cyclonic storm is expected to make landfall between Chennai and Puducherry within the next 24 hours. Heavy rainfall and strong winds are predicted.".to_string(),
            severity: AlertSeverity::RedAlert,
            timestamp: now - Duration::minutes(30),
            affected_area: "Coastal Districts of Tamil Nadu".to_string(),
        },
        OfficialAlert {
            id: "alert-2".to_string(),
            source: AlertSource::Cwc,
            title: "Yamuna River Flood Watch".to_string(),
            description: "The Yamuna river in Delhi is flowing above the danger mark. Low-lying areas are at high risk of inundation.".to_string(),
            severity: AlertSeverity::DangerLevel,
            timestamp: now - Duration::hours(3),
            affected_area: "Delhi NCR".to_string(),
        },
        OfficialAlert {
            id: "alert-3".to_string(),
            source: AlertSource::Ncs,
            title: "Minor Earthquake in Uttarakhand".to_string(),
            description: "A minor earthquake of magnitude 3.5 was reported in the Pithoragarh district. No major damage reported so far.".to_string(),
            severity: AlertSeverity::Warning,
            timestamp: now - Duration::hours(8),
            affected_area: "Pithoragarh, Uttarakhand".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::VerificationTier;
    use std::collections::HashSet;

    #[test]
    fn test_one_user_per_role() {
        let roles: HashSet<UserRole> = users().iter().map(|u| u.role).collect();
        assert_eq!(roles.len(), UserRole::ALL.len());
    }

    #[test]
    fn test_requests_cover_every_tier() {
        let tiers: HashSet<VerificationTier> =
            requests(Utc::now()).iter().map(SosRequest::tier).collect();
        assert_eq!(tiers.len(), 4);
    }

    #[test]
    fn test_request_ids_unique() {
        let reqs = requests(Utc::now());
        let ids: HashSet<&str> = reqs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), reqs.len());
    }

    #[test]
    fn test_assigned_request_has_code() {
        let reqs = requests(Utc::now());
        let sos1 = &reqs[0];
        assert_eq!(sos1.status, RequestStatus::InProgress);
        assert!(sos1.is_assigned_to("user-2"));
        assert_eq!(sos1.responder_verification_code.as_deref(), Some("88-ALPHA"));
    }

    #[test]
    fn test_timestamps_relative_to_now() {
        let now = Utc::now();
        for request in requests(now) {
            assert!(request.timestamp < now);
        }
        assert_eq!(rumors(now).len(), 4);
        assert_eq!(alerts(now).len(), 3);
    }
}
