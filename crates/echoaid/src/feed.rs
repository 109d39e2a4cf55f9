//! Read-only situational feeds: community rumors and official alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::Coordinates;

/// Where a rumor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RumorState {
    /// Still being checked.
    Investigating,
    /// Shown to be false.
    Debunked,
    /// Shown to be true.
    Confirmed,
}

impl std::fmt::Display for RumorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Investigating => write!(f, "Investigating"),
            Self::Debunked => write!(f, "Debunked"),
            Self::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// Details of a rumor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RumorDetails {
    /// What is being reported.
    pub description: String,
    /// Who settled it, once settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_of_truth: Option<String>,
}

/// An unverified community report under investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rumor {
    /// Identifier.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Current state.
    pub state: RumorState,
    /// When it was first seen.
    pub timestamp: DateTime<Utc>,
    /// Where it was reported.
    pub location: Coordinates,
    /// Description and resolution.
    pub details: RumorDetails,
}

impl Rumor {
    /// Whether the rumor has been settled either way.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state != RumorState::Investigating
    }
}

/// The agency issuing an official alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSource {
    /// India Meteorological Department.
    #[serde(rename = "IMD")]
    Imd,
    /// Central Water Commission.
    #[serde(rename = "CWC")]
    Cwc,
    /// National Center for Seismology.
    #[serde(rename = "NCS")]
    Ncs,
}

impl std::fmt::Display for AlertSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imd => write!(f, "IMD"),
            Self::Cwc => write!(f, "CWC"),
            Self::Ncs => write!(f, "NCS"),
        }
    }
}

/// How serious an official alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// Highest alert level.
    #[serde(rename = "Red Alert")]
    RedAlert,
    /// Be prepared.
    #[serde(rename = "Orange Alert")]
    OrangeAlert,
    /// Advisory.
    Warning,
    /// A river gauge is above its danger mark.
    #[serde(rename = "Danger Level")]
    DangerLevel,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RedAlert => write!(f, "Red Alert"),
            Self::OrangeAlert => write!(f, "Orange Alert"),
            Self::Warning => write!(f, "Warning"),
            Self::DangerLevel => write!(f, "Danger Level"),
        }
    }
}

/// An alert issued by a government agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialAlert {
    /// Identifier.
    pub id: String,
    /// Issuing agency.
    pub source: AlertSource,
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Alert level.
    pub severity: AlertSeverity,
    /// When it was issued.
    pub timestamp: DateTime<Utc>,
    /// Region covered.
    pub affected_area: String,
}

/// Rumors, newest first.
#[must_use]
pub fn rumors_newest_first(rumors: &[Rumor]) -> Vec<&Rumor> {
    let mut sorted: Vec<&Rumor> = rumors.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

/// Alerts, newest first.
#[must_use]
pub fn alerts_newest_first(alerts: &[OfficialAlert]) -> Vec<&OfficialAlert> {
    let mut sorted: Vec<&OfficialAlert> = alerts.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}
