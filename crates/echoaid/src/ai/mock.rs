//! Mock collaborator for testing and offline demos.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{AiCollaborator, AiError, Analysis, ChatMessage, GroundedInfo, GroundedQuery};
use crate::request::EmergencyType;

/// Collaborator with canned, configurable answers.
///
/// Without configuration it scores every request 7 and summarizes it by
/// echoing the description.
#[derive(Debug)]
pub struct MockCollaborator {
    available: AtomicBool,
    analysis: Option<Analysis>,
    analysis_delay: Duration,
    grounded: GroundedInfo,
    chat_reply: String,
    fail_on: Option<String>,
    fail_lookups: bool,
    analysis_calls: AtomicU32,
    lookup_calls: AtomicU32,
    chat_calls: AtomicU32,
    lookups: Mutex<Vec<GroundedQuery>>,
}

impl MockCollaborator {
    /// Create a mock with default answers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            analysis: None,
            analysis_delay: Duration::ZERO,
            grounded: GroundedInfo {
                text: "No reports found.".to_string(),
                sources: Vec::new(),
            },
            chat_reply: "Hi, I'm Echo. How can I help you stay safe today?".to_string(),
            fail_on: None,
            fail_lookups: false,
            analysis_calls: AtomicU32::new(0),
            lookup_calls: AtomicU32::new(0),
            chat_calls: AtomicU32::new(0),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Always answer scoring calls with this analysis.
    #[must_use]
    pub fn with_analysis(mut self, urgency_score: u8, summary: impl Into<String>) -> Self {
        self.analysis = Some(Analysis {
            urgency_score,
            summary: summary.into(),
        });
        self
    }

    /// Take this long to answer each scoring call.
    #[must_use]
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    /// Answer grounded lookups with this result.
    #[must_use]
    pub fn with_grounded(mut self, info: GroundedInfo) -> Self {
        self.grounded = info;
        self
    }

    /// Answer chat messages with this reply.
    #[must_use]
    pub fn with_chat_reply(mut self, reply: impl Into<String>) -> Self {
        self.chat_reply = reply.into();
        self
    }

    /// Fail scoring calls whose description contains `needle`.
    #[must_use]
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Fail every grounded lookup while scoring keeps working.
    #[must_use]
    pub fn with_failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Set availability. An unavailable mock fails every call.
    #[must_use]
    pub fn with_available(self, available: bool) -> Self {
        self.set_available(available);
        self
    }

    /// Change availability after construction.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of scoring calls made.
    #[must_use]
    pub fn analysis_calls(&self) -> u32 {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    /// Number of grounded lookups made.
    #[must_use]
    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Number of chat calls made.
    #[must_use]
    pub fn chat_calls(&self) -> u32 {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Every grounded query received so far.
    #[must_use]
    pub fn lookups(&self) -> Vec<GroundedQuery> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), AiError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AiError::Unavailable("mock collaborator offline".to_string()))
        }
    }
}

impl Default for MockCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiCollaborator for MockCollaborator {
    async fn score_and_summarize(
        &self,
        description: &str,
        emergency_type: EmergencyType,
    ) -> Result<Analysis, AiError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }
        self.check_available()?;

        if let Some(needle) = &self.fail_on {
            if description.contains(needle.as_str()) {
                return Err(AiError::RequestFailed(format!(
                    "mock failure for description containing {needle:?}"
                )));
            }
        }

        Ok(self.analysis.clone().unwrap_or_else(|| Analysis {
            urgency_score: 7,
            summary: format!("{emergency_type}: {description}"),
        }))
    }

    async fn grounded_lookup(&self, query: &GroundedQuery) -> Result<GroundedInfo, AiError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(query.clone());
        }
        self.check_available()?;
        if self.fail_lookups {
            return Err(AiError::RateLimited);
        }
        Ok(self.grounded.clone())
    }

    async fn chat(&self, _history: &[ChatMessage], _message: &str) -> Result<String, AiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.chat_reply.clone())
    }
}
