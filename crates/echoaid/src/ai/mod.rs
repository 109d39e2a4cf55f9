//! The generative-AI collaborator.
//!
//! All "intelligence" in echoaid is delegated to an external service behind
//! the narrow [`AiCollaborator`] trait: urgency scoring, grounded lookups,
//! and the chatbot. [`GeminiClient`] talks to the real service;
//! [`MockCollaborator`] gives tests deterministic answers.

mod gemini;
mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{Coordinates, EmergencyType};

pub use gemini::GeminiClient;
pub use mock::MockCollaborator;

/// Errors returned by an AI collaborator.
#[derive(Debug, Error)]
pub enum AiError {
    /// The service is not configured or reachable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an error status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The service asked us to slow down.
    #[error("rate limited")]
    RateLimited,

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response decoded but did not have the expected structure.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result of scoring an SOS description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Urgency from 1 (lowest) to 10 (highest).
    pub urgency_score: u8,
    /// One-sentence summary of the situation.
    pub summary: String,
}

/// A cited source behind a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Title of the page or place.
    pub title: String,
    /// Link to it.
    pub uri: String,
}

/// An AI answer together with the sources it cites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedInfo {
    /// The answer text.
    pub text: String,
    /// Cited sources, possibly empty.
    pub sources: Vec<Source>,
}

/// What to look up, and how to ground it.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundedQuery {
    /// Ground the answer in web search results.
    Search {
        /// The question.
        query: String,
    },
    /// Ground the answer in map data around a point.
    Maps {
        /// The question.
        query: String,
        /// Where to search around.
        near: Coordinates,
    },
}

impl GroundedQuery {
    /// A web-search grounded query.
    #[must_use]
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    /// A map grounded query.
    #[must_use]
    pub fn maps(query: impl Into<String>, near: Coordinates) -> Self {
        Self::Maps {
            query: query.into(),
            near,
        }
    }

    /// The question text.
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Search { query } | Self::Maps { query, .. } => query,
        }
    }
}

/// Who said a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person using the app.
    User,
    /// The assistant.
    Bot,
}

/// One line of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it.
    pub sender: Sender,
    /// What was said.
    pub text: String,
}

impl ChatMessage {
    /// A line from the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// A line from the assistant.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

/// The external generative-AI service.
#[async_trait]
pub trait AiCollaborator: Send + Sync + std::fmt::Debug {
    /// Score the urgency of an emergency and summarize it in one sentence.
    async fn score_and_summarize(
        &self,
        description: &str,
        emergency_type: EmergencyType,
    ) -> Result<Analysis, AiError>;

    /// Answer a question with cited sources.
    async fn grounded_lookup(&self, query: &GroundedQuery) -> Result<GroundedInfo, AiError>;

    /// Continue a conversation: `history` is everything said so far.
    async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String, AiError>;
}

/// Prompt used for urgency scoring.
#[must_use]
pub fn analysis_prompt(description: &str, emergency_type: EmergencyType) -> String {
    format!(
        "Analyze the following emergency request and provide a JSON response.\n\
         Emergency Type: {emergency_type}\n\
         Description: \"{description}\"\n\n\
         Based on the information, determine an urgency score from 1 (lowest) to 10 (highest).\n\
         Also, provide a brief, one-sentence summary of the situation."
    )
}

/// Prompt used for web-search grounded lookups.
#[must_use]
pub fn search_prompt(query: &str) -> String {
    format!(
        "Find recent news or official reports about this potential emergency: \"{query}\". \
         Summarize the findings."
    )
}

/// System instruction for the chatbot persona.
pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are Echo, a friendly and reassuring AI assistant \
for the EchoAid disaster response platform. Your primary goal is to help users by answering \
their questions about disaster safety and how to use the app. Keep your answers concise, clear, \
and calming. Do not provide medical advice, but you can suggest when to seek professional \
medical help. Be empathetic and supportive. Start the conversation by introducing yourself and \
asking how you can help.";
