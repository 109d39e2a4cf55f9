//! Gemini `generateContent` REST backend.
//!
//! Scoring uses structured JSON output with a response schema, lookups use
//! the `googleSearch` / `googleMaps` grounding tools, and chat sends the
//! whole transcript with the persona as system instruction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{
    analysis_prompt, search_prompt, AiCollaborator, AiError, Analysis, ChatMessage,
    GroundedInfo, GroundedQuery, Sender, Source, CHAT_SYSTEM_INSTRUCTION,
};
use crate::config::AiConfig;
use crate::request::{clamp_urgency_score, EmergencyType};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini REST API.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    /// Create a client from the `[ai]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Unavailable`] if the HTTP client cannot be built.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
            config.timeout(),
        )
    }

    /// The model this client talks to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate(&self, body: &GenerateRequest) -> Result<Candidate, AiError> {
        let Some(api_key) = &self.api_key else {
            return Err(AiError::Unavailable("no API key configured".to_string()));
        };

        debug!("Calling {} ({} content turns)", self.model, body.contents.len());
        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(AiError::RateLimited);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse("no candidates in response".to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn turn(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part { text: text.into() }],
        }
    }

    fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
}

impl GenerateRequest {
    fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::turn("user", text)],
            system_instruction: None,
            generation_config: None,
            tools: Vec::new(),
            tool_config: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<ChunkRef>,
    maps: Option<ChunkRef>,
}

#[derive(Debug, Deserialize)]
struct ChunkRef {
    title: Option<String>,
    uri: Option<String>,
}

fn collect_sources(
    candidate: &Candidate,
    pick: impl Fn(&GroundingChunk) -> Option<&ChunkRef>,
    fallback_title: &str,
) -> Vec<Source> {
    candidate
        .grounding_metadata
        .iter()
        .flat_map(|m| m.grounding_chunks.iter())
        .filter_map(pick)
        .filter_map(|chunk| {
            let uri = chunk.uri.clone()?;
            let title = chunk
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| fallback_title.to_string());
            Some(Source { title, uri })
        })
        .collect()
}

/// Decode the structured scoring output.
fn parse_analysis(text: &str) -> Result<Analysis, AiError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| AiError::Parse(e.to_string()))?;

    let score = value.get("urgencyScore").and_then(Value::as_f64);
    let summary = value.get("summary").and_then(Value::as_str);

    match (score, summary) {
        (Some(score), Some(summary)) => {
            #[allow(clippy::cast_possible_truncation)]
            let rounded = score.round() as i64;
            Ok(Analysis {
                urgency_score: clamp_urgency_score(rounded),
                summary: summary.to_string(),
            })
        }
        _ => Err(AiError::InvalidResponse(
            "expected numeric urgencyScore and string summary".to_string(),
        )),
    }
}

fn analysis_schema() -> Value {
    json!({
        "responseMimeType": "application/json",
        "responseSchema": {
            "type": "OBJECT",
            "properties": {
                "urgencyScore": {
                    "type": "INTEGER",
                    "description": "A numerical score from 1 to 10 indicating the urgency."
                },
                "summary": {
                    "type": "STRING",
                    "description": "A concise, one-sentence summary of the emergency."
                }
            },
            "required": ["urgencyScore", "summary"]
        }
    })
}

#[async_trait]
impl AiCollaborator for GeminiClient {
    async fn score_and_summarize(
        &self,
        description: &str,
        emergency_type: EmergencyType,
    ) -> Result<Analysis, AiError> {
        let mut body = GenerateRequest::prompt(analysis_prompt(description, emergency_type));
        body.generation_config = Some(analysis_schema());

        let result = self
            .generate(&body)
            .await
            .and_then(|candidate| parse_analysis(&candidate.text()));
        if let Err(e) = &result {
            error!("Error analyzing SOS: {}", e);
        }
        result
    }

    async fn grounded_lookup(&self, query: &GroundedQuery) -> Result<GroundedInfo, AiError> {
        let (body, maps) = match query {
            GroundedQuery::Search { query } => {
                let mut body = GenerateRequest::prompt(search_prompt(query));
                body.tools = vec![json!({ "googleSearch": {} })];
                (body, false)
            }
            GroundedQuery::Maps { query, near } => {
                let mut body = GenerateRequest::prompt(query.clone());
                body.tools = vec![json!({ "googleMaps": {} })];
                body.tool_config = Some(json!({
                    "retrievalConfig": {
                        "latLng": { "latitude": near.lat, "longitude": near.lng }
                    }
                }));
                (body, true)
            }
        };

        let candidate = self.generate(&body).await.map_err(|e| {
            error!("Error getting grounded info: {}", e);
            e
        })?;

        let sources = if maps {
            collect_sources(&candidate, |c| c.maps.as_ref(), "Google Maps Place")
        } else {
            collect_sources(&candidate, |c| c.web.as_ref(), "Web Search Result")
        };

        Ok(GroundedInfo {
            text: candidate.text(),
            sources,
        })
    }

    async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String, AiError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|m| {
                let role = match m.sender {
                    Sender::User => "user",
                    Sender::Bot => "model",
                };
                Content::turn(role, m.text.clone())
            })
            .collect();
        contents.push(Content::turn("user", message));

        let body = GenerateRequest {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: CHAT_SYSTEM_INSTRUCTION.to_string(),
                }],
            }),
            generation_config: None,
            tools: Vec::new(),
            tool_config: None,
        };

        let candidate = self.generate(&body).await?;
        Ok(candidate.text())
    }
}
