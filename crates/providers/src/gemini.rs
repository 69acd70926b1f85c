//! Native Gemini `generateContent` client.
//!
//! Only used for the search delegate: the OpenAI-compatible surface cannot
//! enable Google Search grounding, so this client talks to the native API
//! and folds grounding sources into the returned text. Function calling is
//! not supported here.

use async_trait::async_trait;
use fitcoach_core::error::ProviderError;
use fitcoach_core::message::{Message, Role};
use fitcoach_core::provider::*;
use serde::Deserialize;
use tracing::{debug, warn};
use crate::http::{build_client, check_status, transport_error};

pub const GEMINI_NATIVE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    grounding: bool,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "gemini-native".into(),
            base_url: GEMINI_NATIVE_BASE_URL.into(),
            api_key: api_key.into(),
            grounding: false,
            client: build_client(),
        }
    }

    /// Enable the hosted `google_search` tool on every request.
    pub fn with_search_grounding(mut self) -> Self {
        self.grounding = true;
        self.name = "gemini-search".into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System && !m.content.is_empty())
            .map(|m| {
                let role = if m.role == Role::Assistant { "model" } else { "user" };
                serde_json::json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut generation = serde_json::json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            generation["maxOutputTokens"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation,
        });

        if !system.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system.join("\n\n") }]
            });
        }

        if self.grounding {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }

        body
    }

    fn parse_response(api: GenerateResponse, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let candidate = api
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No candidates in response".into(),
            })?;

        let mut text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        let sources = candidate
            .grounding_metadata
            .map(|g| collect_sources(g.grounding_chunks))
            .unwrap_or_default();
        if !sources.is_empty() {
            text.push_str("\n\nSources:");
            for (title, uri) in &sources {
                text.push_str(&format!("\n- {title} ({uri})"));
            }
        }

        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        let mut metadata = serde_json::Map::new();
        metadata.insert("grounding_sources".into(), serde_json::json!(sources.len()));

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage,
            model: api.model_version.unwrap_or_else(|| requested_model.to_string()),
            metadata,
        })
    }
}

/// Unique `(title, uri)` pairs in citation order.
fn collect_sources(chunks: Vec<GroundingChunk>) -> Vec<(String, String)> {
    let mut sources: Vec<(String, String)> = Vec::new();
    for web in chunks.into_iter().filter_map(|c| c.web) {
        let Some(uri) = web.uri else { continue };
        if sources.iter().any(|(_, u)| *u == uri) {
            continue;
        }
        let title = web.title.unwrap_or_else(|| uri.clone());
        sources.push((title, uri));
    }
    sources
}

#[async_trait]
impl fitcoach_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if !request.tools.is_empty() {
            warn!(provider = %self.name, "Function tools are ignored by the native client");
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = self.build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            grounding = self.grounding,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(&self.name, response).await?;

        let api: GenerateResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        Self::parse_response(api, &request.model)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- generateContent API types (internal) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
