//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with Google Search grounding and
//! (optionally) a structured response schema. Calls are instrumented and log the model
//! name, latency and response size, never contents or the API key.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::domain::Source;
use crate::generation::{ContentModel, GenerationError, ModelFuture, ModelReply, ModelRequest};
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-3-pro-preview".into());

    // No timeout unless explicitly configured: generation with search grounding is slow.
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()) {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = match builder.build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "madrasati_backend", error = %e, "Failed to build HTTP client; generation disabled");
        return None;
      }
    };

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// One grounded generateContent call. Returns raw reply text plus grounding sources.
  #[instrument(
    level = "info",
    skip(self, req),
    fields(model = %self.model, user_len = req.user.len(), schema = req.response_schema.is_some())
  )]
  pub async fn generate_content(&self, req: ModelRequest<'_>) -> Result<ModelReply, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let body = GenerateContentRequest {
      contents: vec![ContentReq { role: "user".into(), parts: vec![PartReq { text: req.user.into() }] }],
      system_instruction: ContentReq { role: "system".into(), parts: vec![PartReq { text: req.system.into() }] },
      tools: vec![ToolReq { google_search: EmptyObject {} }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: req.response_schema.cloned(),
      },
    };

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "madrasati-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| GenerationError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      error!(elapsed = ?start.elapsed(), %status, %message, "Gemini call failed");
      return Err(GenerationError::Http { status: status.as_u16(), message });
    }

    let body: GenerateContentResponse =
      res.json().await.map_err(|e| GenerationError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        prompt_tokens = ?usage.prompt_token_count,
        completion_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }

    let reply = body.into_reply();
    info!(elapsed = ?start.elapsed(), text_len = reply.text.len(), sources = reply.sources.len(), "Gemini response received");
    debug!(preview = %trunc_for_log(&reply.text, 200), "Gemini reply preview");
    Ok(reply)
  }
}

impl ContentModel for Gemini {
  fn name(&self) -> &str {
    &self.model
  }

  fn generate<'a>(&'a self, req: ModelRequest<'a>) -> ModelFuture<'a> {
    Box::pin(self.generate_content(req))
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<ContentReq>,
  system_instruction: ContentReq,
  tools: Vec<ToolReq>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct ContentReq { role: String, parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolReq { google_search: EmptyObject }
#[derive(Serialize)]
struct EmptyObject {}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_schema: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] grounding_metadata: Option<GroundingMetadata>,
}
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata { #[serde(default)] grounding_chunks: Vec<GroundingChunk> }
#[derive(Deserialize)]
struct GroundingChunk { #[serde(default)] web: Option<WebChunk> }
#[derive(Deserialize)]
struct WebChunk {
  #[serde(default)] uri: Option<String>,
  #[serde(default)] title: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

impl GenerateContentResponse {
  /// First candidate only: concatenated text parts + web grounding chunks.
  fn into_reply(self) -> ModelReply {
    let Some(first) = self.candidates.into_iter().next() else {
      return ModelReply::default();
    };
    let text = first
      .content
      .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
      .unwrap_or_default();
    let sources = first
      .grounding_metadata
      .map(|g| g.grounding_chunks)
      .unwrap_or_default()
      .into_iter()
      .filter_map(|chunk| {
        let web = chunk.web?;
        let uri = web.uri.filter(|u| !u.is_empty())?;
        let title = web.title.filter(|t| !t.is_empty()).unwrap_or_else(|| uri.clone());
        Some(Source { title, uri })
      })
      .collect();
    ModelReply { text, sources }
  }
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reply_joins_text_parts_and_collects_web_sources() {
    let raw = r#"{
      "candidates": [{
        "content": {"parts": [{"text": "{\"title\":"}, {"text": "\"x\"}"}]},
        "groundingMetadata": {"groundingChunks": [
          {"web": {"uri": "https://a.dz", "title": "A"}},
          {"web": {"uri": "https://b.dz"}},
          {"web": {"title": "no uri"}},
          {}
        ]}
      }],
      "usageMetadata": {"promptTokenCount": 10}
    }"#;
    let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
    let reply = resp.into_reply();
    assert_eq!(reply.text, r#"{"title":"x"}"#);
    assert_eq!(
      reply.sources,
      vec![
        Source { title: "A".into(), uri: "https://a.dz".into() },
        Source { title: "https://b.dz".into(), uri: "https://b.dz".into() },
      ]
    );
  }

  #[test]
  fn empty_response_yields_empty_reply() {
    let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
    let reply = resp.into_reply();
    assert!(reply.text.is_empty());
    assert!(reply.sources.is_empty());
  }

  #[test]
  fn request_uses_gemini_field_names() {
    let schema = serde_json::json!({"type": "OBJECT"});
    let body = GenerateContentRequest {
      contents: vec![ContentReq { role: "user".into(), parts: vec![PartReq { text: "u".into() }] }],
      system_instruction: ContentReq { role: "system".into(), parts: vec![PartReq { text: "s".into() }] },
      tools: vec![ToolReq { google_search: EmptyObject {} }],
      generation_config: GenerationConfig { response_mime_type: "application/json".into(), response_schema: Some(schema) },
    };
    let v = serde_json::to_value(&body).unwrap();
    assert_eq!(v["systemInstruction"]["parts"][0]["text"], "s");
    assert_eq!(v["tools"][0]["googleSearch"], serde_json::json!({}));
    assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("API key not valid"));
    assert_eq!(extract_gemini_error("<html>"), None);
  }
}
