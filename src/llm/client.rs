use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, TriageError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
  pub role: Role,
  pub text: String,
}

impl Turn {
  pub fn user(text: impl Into<String>) -> Self {
    Self {
      role: Role::User,
      text: text.into(),
    }
  }

  pub fn model(text: impl Into<String>) -> Self {
    Self {
      role: Role::Model,
      text: text.into(),
    }
  }
}

pub struct Completion<'a> {
  pub model: &'a str,
  pub system: &'a str,
  pub turns: &'a [Turn],
  pub temperature: f32,
  /// Ask the service for an `application/json` response body.
  pub json: bool,
  pub timeout: Option<Duration>,
}

pub trait Llm {
  fn complete(&self, request: &Completion<'_>) -> Result<String>;

  fn complete_json<T: DeserializeOwned>(&self, request: &Completion<'_>) -> Result<T> {
    let raw = self.complete(request)?;
    parse_json_output(&raw)
  }
}

pub struct GeminiClient {
  endpoint: String,
  api_key: String,
  client: reqwest::blocking::Client,
}

impl GeminiClient {
  pub fn new(endpoint: &str, api_key: String, timeout: Duration) -> Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .build()?;
    Ok(Self {
      endpoint: endpoint.trim_end_matches('/').to_string(),
      api_key,
      client,
    })
  }

  pub fn from_config(config: &Config) -> Result<Self> {
    Self::new(
      &config.endpoint,
      config.api_key()?,
      Duration::from_secs(config.request_timeout_secs),
    )
  }
}

impl Llm for GeminiClient {
  fn complete(&self, request: &Completion<'_>) -> Result<String> {
    let url = format!("{}/models/{}:generateContent", self.endpoint, request.model);
    let body = request_body(request);

    info!(
      "calling {} with {} turn(s), temperature={}",
      request.model,
      request.turns.len(),
      request.temperature
    );
    if let Some(last) = request.turns.last() {
      debug!("message: {}", last.text);
    }

    let mut builder = self
      .client
      .post(&url)
      .header("x-goog-api-key", &self.api_key)
      .json(&body);
    if let Some(timeout) = request.timeout {
      builder = builder.timeout(timeout);
    }

    let response = builder.send().map_err(|e| {
      if e.is_timeout() {
        TriageError::Timeout(format!("{} did not answer in time", request.model))
      } else {
        TriageError::Http(e)
      }
    })?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().unwrap_or_default();
      return Err(TriageError::Model(format!("{status}: {text}")));
    }

    let parsed: GenerateResponse = response.json()?;
    let text = candidate_text(parsed)?;
    debug!("model output length: {} bytes", text.len());
    Ok(text)
  }
}

fn request_body(request: &Completion<'_>) -> serde_json::Value {
  let contents: Vec<serde_json::Value> = request
    .turns
    .iter()
    .map(|t| {
      serde_json::json!({
        "role": t.role,
        "parts": [{ "text": t.text }],
      })
    })
    .collect();

  let mut generation_config = serde_json::json!({ "temperature": request.temperature });
  if request.json {
    generation_config["responseMimeType"] = "application/json".into();
  }

  let mut body = serde_json::json!({
    "contents": contents,
    "generationConfig": generation_config,
  });
  if !request.system.is_empty() {
    body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": request.system }] });
  }
  body
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<Content>,
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

fn candidate_text(response: GenerateResponse) -> Result<String> {
  let candidate = response
    .candidates
    .into_iter()
    .next()
    .ok_or_else(|| TriageError::MalformedOutput("response has no candidates".into()))?;

  let text: String = candidate
    .content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();

  if text.trim().is_empty() {
    return Err(TriageError::MalformedOutput("candidate has no text".into()));
  }
  Ok(text)
}

pub fn parse_json_output<T: DeserializeOwned>(raw: &str) -> Result<T> {
  serde_json::from_str(extract_json(raw))
    .map_err(|e| TriageError::MalformedOutput(format!("failed to parse model JSON: {e}")))
}

/// Models sometimes wrap JSON in markdown fences or add prose around it even
/// when a JSON response type is requested. Cuts out the JSON object.
pub fn extract_json(text: &str) -> &str {
  if let Some(start) = text.find("```json") {
    let json_start = start + 7;
    if let Some(end) = text[json_start..].find("```") {
      return text[json_start..json_start + end].trim();
    }
  }
  if let Some(start) = text.find("```") {
    let json_start = start + 3;
    let json_start = text[json_start..]
      .find('\n')
      .map(|n| json_start + n + 1)
      .unwrap_or(json_start);
    if let Some(end) = text[json_start..].find("```") {
      return text[json_start..json_start + end].trim();
    }
  }
  if let Some(start) = text.find('{') {
    if let Some(end) = text.rfind('}') {
      if end > start {
        return &text[start..=end];
      }
    }
  }
  text.trim()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_json_raw() {
    let input = r#"{"screen": "symptom_mcq"}"#;
    assert_eq!(extract_json(input), input);
  }

  #[test]
  fn test_extract_json_code_block() {
    let input = "```json\n{\"red_flags\": []}\n```";
    assert_eq!(extract_json(input), "{\"red_flags\": []}");
  }

  #[test]
  fn test_extract_json_plain_fence_with_prose() {
    let input = "Here you go:\n```\n{\"a\": 1}\n```\nThanks";
    assert_eq!(extract_json(input), "{\"a\": 1}");
  }

  #[test]
  fn test_extract_json_with_surrounding_text() {
    let input = "Assessment follows {\"key\": \"value\"} done";
    assert_eq!(extract_json(input), "{\"key\": \"value\"}");
  }

  #[test]
  fn test_parse_json_output_reports_malformed() {
    let err = parse_json_output::<serde_json::Value>("not json at all").unwrap_err();
    assert!(matches!(err, TriageError::MalformedOutput(_)));
  }

  #[test]
  fn test_request_body_shape() {
    let turns = vec![Turn::user("hello"), Turn::model("{}"), Turn::user("again")];
    let request = Completion {
      model: "gemini-2.5-flash",
      system: "be careful",
      turns: &turns,
      temperature: 0.2,
      json: true,
      timeout: None,
    };
    let body = request_body(&request);

    assert_eq!(body["contents"].as_array().unwrap().len(), 3);
    assert_eq!(body["contents"][1]["role"], "model");
    assert_eq!(body["contents"][2]["parts"][0]["text"], "again");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be careful");
  }

  #[test]
  fn test_request_body_without_system_or_json() {
    let turns = vec![Turn::user("x")];
    let request = Completion {
      model: "m",
      system: "",
      turns: &turns,
      temperature: 0.1,
      json: false,
      timeout: None,
    };
    let body = request_body(&request);
    assert!(body.get("systemInstruction").is_none());
    assert!(body["generationConfig"].get("responseMimeType").is_none());
  }

  #[test]
  fn test_candidate_text_joins_parts() {
    let response: GenerateResponse = serde_json::from_str(
      r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
    )
    .unwrap();
    assert_eq!(candidate_text(response).unwrap(), "{\"a\":1}");
  }

  #[test]
  fn test_candidate_text_empty_is_malformed() {
    let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
    assert!(matches!(
      candidate_text(response).unwrap_err(),
      TriageError::MalformedOutput(_)
    ));

    let response: GenerateResponse =
      serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
    assert!(candidate_text(response).is_err());
  }
}
