use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::intake::IntakeFields;
use crate::llm::client::{Completion, Llm, Turn};
use crate::llm::model;
use crate::prompt;

/// Extracts intake fields from a spoken transcript. Output the model could
/// not shape into fields yields an empty result; transport failures propagate.
pub fn parse_transcript(llm: &impl Llm, config: &Config, transcript: &str) -> Result<IntakeFields> {
  if transcript.trim().is_empty() {
    return Ok(IntakeFields::default());
  }

  let model = model::resolve(&config.models.voice);
  let turns = [Turn::user(prompt::voice_extraction(transcript))];
  let request = Completion {
    model: &model,
    system: "",
    turns: &turns,
    temperature: config.temperatures.voice,
    json: true,
    timeout: Some(Duration::from_secs(config.request_timeout_secs)),
  };

  match llm.complete_json::<IntakeFields>(&request) {
    Ok(fields) => {
      info!("voice transcript parsed, empty={}", fields.is_empty());
      Ok(fields)
    }
    Err(TriageError::MalformedOutput(e)) => {
      warn!("could not parse voice input: {e}");
      Ok(IntakeFields::default())
    }
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::llm::testing::ScriptedLlm;

  #[test]
  fn test_parse_transcript_extracts_fields() {
    let llm = ScriptedLlm::new()
      .reply(r#"{"fullName": "Ravi Kumar", "age": 45, "currentSymptoms": "cough"}"#);
    let fields =
      parse_transcript(&llm, &Config::default(), "I am Ravi Kumar, 45, with a cough").unwrap();

    assert_eq!(fields.full_name.as_deref(), Some("Ravi Kumar"));
    assert_eq!(fields.age.as_deref(), Some("45"));
    assert!(fields.allergies.is_none());

    let requests = llm.requests.borrow();
    assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
    assert!(requests[0].system.is_empty());
    assert!(requests[0].turns[0]
      .text
      .contains("Transcript: \"I am Ravi Kumar, 45, with a cough\""));
  }

  #[test]
  fn test_malformed_output_yields_empty_fields() {
    let llm = ScriptedLlm::new().reply("sorry, I could not understand");
    let fields = parse_transcript(&llm, &Config::default(), "mumble").unwrap();
    assert!(fields.is_empty());
  }

  #[test]
  fn test_transport_error_propagates() {
    let llm = ScriptedLlm::new().fail("401 unauthorized");
    assert!(parse_transcript(&llm, &Config::default(), "hello").is_err());
  }

  #[test]
  fn test_blank_transcript_skips_model() {
    let llm = ScriptedLlm::new();
    assert!(parse_transcript(&llm, &Config::default(), "  ").unwrap().is_empty());
    assert!(llm.requests.borrow().is_empty());
  }
}
