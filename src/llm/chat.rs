use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::client::{Completion, Llm, Turn};

/// A multi-turn conversation with a fixed system instruction. The history is
/// serialisable so a conversation survives between command invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
  model: String,
  temperature: f32,
  timeout_secs: u64,
  system: String,
  #[serde(default)]
  history: Vec<Turn>,
}

impl ChatSession {
  pub fn new(model: &str, system: String, temperature: f32, timeout_secs: u64) -> Self {
    Self {
      model: model.to_string(),
      temperature,
      timeout_secs,
      system,
      history: Vec::new(),
    }
  }

  /// Sends `message` with the whole history and returns the raw model text.
  /// A failed call leaves the history unchanged.
  pub fn send(&mut self, llm: &impl Llm, message: &str) -> Result<String> {
    self.history.push(Turn::user(message));

    let request = Completion {
      model: &self.model,
      system: &self.system,
      turns: &self.history,
      temperature: self.temperature,
      json: true,
      timeout: Some(Duration::from_secs(self.timeout_secs)),
    };

    match llm.complete(&request) {
      Ok(raw) => {
        debug!("chat turn {} answered", self.history.len());
        self.history.push(Turn::model(raw.clone()));
        Ok(raw)
      }
      Err(e) => {
        warn!("chat turn failed, dropping message from history: {e}");
        self.history.pop();
        Err(e)
      }
    }
  }

  pub fn history(&self) -> &[Turn] {
    &self.history
  }

  pub fn reset(&mut self) {
    self.history.clear();
  }
}
