use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, Language};
use crate::error::{Result, TriageError};
use crate::intake::IntakeData;
use crate::llm::chat::ChatSession;
use crate::llm::client::Llm;
use crate::llm::model;
use crate::prompt;
use crate::triage::answers::AnswerSheet;
use crate::triage::response::{AiResponse, McqQuestion, McqStep, TriageResponse};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
  Intake,
  AnalyzingIntake,
  McqEntry,
  AnalyzingMcq,
  /// A report arrived that asks for one more round of questions.
  Clarifying,
  Completed,
  Error,
}

impl FlowState {
  pub fn awaits_answers(&self) -> bool {
    matches!(self, FlowState::McqEntry | FlowState::Clarifying)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, FlowState::Completed)
  }
}

/// One patient's pass through intake, questions and the final assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSession {
  pub id: String,
  pub language: Language,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  state: FlowState,
  intake: Option<IntakeData>,
  mcq: Option<McqStep>,
  report: Option<TriageResponse>,
  #[serde(default)]
  clarification_rounds: u32,
  #[serde(default)]
  missing_fields: Vec<String>,
  last_error: Option<String>,
  /// Set once the completed report has been written to the record store.
  record_id: Option<String>,
  chat: ChatSession,
}

impl TriageSession {
  pub fn new(config: &Config, language: Language) -> Self {
    let now = Utc::now();
    let chat = ChatSession::new(
      &model::resolve(&config.models.triage),
      prompt::system_instruction(language),
      config.temperatures.triage,
      config.request_timeout_secs,
    );
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      language,
      created_at: now,
      updated_at: now,
      state: FlowState::Intake,
      intake: None,
      mcq: None,
      report: None,
      clarification_rounds: 0,
      missing_fields: Vec::new(),
      last_error: None,
      record_id: None,
      chat,
    }
  }

  pub fn state(&self) -> FlowState {
    self.state
  }

  pub fn intake(&self) -> Option<&IntakeData> {
    self.intake.as_ref()
  }

  pub fn report(&self) -> Option<&TriageResponse> {
    self.report.as_ref()
  }

  pub fn missing_fields(&self) -> &[String] {
    &self.missing_fields
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn clarification_rounds(&self) -> u32 {
    self.clarification_rounds
  }

  /// Messages exchanged with the model so far, both sides counted.
  pub fn turns(&self) -> usize {
    self.chat.history().len()
  }

  pub fn record_id(&self) -> Option<&str> {
    self.record_id.as_deref()
  }

  /// Questions the patient still has to answer in the current state.
  pub fn pending_questions(&self) -> &[McqQuestion] {
    match self.state {
      FlowState::McqEntry => self.mcq.as_ref().map(|m| m.questions.as_slice()),
      FlowState::Clarifying => self.report.as_ref().map(|r| r.questions.as_slice()),
      _ => None,
    }
    .unwrap_or_default()
  }

  /// The intake and final report, available only once the flow completed.
  pub fn finished_report(&self) -> Option<(&IntakeData, &TriageResponse)> {
    if self.state != FlowState::Completed {
      return None;
    }
    self.intake.as_ref().zip(self.report.as_ref())
  }

  /// Starts a fresh conversation with the given intake.
  pub fn submit_intake(&mut self, llm: &impl Llm, intake: IntakeData) -> Result<FlowState> {
    if !matches!(self.state, FlowState::Intake | FlowState::Error) {
      return Err(TriageError::State(format!(
        "{}: cannot submit intake while {:?}",
        self.id, self.state
      )));
    }
    intake.validate()?;

    self.chat.reset();
    self.mcq = None;
    self.report = None;
    self.clarification_rounds = 0;
    self.missing_fields.clear();

    let message = prompt::intake_message(&intake);
    self.intake = Some(intake);
    self.transition(FlowState::AnalyzingIntake);
    self.exchange(llm, &message)
  }

  /// Re-sends the stored intake after a failed model call.
  pub fn retry(&mut self, llm: &impl Llm) -> Result<FlowState> {
    if self.state != FlowState::Error {
      return Err(TriageError::State(format!(
        "{}: only failed sessions can be retried (state {:?})",
        self.id, self.state
      )));
    }
    let intake = self
      .intake
      .clone()
      .ok_or_else(|| TriageError::State(format!("{}: no intake to retry", self.id)))?;
    self.submit_intake(llm, intake)
  }

  pub fn submit_answers(&mut self, llm: &impl Llm, answers: &AnswerSheet) -> Result<FlowState> {
    let clarification = match self.state {
      FlowState::McqEntry => false,
      FlowState::Clarifying => true,
      other => {
        return Err(TriageError::State(format!(
          "{}: no questions are pending while {other:?}",
          self.id
        )))
      }
    };

    let questions = self.pending_questions().to_vec();
    answers.validate(&questions)?;

    if clarification {
      self.clarification_rounds += 1;
    }
    let message = prompt::answers_message(&questions, answers, clarification);
    self.transition(FlowState::AnalyzingMcq);
    self.exchange(llm, &message)
  }

  pub fn mark_saved(&mut self, record_id: &str) {
    self.record_id = Some(record_id.to_string());
    self.updated_at = Utc::now();
  }

  /// Back to an empty intake with a fresh conversation.
  pub fn reset(&mut self) {
    self.chat.reset();
    self.intake = None;
    self.mcq = None;
    self.report = None;
    self.clarification_rounds = 0;
    self.missing_fields.clear();
    self.last_error = None;
    self.record_id = None;
    self.transition(FlowState::Intake);
  }

  fn exchange(&mut self, llm: &impl Llm, message: &str) -> Result<FlowState> {
    let outcome = self
      .chat
      .send(llm, message)
      .and_then(|raw| AiResponse::parse(&raw));

    let applied = match outcome {
      Ok(response) => self.apply(response),
      Err(e) => Err(e),
    };

    match applied {
      Ok(state) => {
        self.last_error = None;
        Ok(state)
      }
      Err(e) => {
        warn!("{}: model exchange failed: {e}", self.id);
        self.last_error = Some(e.to_string());
        self.transition(FlowState::Error);
        Err(e)
      }
    }
  }

  fn apply(&mut self, response: AiResponse) -> Result<FlowState> {
    info!("{}: received {} response", self.id, response.kind());

    match response {
      AiResponse::Mcq(step) => {
        if step.questions.is_empty() {
          return Err(TriageError::MalformedOutput(
            "questionnaire without questions".into(),
          ));
        }
        self.mcq = Some(step);
        self.transition(FlowState::McqEntry);
      }
      AiResponse::IntakeIncomplete(step) => {
        self.missing_fields = step.required_fields_missing;
        self.transition(FlowState::Intake);
      }
      AiResponse::Triage(report) => {
        let wants_more = report.needs_clarification();
        self.report = Some(report);
        if wants_more && self.clarification_rounds == 0 {
          self.transition(FlowState::Clarifying);
        } else {
          if wants_more {
            warn!(
              "{}: model asked for another clarification round, using report as final",
              self.id
            );
          }
          self.transition(FlowState::Completed);
        }
      }
    }
    Ok(self.state)
  }

  fn transition(&mut self, to: FlowState) {
    if self.state != to {
      info!("{}: {:?} -> {to:?}", self.id, self.state);
    }
    self.state = to;
    self.updated_at = Utc::now();
  }
}
