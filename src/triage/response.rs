use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TriageError};
use crate::llm::client::parse_json_output;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McqQuestion {
  pub id: String,
  pub question: String,
  pub options: BTreeMap<String, String>,
  #[serde(default)]
  pub allow_multiple: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McqStep {
  pub questions: Vec<McqQuestion>,
  #[serde(default)]
  pub next_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeStep {
  #[serde(default)]
  pub required_fields_missing: Vec<String>,
  #[serde(default)]
  pub next_action: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Probability {
  Low,
  Moderate,
  High,
}

impl std::str::FromStr for Probability {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    let s = s.trim().to_lowercase();
    if s.starts_with("high") {
      Ok(Probability::High)
    } else if s.starts_with("moderate") || s.starts_with("medium") {
      Ok(Probability::Moderate)
    } else if s.starts_with("low") {
      Ok(Probability::Low)
    } else {
      Err(format!("unknown probability: {s}"))
    }
  }
}

impl<'de> Deserialize<'de> for Probability {
  fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
    let s = String::deserialize(d)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

impl std::fmt::Display for Probability {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{self:?}")
  }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum YesNo {
  Yes,
  #[default]
  No,
}

impl<'de> Deserialize<'de> for YesNo {
  fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Flag(bool),
      Text(String),
    }

    match Raw::deserialize(d)? {
      Raw::Flag(true) => Ok(YesNo::Yes),
      Raw::Flag(false) => Ok(YesNo::No),
      Raw::Text(s) => match s.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(YesNo::Yes),
        "no" | "n" | "false" | "" => Ok(YesNo::No),
        other => Err(serde::de::Error::custom(format!("expected YES or NO, got {other}"))),
      },
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbableCondition {
  pub name: String,
  pub probability: Probability,
  #[serde(default)]
  pub reason: String,
}

/// The structured assessment produced at the end of the flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResponse {
  pub symptom_summary: String,
  #[serde(default)]
  pub clarifying_questions_needed: YesNo,
  #[serde(default)]
  pub questions: Vec<McqQuestion>,
  #[serde(default)]
  pub probable_conditions: Vec<ProbableCondition>,
  #[serde(default)]
  pub red_flags: Vec<String>,
  #[serde(default)]
  pub recommended_tests: Vec<String>,
  #[serde(default)]
  pub recommended_department: String,
  #[serde(default)]
  pub self_care_advice: String,
  #[serde(default)]
  pub ayurvedic_suggestions: String,
  #[serde(default)]
  pub estimated_consultation_time: String,
  #[serde(default)]
  pub internal_chatbot_trigger: YesNo,
}

impl TriageResponse {
  /// Clarification only counts when the model actually supplied questions.
  pub fn needs_clarification(&self) -> bool {
    self.clarifying_questions_needed == YesNo::Yes && !self.questions.is_empty()
  }

  pub fn has_red_flags(&self) -> bool {
    !self.red_flags.is_empty()
  }

  pub fn has_high_probability(&self) -> bool {
    self
      .probable_conditions
      .iter()
      .any(|c| c.probability == Probability::High)
  }

  pub fn top_condition(&self) -> Option<&ProbableCondition> {
    self.probable_conditions.first()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AiResponse {
  Mcq(McqStep),
  Triage(TriageResponse),
  IntakeIncomplete(IntakeStep),
}

impl AiResponse {
  pub fn parse(raw: &str) -> Result<Self> {
    let value: serde_json::Value = parse_json_output(raw)?;
    Self::from_value(value)
  }

  pub fn from_value(value: serde_json::Value) -> Result<Self> {
    let screen = value
      .get("screen")
      .and_then(|v| v.as_str())
      .map(str::to_string);

    let decoded = match screen.as_deref() {
      Some("symptom_mcq") => serde_json::from_value(value).map(AiResponse::Mcq),
      _ if value.get("symptom_summary").is_some() => {
        serde_json::from_value(value).map(AiResponse::Triage)
      }
      Some("patient_intake") => serde_json::from_value(value).map(AiResponse::IntakeIncomplete),
      other => {
        return Err(TriageError::MalformedOutput(format!(
          "unrecognised response (screen={other:?})"
        )))
      }
    };

    decoded.map_err(|e| TriageError::MalformedOutput(format!("response schema: {e}")))
  }

  pub fn kind(&self) -> &'static str {
    match self {
      AiResponse::Mcq(_) => "symptom_mcq",
      AiResponse::Triage(_) => "triage",
      AiResponse::IntakeIncomplete(_) => "patient_intake",
    }
  }
}

#[cfg(test)]
pub mod fixtures {
  pub const MCQ: &str = r#"{
    "screen": "symptom_mcq",
    "questions": [
      {"id": "Q1", "question": "How high has the fever gone?",
       "options": {"A": "Low grade (<100F)", "B": "High grade (>102F)", "C": "Not measured/Unsure"},
       "allow_multiple": false},
      {"id": "Q2", "question": "Any of these along with the headache?",
       "options": {"A": "Neck stiffness", "B": "Vomiting", "Z": "None of the above"},
       "allow_multiple": true}
    ],
    "next_action": "Collect user answers and then begin triage."
  }"#;

  pub const FINAL: &str = r#"```json
  {
    "symptom_summary": "Two days of high fever with headache.",
    "clarifying_questions_needed": "NO",
    "questions": [],
    "probable_conditions": [
      {"name": "Viral fever", "probability": "High", "reason": "Acute febrile illness"},
      {"name": "Dengue", "probability": "Moderate", "reason": "Seasonal prevalence"}
    ],
    "red_flags": [],
    "recommended_tests": ["CBC", "Dengue NS1"],
    "recommended_department": "General Medicine (Dr. Vivek Srivastava)",
    "self_care_advice": "Rest and fluids.",
    "ayurvedic_suggestions": "Tulsi tea, as complementary advice.",
    "estimated_consultation_time": "10-15 Minutes",
    "internal_chatbot_trigger": "NO"
  }
  ```"#;

  pub const CLARIFY: &str = r#"{
    "symptom_summary": "Fever with headache and neck stiffness.",
    "clarifying_questions_needed": "YES",
    "questions": [
      {"id": "CQ1", "question": "Is there confusion or drowsiness?",
       "options": {"A": "Yes", "B": "No", "Z": "None of the above"}}
    ],
    "probable_conditions": [
      {"name": "Meningitis", "probability": "Moderate", "reason": "Neck stiffness with fever"}
    ],
    "red_flags": ["Possible meningism"],
    "recommended_tests": [],
    "recommended_department": "Neurology",
    "self_care_advice": "",
    "ayurvedic_suggestions": "",
    "estimated_consultation_time": "20-30 Minutes",
    "internal_chatbot_trigger": "YES"
  }"#;

  pub const CRITICAL: &str = r#"{
    "symptom_summary": "Crushing chest pain radiating to left arm.",
    "clarifying_questions_needed": "no",
    "probable_conditions": [
      {"name": "Acute coronary syndrome", "probability": "high", "reason": "Typical pain"}
    ],
    "red_flags": ["Chest pain suspicious of ACS"],
    "recommended_department": "Cardiology (Dr. Sudhanshu Budakoti, 3rd Fri)"
  }"#;

  pub const INTAKE_INCOMPLETE: &str = r#"{
    "screen": "patient_intake",
    "required_fields_missing": ["age", "sex"],
    "next_action": "Once all mandatory fields are filled, proceed to MCQ symptom assessment."
  }"#;
}
