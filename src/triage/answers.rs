use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};
use crate::triage::response::McqQuestion;

/// Selected option keys per question id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnswerSheet {
  selections: BTreeMap<String, Vec<String>>,
}

impl AnswerSheet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parses command-line style answers: `Q1=A`, `Q2=A,C`.
  pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
    let mut sheet = Self::new();
    for arg in args {
      let arg = arg.as_ref();
      let (id, opts) = arg
        .split_once('=')
        .ok_or_else(|| TriageError::InvalidAnswers(format!("expected ID=OPTIONS, got {arg:?}")))?;
      let keys: Vec<&str> = opts
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
      if keys.is_empty() {
        return Err(TriageError::InvalidAnswers(format!(
          "no option selected for {id}"
        )));
      }
      sheet.select(id.trim(), &keys);
    }
    Ok(sheet)
  }

  pub fn select(&mut self, question_id: &str, keys: &[&str]) {
    let entry = self.selections.entry(question_id.to_string()).or_default();
    for key in keys {
      let key = key.to_uppercase();
      if !entry.contains(&key) {
        entry.push(key);
      }
    }
  }

  pub fn selected(&self, question_id: &str) -> &[String] {
    self
      .selections
      .get(question_id)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Checks the sheet answers exactly the given questions with valid keys.
  pub fn validate(&self, questions: &[McqQuestion]) -> Result<()> {
    for id in self.selections.keys() {
      if !questions.iter().any(|q| &q.id == id) {
        return Err(TriageError::InvalidAnswers(format!("unknown question {id}")));
      }
    }

    for q in questions {
      let selected = self.selected(&q.id);
      if selected.is_empty() {
        return Err(TriageError::InvalidAnswers(format!("{} is unanswered", q.id)));
      }
      if selected.len() > 1 && !q.allow_multiple {
        return Err(TriageError::InvalidAnswers(format!(
          "{} accepts a single option",
          q.id
        )));
      }
      if let Some(bad) = selected.iter().find(|k| !q.options.contains_key(k.as_str())) {
        return Err(TriageError::InvalidAnswers(format!(
          "{} has no option {bad}",
          q.id
        )));
      }
    }
    Ok(())
  }

  /// Option texts selected for a question, in selection order.
  pub fn selected_texts<'a>(&self, question: &'a McqQuestion) -> Vec<&'a str> {
    self
      .selected(&question.id)
      .iter()
      .filter_map(|k| question.options.get(k).map(String::as_str))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::triage::response::{fixtures, AiResponse};

  fn questions() -> Vec<McqQuestion> {
    match AiResponse::parse(fixtures::MCQ).unwrap() {
      AiResponse::Mcq(step) => step.questions,
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn test_parse_and_validate() {
    let sheet = AnswerSheet::parse(&["Q1=b", "Q2=A, B"]).unwrap();
    assert_eq!(sheet.selected("Q1"), ["B"]);
    assert_eq!(sheet.selected("Q2"), ["A", "B"]);
    sheet.validate(&questions()).unwrap();

    let qs = questions();
    assert_eq!(sheet.selected_texts(&qs[1]), vec!["Neck stiffness", "Vomiting"]);
  }

  #[test]
  fn test_parse_rejects_malformed() {
    assert!(AnswerSheet::parse(&["Q1"]).is_err());
    assert!(AnswerSheet::parse(&["Q1="]).is_err());
  }

  #[test]
  fn test_validate_rejects_multiple_on_single_choice() {
    let sheet = AnswerSheet::parse(&["Q1=A,B", "Q2=Z"]).unwrap();
    let err = sheet.validate(&questions()).unwrap_err().to_string();
    assert!(err.contains("single option"));
  }

  #[test]
  fn test_validate_rejects_unknown_keys_and_gaps() {
    let unknown_option = AnswerSheet::parse(&["Q1=D", "Q2=A"]).unwrap();
    assert!(unknown_option.validate(&questions()).is_err());

    let unknown_question = AnswerSheet::parse(&["Q1=A", "Q2=A", "Q9=A"]).unwrap();
    assert!(unknown_question.validate(&questions()).is_err());

    let unanswered = AnswerSheet::parse(&["Q1=A"]).unwrap();
    let err = unanswered.validate(&questions()).unwrap_err().to_string();
    assert!(err.contains("Q2 is unanswered"));
  }

  #[test]
  fn test_duplicate_selection_is_collapsed() {
    let sheet = AnswerSheet::parse(&["Q2=A", "Q2=a,B"]).unwrap();
    assert_eq!(sheet.selected("Q2"), ["A", "B"]);
  }
}
