use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{Result, TriageError};

/// Patient-entered demographics and history collected before triage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeData {
  pub full_name: String,
  pub email: String,
  #[serde(deserialize_with = "scalar_string")]
  pub age: String,
  pub sex: String,
  pub blood_group: String,
  #[serde(deserialize_with = "scalar_string")]
  pub weight: String,
  #[serde(deserialize_with = "scalar_string")]
  pub height: String,
  pub current_symptoms: String,
  pub conditions: String,
  pub medications: String,
  pub allergies: String,
  pub smoking: String,
  pub alcohol: String,
  pub pregnancy: String,
  pub surgeries: String,
  pub lab_results: String,
  pub vitals: String,
}

impl Default for IntakeData {
  fn default() -> Self {
    Self {
      full_name: String::new(),
      email: String::new(),
      age: String::new(),
      sex: String::new(),
      blood_group: String::new(),
      weight: String::new(),
      height: String::new(),
      current_symptoms: String::new(),
      conditions: String::new(),
      medications: String::new(),
      allergies: String::new(),
      smoking: "No".to_string(),
      alcohol: "No".to_string(),
      pregnancy: "N/A".to_string(),
      surgeries: String::new(),
      lab_results: String::new(),
      vitals: String::new(),
    }
  }
}

/// Fields extracted from a spoken transcript. Anything the speaker did not
/// mention is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeFields {
  #[serde(deserialize_with = "optional_scalar_string")]
  pub full_name: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub email: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub age: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub sex: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub blood_group: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub weight: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub height: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub current_symptoms: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub conditions: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub medications: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub allergies: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub smoking: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub alcohol: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub pregnancy: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub surgeries: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub lab_results: Option<String>,
  #[serde(deserialize_with = "optional_scalar_string")]
  pub vitals: Option<String>,
}

impl IntakeFields {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
  Ok(optional_scalar_string(d)?.unwrap_or_default())
}

/// Accepts `"25"`, `25` or `25.0` alike; the model and hand-written YAML both
/// emit bare numbers for age, weight and height.
fn optional_scalar_string<'de, D: Deserializer<'de>>(
  d: D,
) -> std::result::Result<Option<String>, D::Error> {
  let value = Option::<serde_json::Value>::deserialize(d)?;
  Ok(match value {
    None | Some(serde_json::Value::Null) => None,
    Some(serde_json::Value::String(s)) => Some(s),
    Some(other) => Some(other.to_string()),
  })
}

const REQUIRED: &[&str] = &["fullName", "age", "sex", "weight", "height", "currentSymptoms"];

impl IntakeData {
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    let content = serde_yaml::to_string(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn missing_required(&self) -> Vec<&'static str> {
    let values = [
      &self.full_name,
      &self.age,
      &self.sex,
      &self.weight,
      &self.height,
      &self.current_symptoms,
    ];
    REQUIRED
      .iter()
      .zip(values)
      .filter(|(_, v)| v.trim().is_empty())
      .map(|(name, _)| *name)
      .collect()
  }

  pub fn validate(&self) -> Result<()> {
    let missing = self.missing_required();
    if !missing.is_empty() {
      return Err(TriageError::InvalidIntake(format!(
        "missing required fields: {}",
        missing.join(", ")
      )));
    }
    // Age 0 covers infants under a year.
    let checks = [
      ("age", &self.age, 0.0),
      ("weight", &self.weight, f64::MIN_POSITIVE),
      ("height", &self.height, f64::MIN_POSITIVE),
    ];
    for (name, value, min) in checks {
      match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= min => {}
        _ => {
          return Err(TriageError::InvalidIntake(format!(
            "{name} must be a positive number, got {value:?}"
          )))
        }
      }
    }
    Ok(())
  }

  pub fn bmi(&self) -> Option<f64> {
    let weight: f64 = self.weight.trim().parse().ok()?;
    let height: f64 = self.height.trim().parse().ok()?;
    if weight <= 0.0 || height <= 0.0 {
      return None;
    }
    let metres = height / 100.0;
    Some(weight / (metres * metres))
  }

  pub fn normalized_email(&self) -> String {
    normalize_email(&self.email)
  }

  /// Applies transcript fields. Free-text history fields accumulate; every
  /// other mentioned field replaces the old value.
  pub fn merge_voice(&mut self, fields: IntakeFields) {
    append(&mut self.current_symptoms, fields.current_symptoms, ". ");
    append(&mut self.conditions, fields.conditions, ", ");
    append(&mut self.medications, fields.medications, ", ");
    append(&mut self.allergies, fields.allergies, ", ");

    let overwrites = [
      (&mut self.full_name, fields.full_name),
      (&mut self.email, fields.email),
      (&mut self.age, fields.age),
      (&mut self.sex, fields.sex),
      (&mut self.blood_group, fields.blood_group),
      (&mut self.weight, fields.weight),
      (&mut self.height, fields.height),
      (&mut self.smoking, fields.smoking),
      (&mut self.alcohol, fields.alcohol),
      (&mut self.pregnancy, fields.pregnancy),
      (&mut self.surgeries, fields.surgeries),
      (&mut self.lab_results, fields.lab_results),
      (&mut self.vitals, fields.vitals),
    ];
    let mut updated = 0;
    for (slot, value) in overwrites {
      if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        *slot = v;
        updated += 1;
      }
    }
    info!("voice merge: {updated} field(s) replaced");
  }
}

fn append(slot: &mut String, addition: Option<String>, separator: &str) {
  let Some(addition) = addition.filter(|a| !a.trim().is_empty()) else {
    return;
  };
  if slot.is_empty() {
    *slot = addition;
  } else {
    slot.push_str(separator);
    slot.push_str(&addition);
  }
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

#[cfg(test)]
pub mod fixtures {
  use super::IntakeData;

  pub fn sample() -> IntakeData {
    IntakeData {
      full_name: "Aditi Sharma".into(),
      email: "Aditi.Sharma@Example.com ".into(),
      age: "34".into(),
      sex: "Female".into(),
      weight: "64".into(),
      height: "160".into(),
      current_symptoms: "High fever and headache for 2 days".into(),
      ..IntakeData::default()
    }
  }
}
