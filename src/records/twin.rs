use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::intake::normalize_email;
use crate::records::portal::{format_time, timestamp};
use crate::records::store::{PatientRecord, RecordStatus};

const SYMPTOM_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
  pub name: String,
  pub email: String,
  pub age: String,
  pub sex: String,
  pub blood_group: String,
  pub height: String,
  pub weight: String,
  pub bmi: Option<f64>,
  pub conditions: String,
  pub allergies: String,
  pub vitals: String,
  pub smoking: String,
  pub alcohol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
  pub record_id: String,
  pub time: Option<DateTime<Utc>>,
  pub symptoms: String,
  pub status: RecordStatus,
  pub department: String,
  pub top_condition: Option<String>,
  pub red_flags: usize,
}

/// One patient's history assembled from every record saved under their email.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalTwin {
  pub latest_record_id: String,
  pub profile: Profile,
  pub visits: Vec<Visit>,
}

impl DigitalTwin {
  pub fn build(records: &[PatientRecord], email: &str) -> Option<Self> {
    let email = normalize_email(email);
    if email.is_empty() {
      return None;
    }

    let mut matching: Vec<&PatientRecord> = records
      .iter()
      .filter(|r| r.intake.normalized_email() == email)
      .collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let latest = matching.first()?;
    let intake = &latest.intake;
    let profile = Profile {
      name: intake.full_name.clone(),
      email: intake.email.trim().to_string(),
      age: intake.age.clone(),
      sex: intake.sex.clone(),
      blood_group: intake.blood_group.clone(),
      height: intake.height.clone(),
      weight: intake.weight.clone(),
      bmi: intake.bmi(),
      conditions: intake.conditions.clone(),
      allergies: intake.allergies.clone(),
      vitals: intake.vitals.clone(),
      smoking: intake.smoking.clone(),
      alcohol: intake.alcohol.clone(),
    };

    let visits = matching
      .iter()
      .map(|r| Visit {
        record_id: r.id.clone(),
        time: timestamp(r.timestamp),
        symptoms: preview(&r.intake.current_symptoms),
        status: r.status,
        department: r.triage.recommended_department.clone(),
        top_condition: r.triage.top_condition().map(|c| c.name.clone()),
        red_flags: r.triage.red_flags.len(),
      })
      .collect();

    Some(Self {
      latest_record_id: latest.id.clone(),
      profile,
      visits,
    })
  }
}

fn preview(text: &str) -> String {
  let text = text.trim();
  if text.chars().count() <= SYMPTOM_PREVIEW_CHARS {
    return text.to_string();
  }
  let cut: String = text.chars().take(SYMPTOM_PREVIEW_CHARS).collect();
  format!("{}...", cut.trim_end())
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
  if value.trim().is_empty() {
    placeholder
  } else {
    value
  }
}

impl std::fmt::Display for DigitalTwin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let p = &self.profile;
    let mut out = String::new();
    let _ = writeln!(out, "Digital twin: {} <{}>", p.name, p.email);
    let _ = writeln!(out, "Latest record: {}", self.latest_record_id);
    let _ = writeln!(
      out,
      "Age {} | Sex {} | Blood group {}",
      p.age,
      p.sex,
      or_placeholder(&p.blood_group, "unknown")
    );
    let bmi = p
      .bmi
      .map(|b| format!("{b:.1}"))
      .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "Height {} cm | Weight {} kg | BMI {bmi}", p.height, p.weight);
    let _ = writeln!(out, "Conditions: {}", or_placeholder(&p.conditions, "None reported"));
    let _ = writeln!(out, "Allergies:  {}", or_placeholder(&p.allergies, "None reported"));
    let _ = writeln!(out, "Vitals:     {}", or_placeholder(&p.vitals, "Not recorded"));
    let _ = writeln!(out, "Smoking: {} | Alcohol: {}", p.smoking, p.alcohol);

    let _ = writeln!(out, "\nAssessment history ({})", self.visits.len());
    for v in &self.visits {
      let _ = write!(
        out,
        "  {} {:<9} {} | Dep: {} | {}",
        format_time(v.time),
        v.status,
        v.symptoms,
        v.department,
        v.top_condition.as_deref().unwrap_or("-"),
      );
      if v.red_flags > 0 {
        let _ = write!(out, " | {} red flag(s)", v.red_flags);
      }
      out.push('\n');
    }
    f.write_str(&out)
  }
}
