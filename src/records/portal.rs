use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::intake::IntakeData;
use crate::records::store::{PatientRecord, RecordStatus};
use crate::roster;
use crate::triage::response::TriageResponse;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
  pub id: String,
  pub time: Option<DateTime<Utc>>,
  pub name: String,
  pub status: RecordStatus,
  pub department: String,
  pub top_condition: Option<String>,
}

impl std::fmt::Display for RecordRow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{:<12} {:<16} {:<9} {:<24} {} | {}",
      self.id,
      format_time(self.time),
      self.status,
      self.name,
      self.department,
      self.top_condition.as_deref().unwrap_or("-"),
    )
  }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PortalSummary {
  pub critical: usize,
  pub urgent: usize,
  pub stable: usize,
}

impl std::fmt::Display for PortalSummary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "total={}, critical={}, urgent={}, stable={}",
      self.critical + self.urgent + self.stable,
      self.critical,
      self.urgent,
      self.stable
    )
  }
}

pub fn timestamp(millis: i64) -> Option<DateTime<Utc>> {
  DateTime::from_timestamp_millis(millis)
}

pub fn format_time(time: Option<DateTime<Utc>>) -> String {
  time
    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string())
}

/// Rows in store order, newest first.
pub fn list(records: &[PatientRecord]) -> Vec<RecordRow> {
  records
    .iter()
    .map(|r| RecordRow {
      id: r.id.clone(),
      time: timestamp(r.timestamp),
      name: r.intake.full_name.clone(),
      status: r.status,
      department: r.triage.recommended_department.clone(),
      top_condition: r.triage.top_condition().map(|c| c.name.clone()),
    })
    .collect()
}

pub fn summary(records: &[PatientRecord]) -> PortalSummary {
  let mut summary = PortalSummary::default();
  for record in records {
    match record.status {
      RecordStatus::Critical => summary.critical += 1,
      RecordStatus::Urgent => summary.urgent += 1,
      RecordStatus::Stable => summary.stable += 1,
    }
  }
  summary
}

pub fn detail(record: &PatientRecord) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Record {} [{}]", record.id, record.status);
  let _ = writeln!(out, "Saved:   {}", format_time(timestamp(record.timestamp)));
  out.push_str(&render_report(Some(&record.intake), &record.triage));
  out
}

/// Plain-text triage report shared by the portal and the triage flow.
pub fn render_report(intake: Option<&IntakeData>, triage: &TriageResponse) -> String {
  let mut out = String::new();

  if let Some(intake) = intake {
    let _ = writeln!(
      out,
      "Patient: {} ({} y, {}){}",
      intake.full_name,
      intake.age,
      intake.sex,
      if intake.blood_group.is_empty() {
        String::new()
      } else {
        format!(", blood group {}", intake.blood_group)
      }
    );
    let _ = writeln!(out, "Reason:  {}", intake.current_symptoms);
  }

  let _ = writeln!(out, "\nSummary\n  {}", triage.symptom_summary);

  if triage.has_red_flags() {
    out.push_str("\nRED FLAGS\n");
    for flag in &triage.red_flags {
      let _ = writeln!(out, "  ! {flag}");
    }
  } else {
    out.push_str("\nRed flags: none\n");
  }

  if !triage.probable_conditions.is_empty() {
    out.push_str("\nProbable conditions\n");
    for c in &triage.probable_conditions {
      let _ = writeln!(out, "  - {} [{}] {}", c.name, c.probability, c.reason);
    }
  }

  if !triage.recommended_tests.is_empty() {
    let _ = writeln!(out, "\nRecommended tests\n  {}", triage.recommended_tests.join(", "));
  }

  let _ = writeln!(out, "\nDepartment\n  {}", triage.recommended_department);
  if let Some(dept) = roster::lookup(&triage.recommended_department) {
    let _ = writeln!(out, "  roster: {} ({})", dept.doctors.join(", "), dept.availability());
  }

  if !triage.estimated_consultation_time.is_empty() {
    let _ = writeln!(out, "\nEstimated consultation: {}", triage.estimated_consultation_time);
  }
  if !triage.self_care_advice.is_empty() {
    let _ = writeln!(out, "\nSelf-care\n  {}", triage.self_care_advice);
  }
  if !triage.ayurvedic_suggestions.is_empty() {
    let _ = writeln!(
      out,
      "\nAyurvedic suggestions (complementary)\n  {}",
      triage.ayurvedic_suggestions
    );
  }
  out
}
