use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TriageError};
use crate::intake::IntakeData;
use crate::triage::response::TriageResponse;

const MAX_ID_ATTEMPTS: usize = 1000;
const ID_SPACE: u32 = 100_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordStatus {
  Critical,
  Urgent,
  Stable,
}

impl RecordStatus {
  /// Red flags make a record critical; otherwise any highly probable
  /// condition makes it urgent.
  pub fn classify(triage: &TriageResponse) -> Self {
    if triage.has_red_flags() {
      RecordStatus::Critical
    } else if triage.has_high_probability() {
      RecordStatus::Urgent
    } else {
      RecordStatus::Stable
    }
  }
}

impl std::fmt::Display for RecordStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{self:?}")
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
  pub id: String,
  /// Milliseconds since the Unix epoch.
  pub timestamp: i64,
  pub status: RecordStatus,
  pub intake: IntakeData,
  pub triage: TriageResponse,
}

/// All saved records in one JSON array, newest first.
pub struct RecordStore {
  path: PathBuf,
  prefix: String,
  records: Vec<PatientRecord>,
}

struct StoreLock(File);

impl Drop for StoreLock {
  fn drop(&mut self) {
    let _ = self.0.unlock();
  }
}

impl RecordStore {
  pub fn open(path: &Path, prefix: &str) -> Result<Self> {
    let records = read_records(path)?;
    info!("records: {}", records.len());
    Ok(Self {
      path: path.to_path_buf(),
      prefix: prefix.to_string(),
      records,
    })
  }

  pub fn all(&self) -> &[PatientRecord] {
    &self.records
  }

  pub fn get(&self, id: &str) -> Result<&PatientRecord> {
    self
      .records
      .iter()
      .find(|r| r.id.eq_ignore_ascii_case(id.trim()))
      .ok_or_else(|| TriageError::RecordNotFound(id.to_string()))
  }

  /// Prepends a record built from a finished triage. The file is re-read
  /// under the lock so concurrent writers do not drop each other's records.
  pub fn append(&mut self, intake: &IntakeData, triage: &TriageResponse) -> Result<PatientRecord> {
    let _lock = self.lock()?;
    self.records = read_records(&self.path)?;

    let record = PatientRecord {
      id: self.fresh_id()?,
      timestamp: Utc::now().timestamp_millis(),
      status: RecordStatus::classify(triage),
      intake: intake.clone(),
      triage: triage.clone(),
    };
    self.records.insert(0, record.clone());
    self.write()?;

    info!("saved record {} ({})", record.id, record.status);
    Ok(record)
  }

  fn fresh_id(&self) -> Result<String> {
    for _ in 0..MAX_ID_ATTEMPTS {
      let bytes = uuid::Uuid::new_v4().into_bytes();
      let n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % ID_SPACE;
      let id = format!("{}-{n}", self.prefix);
      if !self.records.iter().any(|r| r.id == id) {
        return Ok(id);
      }
    }
    Err(TriageError::State(format!(
      "no free record id under prefix {}",
      self.prefix
    )))
  }

  fn lock(&self) -> Result<StoreLock> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
      .create(true)
      .truncate(false)
      .write(true)
      .open(self.path.with_extension("lock"))?;
    file.lock_exclusive()?;
    Ok(StoreLock(file))
  }

  fn write(&self) -> Result<()> {
    let tmp = self.path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(&self.records)?;
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

fn read_records(path: &Path) -> Result<Vec<PatientRecord>> {
  if !path.exists() {
    return Ok(Vec::new());
  }
  let content = std::fs::read_to_string(path)?;
  if content.trim().is_empty() {
    return Ok(Vec::new());
  }
  match serde_json::from_str(&content) {
    Ok(records) => Ok(records),
    Err(e) => {
      warn!("failed to load records from {}: {e}", path.display());
      Ok(Vec::new())
    }
  }
}
