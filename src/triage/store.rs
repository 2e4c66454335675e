use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, TriageError};
use crate::records::store::RecordStore;
use crate::triage::session::TriageSession;

/// Sessions on disk, one YAML file per session id.
pub struct SessionStore {
  dir: PathBuf,
}

impl SessionStore {
  pub fn new(dir: &Path) -> Self {
    Self {
      dir: dir.to_path_buf(),
    }
  }

  /// Session ids are UUIDs. Anything else never names a file, so ids
  /// cannot reach outside the sessions directory.
  fn path(&self, id: &str) -> Result<PathBuf> {
    let uuid = uuid::Uuid::parse_str(id.trim())
      .map_err(|_| TriageError::SessionNotFound(id.to_string()))?;
    Ok(self.dir.join(format!("{}.yaml", uuid.hyphenated())))
  }

  pub fn save(&self, session: &TriageSession) -> Result<()> {
    let path = self.path(&session.id)?;
    std::fs::create_dir_all(&self.dir)?;
    let content = serde_yaml::to_string(session)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn load(&self, id: &str) -> Result<TriageSession> {
    let path = self.path(id)?;
    if !path.exists() {
      return Err(TriageError::SessionNotFound(id.to_string()));
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  pub fn remove(&self, id: &str) -> Result<()> {
    let path = self.path(id)?;
    if !path.exists() {
      return Err(TriageError::SessionNotFound(id.to_string()));
    }
    std::fs::remove_file(&path)?;
    info!("removed session file: {}", path.display());
    Ok(())
  }

  /// Persists the session. The first time it is seen Completed its record is
  /// appended and the record id saved with it, so each session yields exactly
  /// one record. The session file is written before the append.
  pub fn settle(
    &self,
    session: &mut TriageSession,
    records: &mut RecordStore,
  ) -> Result<Option<String>> {
    self.save(session)?;

    if session.record_id().is_some() {
      return Ok(None);
    }
    let Some((intake, report)) = session.finished_report() else {
      return Ok(None);
    };

    let record = records.append(intake, report)?;
    session.mark_saved(&record.id);
    self.save(session)?;
    Ok(Some(record.id))
  }

  /// Every session that has not reached a final report, oldest first.
  pub fn list_pending(&self) -> Result<Vec<TriageSession>> {
    if !self.dir.exists() {
      return Ok(Vec::new());
    }

    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(&self.dir)? {
      let path = entry?.path();
      if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
        continue;
      }
      let content = std::fs::read_to_string(&path)?;
      match serde_yaml::from_str::<TriageSession>(&content) {
        Ok(session) if !session.state().is_terminal() => sessions.push(session),
        Ok(_) => {}
        Err(e) => warn!("skipping unreadable session {}: {e}", path.display()),
      }
    }

    sessions.sort_by_key(|s| s.created_at);
    Ok(sessions)
  }
}
