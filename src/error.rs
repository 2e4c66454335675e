use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
  #[error("config error: {0}")]
  Config(String),

  #[error("config file not found: {0}")]
  ConfigNotFound(PathBuf),

  #[error("model error: {0}")]
  Model(String),

  #[error("malformed model output: {0}")]
  MalformedOutput(String),

  #[error("timeout: {0}")]
  Timeout(String),

  #[error("state error: {0}")]
  State(String),

  #[error("invalid answers: {0}")]
  InvalidAnswers(String),

  #[error("invalid intake: {0}")]
  InvalidIntake(String),

  #[error("record not found: {0}")]
  RecordNotFound(String),

  #[error("session not found: {0}")]
  SessionNotFound(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
