use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TriageError};

pub const DEFAULT_CONFIG_PATH: &str = "triage-desk.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  /// Relative paths are resolved against `data_dir`.
  #[serde(default = "default_records_file")]
  pub records_file: PathBuf,
  #[serde(default = "default_sessions_dir")]
  pub sessions_dir: PathBuf,
  #[serde(default)]
  pub language: Language,
  #[serde(default = "default_record_prefix")]
  pub record_prefix: String,
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
  #[serde(default)]
  pub models: ModelSettings,
  #[serde(default)]
  pub temperatures: TemperatureSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
  #[serde(default = "default_model")]
  pub triage: String,
  #[serde(default = "default_model")]
  pub voice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureSettings {
  #[serde(default = "default_triage_temperature")]
  pub triage: f32,
  #[serde(default = "default_voice_temperature")]
  pub voice: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub enum Language {
  #[default]
  English,
  Hindi,
  Hinglish,
}

impl std::fmt::Display for Language {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Language::English => "English",
      Language::Hindi => "Hindi",
      Language::Hinglish => "Hinglish",
    };
    f.write_str(name)
  }
}

impl std::str::FromStr for Language {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "english" | "en" => Ok(Language::English),
      "hindi" | "hi" => Ok(Language::Hindi),
      "hinglish" => Ok(Language::Hinglish),
      _ => Err(format!("unknown language: {s}")),
    }
  }
}

/// Config files take the same spellings as `--language`.
impl<'de> Deserialize<'de> for Language {
  fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
    let s = String::deserialize(d)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      records_file: default_records_file(),
      sessions_dir: default_sessions_dir(),
      language: Language::default(),
      record_prefix: default_record_prefix(),
      api_key_env: default_api_key_env(),
      endpoint: default_endpoint(),
      request_timeout_secs: default_request_timeout(),
      models: ModelSettings::default(),
      temperatures: TemperatureSettings::default(),
    }
  }
}

impl Default for ModelSettings {
  fn default() -> Self {
    Self {
      triage: default_model(),
      voice: default_model(),
    }
  }
}

impl Default for TemperatureSettings {
  fn default() -> Self {
    Self {
      triage: default_triage_temperature(),
      voice: default_voice_temperature(),
    }
  }
}

fn default_data_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
    .join(".triage-desk")
}
fn default_records_file() -> PathBuf {
  PathBuf::from("records.json")
}
fn default_sessions_dir() -> PathBuf {
  PathBuf::from("sessions")
}
fn default_record_prefix() -> String {
  "JCJH".to_string()
}
fn default_api_key_env() -> String {
  "GEMINI_API_KEY".to_string()
}
fn default_endpoint() -> String {
  "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_request_timeout() -> u64 {
  60
}
fn default_model() -> String {
  "flash".to_string()
}
fn default_triage_temperature() -> f32 {
  0.2
}
fn default_voice_temperature() -> f32 {
  0.1
}

impl Config {
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(TriageError::ConfigNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Falls back to built-in defaults when the default config path is absent.
  pub fn load_or_default(path: &Path) -> Result<Self> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
      return Ok(Self::default());
    }
    Self::load(path)
  }

  fn validate(&self) -> Result<()> {
    if self.record_prefix.trim().is_empty() {
      return Err(TriageError::Config("record_prefix must not be empty".into()));
    }
    if self.request_timeout_secs == 0 {
      return Err(TriageError::Config(
        "request_timeout_secs must be positive".into(),
      ));
    }
    for (name, t) in [
      ("triage", self.temperatures.triage),
      ("voice", self.temperatures.voice),
    ] {
      if !(0.0..=2.0).contains(&t) {
        return Err(TriageError::Config(format!(
          "temperatures.{name} must be within 0..=2, got {t}"
        )));
      }
    }
    Ok(())
  }

  pub fn records_path(&self) -> PathBuf {
    self.data_dir.join(&self.records_file)
  }

  pub fn sessions_path(&self) -> PathBuf {
    self.data_dir.join(&self.sessions_dir)
  }

  pub fn api_key(&self) -> Result<String> {
    std::env::var(&self.api_key_env)
      .map_err(|_| TriageError::Config(format!("{} is not set", self.api_key_env)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.language, Language::English);
    assert_eq!(config.record_prefix, "JCJH");
    assert_eq!(config.models.triage, "flash");
    assert!((config.temperatures.triage - 0.2).abs() < f32::EPSILON);
    assert!((config.temperatures.voice - 0.1).abs() < f32::EPSILON);
    assert!(config.records_path().ends_with(".triage-desk/records.json"));
  }

  #[test]
  fn test_load_partial_yaml() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "data_dir: /tmp/desk\nlanguage: Hinglish\nmodels:\n  triage: pro").unwrap();

    let config = Config::load(tmp.path()).unwrap();
    assert_eq!(config.language, Language::Hinglish);
    assert_eq!(config.models.triage, "pro");
    assert_eq!(config.models.voice, "flash");
    assert_eq!(config.sessions_path(), PathBuf::from("/tmp/desk/sessions"));
  }

  #[test]
  fn test_rejects_out_of_range_temperature() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "temperatures:\n  triage: 3.5").unwrap();

    let err = Config::load(tmp.path()).unwrap_err();
    assert!(matches!(err, TriageError::Config(_)));
  }

  #[test]
  fn test_language_spellings_match_cli() {
    for (text, expected) in [
      ("english", Language::English),
      ("HI", Language::Hindi),
      ("hinglish", Language::Hinglish),
      ("Hindi", Language::Hindi),
    ] {
      let mut tmp = tempfile::NamedTempFile::new().unwrap();
      writeln!(tmp, "language: {text}").unwrap();
      assert_eq!(Config::load(tmp.path()).unwrap().language, expected);
    }
  }

  #[test]
  fn test_unknown_language_is_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "language: Klingon").unwrap();

    assert!(matches!(
      Config::load(tmp.path()).unwrap_err(),
      TriageError::Yaml(_)
    ));
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let err = Config::load_or_default(Path::new("/nonexistent/desk.yaml")).unwrap_err();
    assert!(matches!(err, TriageError::ConfigNotFound(_)));
  }

  #[test]
  fn test_language_from_str() {
    assert_eq!("hinglish".parse::<Language>().unwrap(), Language::Hinglish);
    assert_eq!(" Hindi ".parse::<Language>().unwrap(), Language::Hindi);
    assert!("french".parse::<Language>().is_err());
  }
}
