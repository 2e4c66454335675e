use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const RECORDS: &str = r#"[
  {
    "id": "JCJH-204",
    "timestamp": 1700000100000,
    "status": "Critical",
    "intake": {
      "fullName": "Ravi Kumar",
      "email": "ravi@example.com",
      "age": "58",
      "sex": "Male",
      "weight": "80",
      "height": "170",
      "currentSymptoms": "Crushing chest pain radiating to the left arm"
    },
    "triage": {
      "symptom_summary": "Chest pain with radiation",
      "probable_conditions": [
        {"name": "Acute coronary syndrome", "probability": "High", "reason": "Typical radiation"}
      ],
      "red_flags": ["Chest pain suspicious of ACS"],
      "recommended_department": "Cardiology"
    }
  },
  {
    "id": "JCJH-17",
    "timestamp": 1700000000000,
    "status": "Stable",
    "intake": {
      "fullName": "Ravi Kumar",
      "email": "RAVI@example.com ",
      "age": "58",
      "sex": "Male",
      "weight": "80",
      "height": "170",
      "currentSymptoms": "Mild cough"
    },
    "triage": {
      "symptom_summary": "Mild cough",
      "probable_conditions": [
        {"name": "Common cold", "probability": "Low", "reason": "No fever"}
      ],
      "recommended_department": "General Medicine"
    }
  }
]"#;

struct Desk {
  _tmp: tempfile::TempDir,
  root: PathBuf,
}

impl Desk {
  fn new() -> Self {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let config = format!(
      "data_dir: {}\napi_key_env: TRIAGE_DESK_TEST_KEY_UNSET\n",
      root.join("data").display()
    );
    std::fs::write(root.join("triage-desk.yaml"), config).unwrap();
    Self { _tmp: tmp, root }
  }

  fn with_records(self) -> Self {
    let data = self.root.join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("records.json"), RECORDS).unwrap();
    self
  }

  fn path(&self, name: &str) -> PathBuf {
    self.root.join(name)
  }

  fn run(&self, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_triage-desk"))
      .arg("--config")
      .arg(self.path("triage-desk.yaml"))
      .args(args)
      .env_remove("TRIAGE_DESK_TEST_KEY_UNSET")
      .env("RUST_LOG", "warn")
      .current_dir(&self.root)
      .output()
      .unwrap()
  }
}

fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_intake(path: &Path, age: &str) {
  let yaml = format!(
    "fullName: Aditi Sharma\nemail: aditi@example.com\nage: {age}\nsex: Female\n\
     weight: 64\nheight: 160\ncurrentSymptoms: High fever for 2 days\n"
  );
  std::fs::write(path, yaml).unwrap();
}

#[test]
fn records_lists_newest_first_with_summary() {
  let desk = Desk::new().with_records();
  let out = desk.run(&["records"]);
  assert!(out.status.success());

  let text = stdout(&out);
  assert!(text.contains("total=2, critical=1, urgent=0, stable=1"));
  let first = text.find("JCJH-204").unwrap();
  let second = text.find("JCJH-17").unwrap();
  assert!(first < second);
}

#[test]
fn records_on_empty_store() {
  let desk = Desk::new();
  let out = desk.run(&["records"]);
  assert!(out.status.success());
  assert!(stdout(&out).contains("No records found."));
}

#[test]
fn show_renders_detail_and_rejects_unknown_id() {
  let desk = Desk::new().with_records();

  let out = desk.run(&["show", "jcjh-204"]);
  assert!(out.status.success());
  let text = stdout(&out);
  assert!(text.contains("Record JCJH-204 [Critical]"));
  assert!(text.contains("! Chest pain suspicious of ACS"));

  let out = desk.run(&["show", "JCJH-99999"]);
  assert_eq!(out.status.code(), Some(1));
}

#[test]
fn twin_merges_history_by_email() {
  let desk = Desk::new().with_records();

  let out = desk.run(&["twin", "  Ravi@Example.com"]);
  assert!(out.status.success());
  let text = stdout(&out);
  assert!(text.contains("Latest record: JCJH-204"));
  assert!(text.contains("Assessment history (2)"));

  let out = desk.run(&["twin", "nobody@example.com"]);
  assert!(out.status.success());
  assert!(stdout(&out).contains("No medical history found for nobody@example.com."));
}

#[test]
fn start_rejects_invalid_intake_before_calling_model() {
  let desk = Desk::new();
  let intake = desk.path("intake.yaml");
  write_intake(&intake, "abc");

  let out = desk.run(&["start", intake.to_str().unwrap(), "--yes"]);
  assert_eq!(out.status.code(), Some(1));
  assert!(!desk.path("data").join("sessions").exists());
}

#[test]
fn start_without_api_key_fails() {
  let desk = Desk::new();
  let intake = desk.path("intake.yaml");
  write_intake(&intake, "34");

  let out = desk.run(&["start", intake.to_str().unwrap(), "--yes"]);
  assert_eq!(out.status.code(), Some(1));
  assert!(stdout(&out).contains("not a doctor"));
  assert!(!desk.path("data").join("sessions").exists());
}

#[test]
fn answer_unknown_session_fails() {
  let desk = Desk::new();
  let out = desk.run(&["answer", "missing", "Q1=A"]);
  assert_eq!(out.status.code(), Some(1));
}

#[test]
fn reset_refuses_paths_outside_sessions_dir() {
  let desk = Desk::new();
  let victim = desk.path("intake.yaml");
  write_intake(&victim, "34");

  let out = desk.run(&["reset", "../../intake", "--discard"]);
  assert_eq!(out.status.code(), Some(1));
  assert!(victim.exists());
}

#[test]
fn sessions_empty() {
  let desk = Desk::new();
  let out = desk.run(&["sessions"]);
  assert!(out.status.success());
  assert!(stdout(&out).contains("No open sessions."));
}

#[test]
fn missing_explicit_config_fails() {
  let out = Command::new(env!("CARGO_BIN_EXE_triage-desk"))
    .args(["--config", "/nonexistent/triage.yaml", "records"])
    .output()
    .unwrap();
  assert_eq!(out.status.code(), Some(1));
}
