mod config;
mod error;
mod intake;
mod llm;
mod prompt;
mod records;
mod roster;
mod triage;
mod voice;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crate::config::{Config, Language};
use crate::error::{Result, TriageError};
use crate::intake::IntakeData;
use crate::llm::client::GeminiClient;
use crate::records::portal;
use crate::records::store::RecordStore;
use crate::records::twin::DigitalTwin;
use crate::triage::answers::AnswerSheet;
use crate::triage::response::McqQuestion;
use crate::triage::session::{FlowState, TriageSession};
use crate::triage::store::SessionStore;

#[derive(Parser)]
#[command(
  name = "triage-desk",
  about = "Patient intake and AI-assisted triage for the hospital front desk"
)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Path to config file
  #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
  config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
  /// Submit an intake file and start a triage session
  Start {
    /// Intake YAML file
    intake: PathBuf,
    /// English, Hindi or Hinglish
    #[arg(long)]
    language: Option<Language>,
    /// Accept the disclaimer without prompting
    #[arg(long)]
    yes: bool,
    /// Resubmit into an existing session instead of opening a new one
    #[arg(long)]
    session: Option<String>,
  },
  /// Answer the pending questions of a session, e.g. Q1=A Q2=B,C
  Answer {
    /// Session ID
    id: String,
    #[arg(required = true)]
    answers: Vec<String>,
  },
  /// Resubmit the intake of a session whose model call failed
  Retry {
    /// Session ID
    id: String,
  },
  /// Run the whole triage interactively on the terminal
  Triage {
    /// Intake YAML file
    intake: PathBuf,
    #[arg(long)]
    language: Option<Language>,
    #[arg(long)]
    yes: bool,
  },
  /// List sessions that have not produced a final report
  Sessions,
  /// Return a session to an empty intake, or delete it with --discard
  Reset {
    /// Session ID
    id: String,
    #[arg(long)]
    discard: bool,
  },
  /// Doctor portal: list all saved records
  Records,
  /// Doctor portal: show the triage detail of a record
  Show {
    /// Record ID
    id: String,
  },
  /// Show a patient's digital twin
  Twin {
    /// Patient email
    email: String,
  },
  /// Fill an intake file from a spoken transcript
  Voice {
    /// Intake YAML file, created if missing
    intake: PathBuf,
    /// Transcript text
    transcript: String,
  },
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  if let Err(e) = run(cli).await {
    error!("{e}");
    std::process::exit(1);
  }
}

async fn run(cli: Cli) -> Result<()> {
  let config = Config::load_or_default(&cli.config)?;

  match cli.command {
    Commands::Start {
      intake,
      language,
      yes,
      session,
    } => cmd_start(&config, &intake, language, yes, session.as_deref()).await,
    Commands::Answer { id, answers } => cmd_answer(&config, &id, &answers).await,
    Commands::Retry { id } => cmd_retry(&config, &id).await,
    Commands::Triage {
      intake,
      language,
      yes,
    } => cmd_triage(&config, &intake, language, yes).await,
    Commands::Sessions => cmd_sessions(&config),
    Commands::Reset { id, discard } => cmd_reset(&config, &id, discard),
    Commands::Records => cmd_records(&config),
    Commands::Show { id } => cmd_show(&config, &id),
    Commands::Twin { email } => cmd_twin(&config, &email),
    Commands::Voice { intake, transcript } => cmd_voice(&config, &intake, transcript).await,
  }
}

enum Action {
  Intake(IntakeData),
  Answers(AnswerSheet),
  Retry,
}

/// Runs one model-backed step off the async runtime. The blocking HTTP
/// client is created and dropped inside the worker thread. A client that
/// cannot be built fails the step before the session is touched.
async fn advance(
  config: &Config,
  mut session: TriageSession,
  action: Action,
) -> Result<(TriageSession, Result<FlowState>)> {
  let config = config.clone();
  tokio::task::spawn_blocking(move || -> Result<(TriageSession, Result<FlowState>)> {
    let client = GeminiClient::from_config(&config)?;
    let outcome = match action {
      Action::Intake(intake) => session.submit_intake(&client, intake),
      Action::Answers(sheet) => session.submit_answers(&client, &sheet),
      Action::Retry => session.retry(&client),
    };
    Ok((session, outcome))
  })
  .await
  .map_err(|e| TriageError::State(format!("spawn_blocking: {e}")))?
}

fn confirm_disclaimer(yes: bool) -> Result<()> {
  println!("{}\n", prompt::DISCLAIMER);
  if yes {
    return Ok(());
  }
  let answer = read_line("I understand and agree [y/N]: ")?;
  if answer.trim().eq_ignore_ascii_case("y") || answer.trim().eq_ignore_ascii_case("yes") {
    Ok(())
  } else {
    Err(TriageError::State("disclaimer not accepted".into()))
  }
}

fn read_line(prompt: &str) -> Result<String> {
  print!("{prompt}");
  std::io::stdout().flush()?;
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  Ok(line)
}

fn print_questions(questions: &[McqQuestion]) {
  for q in questions {
    let kind = if q.allow_multiple {
      "choose one or more"
    } else {
      "choose one"
    };
    println!("{} {} ({kind})", q.id, q.question);
    for (key, text) in &q.options {
      println!("    {key}) {text}");
    }
  }
}

fn print_outcome(session: &TriageSession) {
  match session.state() {
    FlowState::McqEntry => {
      println!("Session {}: please answer these questions.\n", session.id);
      print_questions(session.pending_questions());
      println!("\nAnswer with: triage-desk answer {} Q1=A Q2=B,C", session.id);
    }
    FlowState::Clarifying => {
      println!("Session {}: additional clarification needed.\n", session.id);
      print_questions(session.pending_questions());
      println!("\nAnswer with: triage-desk answer {} CQ1=A", session.id);
    }
    FlowState::Completed => {
      if let Some(report) = session.report() {
        println!("{}", portal::render_report(session.intake(), report));
      }
      if let Some(id) = session.record_id() {
        println!("Saved as record {id}");
      }
    }
    FlowState::Intake => {
      println!(
        "Session {}: please complete these intake fields: {}",
        session.id,
        session.missing_fields().join(", ")
      );
      println!(
        "Then run: triage-desk start <intake.yaml> --session {}",
        session.id
      );
    }
    FlowState::Error => {
      println!(
        "Session {}: a connection error occurred ({}). Run `triage-desk retry {}`.",
        session.id,
        session.last_error().unwrap_or("unknown"),
        session.id
      );
    }
    FlowState::AnalyzingIntake | FlowState::AnalyzingMcq => {
      println!("Session {} is still being analysed.", session.id);
    }
  }
}

async fn step(config: &Config, session: TriageSession, action: Action) -> Result<TriageSession> {
  let (mut session, outcome) = advance(config, session, action).await?;
  let mut records = RecordStore::open(&config.records_path(), &config.record_prefix)?;
  SessionStore::new(&config.sessions_path()).settle(&mut session, &mut records)?;
  match outcome {
    Ok(_) => Ok(session),
    // Model failures are kept on the session so the user can retry.
    Err(e) if session.state() == FlowState::Error => {
      warn!("session {} failed: {e}", session.id);
      Ok(session)
    }
    Err(e) => Err(e),
  }
}

async fn cmd_start(
  config: &Config,
  intake_path: &Path,
  language: Option<Language>,
  yes: bool,
  existing: Option<&str>,
) -> Result<()> {
  confirm_disclaimer(yes)?;
  let intake = IntakeData::load(intake_path)?;
  intake.validate()?;

  let session = match existing {
    Some(id) => {
      let session = SessionStore::new(&config.sessions_path()).load(id)?;
      if language.is_some_and(|l| l != session.language) {
        warn!("session {id} keeps its language {}", session.language);
      }
      session
    }
    None => {
      let session = TriageSession::new(config, language.unwrap_or(config.language));
      info!("started session {}", session.id);
      session
    }
  };
  let session = step(config, session, Action::Intake(intake)).await?;
  print_outcome(&session);
  Ok(())
}

async fn cmd_answer(config: &Config, id: &str, answers: &[String]) -> Result<()> {
  let sheet = AnswerSheet::parse(answers)?;
  let session = SessionStore::new(&config.sessions_path()).load(id)?;
  let session = step(config, session, Action::Answers(sheet)).await?;
  print_outcome(&session);
  Ok(())
}

async fn cmd_retry(config: &Config, id: &str) -> Result<()> {
  let session = SessionStore::new(&config.sessions_path()).load(id)?;
  let session = step(config, session, Action::Retry).await?;
  print_outcome(&session);
  Ok(())
}

async fn cmd_triage(
  config: &Config,
  intake_path: &Path,
  language: Option<Language>,
  yes: bool,
) -> Result<()> {
  confirm_disclaimer(yes)?;
  let intake = IntakeData::load(intake_path)?;
  intake.validate()?;

  let mut session = TriageSession::new(config, language.unwrap_or(config.language));
  println!("Analysing patient profile...");
  session = step(config, session, Action::Intake(intake)).await?;

  while session.state().awaits_answers() {
    if session.state() == FlowState::Clarifying {
      println!("\nAdditional clarification needed.");
    }
    let questions = session.pending_questions().to_vec();
    let sheet = ask(&questions)?;
    println!("Performing triage analysis...");
    session = step(config, session, Action::Answers(sheet)).await?;
  }

  print_outcome(&session);
  Ok(())
}

fn ask(questions: &[McqQuestion]) -> Result<AnswerSheet> {
  let mut sheet = AnswerSheet::new();
  for q in questions {
    loop {
      print_questions(std::slice::from_ref(q));
      let line = read_line("> ")?;
      let keys: Vec<&str> = line
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();

      let mut candidate = AnswerSheet::new();
      candidate.select(&q.id, &keys);
      match candidate.validate(std::slice::from_ref(q)) {
        Ok(()) => {
          sheet.select(&q.id, &keys);
          break;
        }
        Err(e) => println!("{e}"),
      }
    }
  }
  Ok(sheet)
}

fn cmd_sessions(config: &Config) -> Result<()> {
  let pending = SessionStore::new(&config.sessions_path()).list_pending()?;

  if pending.is_empty() {
    println!("No open sessions.");
    return Ok(());
  }

  for s in &pending {
    let name = s.intake().map(|i| i.full_name.as_str()).unwrap_or("-");
    println!(
      "{}  {:?}  {}  {} question(s) pending, {} clarification round(s), {} turn(s)  ({})",
      s.id,
      s.state(),
      name,
      s.pending_questions().len(),
      s.clarification_rounds(),
      s.turns(),
      s.updated_at.format("%Y-%m-%d %H:%M")
    );
  }
  Ok(())
}

fn cmd_reset(config: &Config, id: &str, discard: bool) -> Result<()> {
  let sessions = SessionStore::new(&config.sessions_path());
  if discard {
    sessions.remove(id)?;
    println!("Discarded session {id}.");
    return Ok(());
  }

  let mut session = sessions.load(id)?;
  session.reset();
  sessions.save(&session)?;
  println!("Session {id} is back at intake.");
  println!("Resubmit with: triage-desk start <intake.yaml> --session {id}");
  Ok(())
}

fn cmd_records(config: &Config) -> Result<()> {
  let store = RecordStore::open(&config.records_path(), &config.record_prefix)?;
  let records = store.all();

  println!("Doctor portal");
  println!("=============");
  println!("{}", portal::summary(records));
  println!();

  if records.is_empty() {
    println!("No records found.");
    return Ok(());
  }
  for row in portal::list(records) {
    println!("  {row}");
  }
  Ok(())
}

fn cmd_show(config: &Config, id: &str) -> Result<()> {
  let store = RecordStore::open(&config.records_path(), &config.record_prefix)?;
  println!("{}", portal::detail(store.get(id)?));
  Ok(())
}

fn cmd_twin(config: &Config, email: &str) -> Result<()> {
  let store = RecordStore::open(&config.records_path(), &config.record_prefix)?;
  match DigitalTwin::build(store.all(), email) {
    Some(twin) => print!("{twin}"),
    None => println!("No medical history found for {}.", email.trim()),
  }
  Ok(())
}

async fn cmd_voice(config: &Config, intake_path: &Path, transcript: String) -> Result<()> {
  let mut intake = if intake_path.exists() {
    IntakeData::load(intake_path)?
  } else {
    IntakeData::default()
  };

  let config_clone = config.clone();
  let fields = tokio::task::spawn_blocking(move || {
    let client = GeminiClient::from_config(&config_clone)?;
    voice::parse_transcript(&client, &config_clone, &transcript)
  })
  .await
  .map_err(|e| TriageError::State(format!("spawn_blocking: {e}")))??;

  if fields.is_empty() {
    println!("Could not extract any intake fields from the transcript.");
    return Ok(());
  }

  intake.merge_voice(fields);
  intake.save(intake_path)?;

  let missing = intake.missing_required();
  println!("Updated {}", intake_path.display());
  if !missing.is_empty() {
    println!("Still missing: {}", missing.join(", "));
  }
  Ok(())
}
