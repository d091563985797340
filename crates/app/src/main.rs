use std::fmt;
use std::sync::Arc;

use exam_core::model::{
    ExamId, ExamResult, QuestionOutcome, ScoreBand, format_duration_minutes, format_elapsed,
    format_score,
};
use services::sessions::{Key, KeyPress};
use services::{
    AppServices, Clock, HostCommand, MockQuestionSource, NoticeLevel, OpenOutcome, SessionConfig,
    SessionIntent, SessionView, spawn_session,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingExamId,
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingExamId => write!(f, "an exam id is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid exam id: {raw:?}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take <exam-id> [--db <sqlite_url>] [--seed <n>]");
    eprintln!("  cargo run -p app -- drafts show <exam-id> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- drafts clear <exam-id> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- drafts clear-all [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:exam.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_AUTOSAVE_SECS, EXAM_WARNING_AT_SECS, EXAM_STORAGE_PREFIX, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Take { exam_id: ExamId },
    ShowDraft { exam_id: ExamId },
    ClearDraft { exam_id: ExamId },
    ClearAllDrafts,
}

struct Args {
    command: Command,
    db_url: String,
    seed: Option<u64>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut positional = Vec::new();
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let mut seed = None;

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = match positional.iter().map(String::as_str).collect::<Vec<_>>()[..] {
            ["take", id] => Command::Take {
                exam_id: parse_exam_id(id)?,
            },
            ["drafts", "show", id] => Command::ShowDraft {
                exam_id: parse_exam_id(id)?,
            },
            ["drafts", "clear", id] => Command::ClearDraft {
                exam_id: parse_exam_id(id)?,
            },
            ["drafts", "clear-all"] => Command::ClearAllDrafts,
            ["take"] | ["drafts", "show" | "clear"] => return Err(ArgsError::MissingExamId),
            _ => {
                return Err(ArgsError::UnknownArg(positional.join(" ")));
            }
        };

        Ok(Self {
            command,
            db_url,
            seed,
        })
    }
}

fn parse_exam_id(raw: &str) -> Result<ExamId, ArgsError> {
    ExamId::new(raw).map_err(|_| ArgsError::InvalidExamId {
        raw: raw.to_string(),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

// ─── TERMINAL INPUT ──────────────────────────────────────────────────────────

enum Input {
    Send(HostCommand),
    Show,
    Help,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let key = |key| Input::Send(HostCommand::Key(KeyPress::new(key)));

    match line {
        "n" | "next" | ">" => key(Key::ArrowRight),
        "p" | "prev" | "<" => key(Key::ArrowLeft),
        "submit" => Input::Send(HostCommand::Intent(SessionIntent::Submit)),
        "restore" => Input::Send(HostCommand::RestoreDraft),
        "discard" => Input::Send(HostCommand::DiscardDraft),
        "save" => Input::Send(HostCommand::Autosave),
        "pause" => Input::Send(HostCommand::PauseTimer),
        "resume" => Input::Send(HostCommand::ResumeTimer),
        "" | "show" => Input::Show,
        "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => {
            if let Some(number) = line.strip_prefix("g ").or_else(|| line.strip_prefix("goto ")) {
                return match number.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Input::Send(HostCommand::Intent(SessionIntent::GoTo(n - 1))),
                    _ => Input::Unknown,
                };
            }
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => key(Key::Character(c)),
                _ => Input::Unknown,
            }
        }
    }
}

/// Only an explicit yes leaves an unsubmitted exam.
fn confirms_leave(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_input_help() {
    println!("  a-d      select an option        f        flag / unflag");
    println!("  n, >     next question           p, <     previous question");
    println!("  g <n>    go to question n        ?        shortcut help");
    println!("  pause    pause the timer         resume   resume the timer");
    println!("  restore  restore saved draft     discard  discard saved draft");
    println!("  save     save a draft now        submit   submit the exam");
    println!("  show     redraw                  quit     leave (answers are kept as a draft)");
}

// ─── RENDERING ───────────────────────────────────────────────────────────────

fn print_view(view: &SessionView) {
    let Some(progress) = &view.progress else {
        return;
    };
    let timer = if view.timer_running {
        view.clock_text.clone()
    } else {
        format!("{} (paused)", view.clock_text)
    };
    println!();
    println!(
        "[{timer}] question {}/{} | answered {} | flagged {}",
        progress.current_index + 1,
        progress.total,
        progress.answered,
        progress.flagged
    );

    if let Some(question) = &view.current_question {
        let flag = if view.current_flagged { " [flagged]" } else { "" };
        println!("{}{flag}", question.prompt());
        for option in question.options() {
            println!("  {}) {}", option.id, option.text);
        }
    }

    if let Some(answered) = view.draft_offered {
        println!("A saved draft with {answered} answer(s) exists. Type `restore` or `discard`.");
    }
}

fn print_result(result: &ExamResult) {
    let score = result.score();
    let answered = score.correct + score.incorrect;
    println!();
    println!("Exam {} submitted.", result.exam_id());
    println!(
        "Score: {} ({} / {} points) - {}",
        format_score(score.correct, result.questions().len()),
        score.total_points,
        score.max_points,
        ScoreBand::from_percentage(score.percentage).label()
    );
    println!(
        "Correct {} | incorrect {} | skipped {} | answered {answered}",
        score.correct, score.incorrect, score.skipped
    );
    println!("Time: {}", format_elapsed(result.elapsed_seconds()));

    for (question, outcome) in result.questions().iter().zip(result.outcomes()) {
        let mark = match outcome {
            QuestionOutcome::Correct => "ok",
            QuestionOutcome::Incorrect => "x",
            QuestionOutcome::Skipped => "-",
        };
        let selected = result
            .answers()
            .get(&question.id())
            .map_or("-", |o| o.as_str());
        println!(
            "  {:>3} {:>2}  chose {selected}, correct {}",
            question.id(),
            mark,
            question.correct()
        );
    }
}

// ─── COMMANDS ────────────────────────────────────────────────────────────────

async fn take(services: AppServices, exam_id: ExamId) -> Result<(), Box<dyn std::error::Error>> {
    let meta = services.questions().exam_meta(&exam_id).await?;
    let (host, outcome) = services.open_exam(&exam_id).await?;
    println!(
        "Exam {exam_id}: {} questions, {}.",
        meta.question_count,
        format_duration_minutes(meta.duration_minutes)
    );
    if outcome == OpenOutcome::AlreadyActive {
        return Ok(());
    }
    println!("Type `help` for commands.");

    let mut handle = spawn_session(host);
    if let Some(mut notices) = handle.take_notices() {
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                let label = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warning",
                };
                println!("[{label}] {}", notice.message);
            }
        });
    }

    print_view(&handle.current());

    let mut view = handle.view();
    let mut results = handle.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Input::Send(command) => {
                        view.borrow_and_update();
                        handle.send(command).await?;
                        if view.changed().await.is_ok() {
                            print_view(&view.borrow_and_update());
                        }
                    }
                    Input::Show => print_view(&handle.current()),
                    Input::Help => print_input_help(),
                    Input::Quit => {
                        if !handle.current().warn_on_unload {
                            break;
                        }
                        println!("The exam is not submitted. Leave anyway? Answers are kept as a draft. [y/N]");
                        let answer = lines.next_line().await?.unwrap_or_default();
                        if confirms_leave(&answer) {
                            break;
                        }
                        println!("Staying in the exam.");
                    }
                    Input::Unknown => println!("Unrecognized input. Type `help` for commands."),
                }
            }
            submitted = results.wait_for(|v| v.result.is_some()) => {
                submitted?;
                break;
            }
        }
    }

    let last = handle.current();
    let host = handle.shutdown().await?;
    match last.result.or_else(|| host.controller().last_result().cloned()) {
        Some(result) => print_result(&result),
        None if host.controller().session().is_some_and(|s| !s.answers().is_empty()) => {
            println!("Leaving unsubmitted. Your answers were saved as a draft.");
        }
        None => {}
    }
    Ok(())
}

async fn show_draft(services: &AppServices, exam_id: &ExamId) {
    match services.drafts().load(exam_id).await {
        Some(draft) => {
            let saved = draft
                .saved_at()
                .map_or_else(|| "unknown time".to_string(), |t| t.to_rfc3339());
            println!("Draft for {exam_id}, saved {saved}:");
            for (question, option) in &draft.answers {
                println!("  {question}: {option}");
            }
        }
        None => println!("No draft for {exam_id}."),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let config = SessionConfig::from_env();
    let mut services =
        AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), config).await?;
    if let Some(seed) = parsed.seed {
        services = services.with_question_source(Arc::new(MockQuestionSource::new().with_seed(seed)));
    }

    match parsed.command {
        Command::Take { exam_id } => take(services, exam_id).await,
        Command::ShowDraft { exam_id } => {
            show_draft(&services, &exam_id).await;
            Ok(())
        }
        Command::ClearDraft { exam_id } => {
            services.drafts().clear(&exam_id).await;
            println!("Draft for {exam_id} cleared.");
            Ok(())
        }
        Command::ClearAllDrafts => {
            let removed = services.drafts().clear_all().await;
            info!(removed, "cleared stored drafts");
            println!("Removed {removed} stored entries.");
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_take_with_flags() {
        let parsed = Args::parse(args(&["take", "biologija-2024", "--db", "sqlite::memory:", "--seed", "9"]))
            .unwrap();
        assert_eq!(
            parsed.command,
            Command::Take {
                exam_id: ExamId::new("biologija-2024").unwrap()
            }
        );
        assert_eq!(parsed.db_url, "sqlite::memory:");
        assert_eq!(parsed.seed, Some(9));
    }

    #[test]
    fn parses_draft_commands() {
        let parsed = Args::parse(args(&["drafts", "clear-all"])).unwrap();
        assert_eq!(parsed.command, Command::ClearAllDrafts);
        assert!(matches!(
            Args::parse(args(&["drafts", "show"])),
            Err(ArgsError::MissingExamId)
        ));
        assert!(matches!(
            Args::parse(args(&["take", "x", "--seed", "nope"])),
            Err(ArgsError::InvalidSeed { .. })
        ));
    }

    #[test]
    fn terminal_input_maps_to_commands() {
        assert!(matches!(
            parse_input("g 3"),
            Input::Send(HostCommand::Intent(SessionIntent::GoTo(2)))
        ));
        assert!(matches!(
            parse_input("B"),
            Input::Send(HostCommand::Key(KeyPress { key: Key::Character('B'), .. }))
        ));
        assert!(matches!(parse_input("g 0"), Input::Unknown));
        assert!(matches!(parse_input("quit"), Input::Quit));
    }

    #[test]
    fn leaving_unsubmitted_exam_needs_explicit_yes() {
        assert!(confirms_leave("y"));
        assert!(confirms_leave(" YES \n"));
        assert!(!confirms_leave(""));
        assert!(!confirms_leave("n"));
        assert!(!confirms_leave("quit"));
    }
}
