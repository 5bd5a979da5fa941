use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{
    AttemptId, CourseCompletion, CourseId, OptionDefinition, OptionId, QuestionDefinition,
    QuestionId, QuizDefinition, QuizId, UserCourseId, UserId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    user_id: UserId,
    passing_score: u8,
    completions: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidUserId { raw: String },
    InvalidPassingScore { raw: String },
    InvalidCompletions { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidPassingScore { raw } => {
                write!(f, "invalid --passing-score value (expected 0-100): {raw}")
            }
            ArgsError::InvalidCompletions { raw } => {
                write!(f, "invalid --completions value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut course_id = std::env::var("LMS_COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut user_id = std::env::var("LMS_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut passing_score = 80_u8;
        let mut completions = 2_u32;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    course_id = CourseId::new(parsed);
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = UserId::new(parsed);
                }
                "--passing-score" => {
                    let value = require_value(&mut args, "--passing-score")?;
                    let parsed = value
                        .parse::<u8>()
                        .ok()
                        .filter(|score| *score <= 100)
                        .ok_or_else(|| ArgsError::InvalidPassingScore { raw: value.clone() })?;
                    passing_score = parsed;
                }
                "--completions" => {
                    let value = require_value(&mut args, "--completions")?;
                    completions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCompletions { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            user_id,
            passing_score,
            completions,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --course-id <id>          Course to attach the sample quiz to (default: 1)");
    eprintln!("  --user-id <id>            User to attribute sample completions to (default: 1)");
    eprintln!("  --passing-score <0-100>   Passing score for the sample quiz (default: 80)");
    eprintln!("  --completions <n>         Number of sample completions to append (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_COURSE_ID, LMS_USER_ID");
}

fn sample_quiz(passing_score: u8) -> Result<QuizDefinition, Box<dyn std::error::Error>> {
    let samples = [
        ("q1", "2 + 2?", [("a", "3", false), ("b", "4", true), ("c", "5", false)]),
        (
            "q2",
            "Capital of France?",
            [("a", "Paris", true), ("b", "Lyon", false), ("c", "Nice", false)],
        ),
        (
            "q3",
            "Largest planet in the solar system?",
            [("a", "Earth", false), ("b", "Mars", false), ("c", "Jupiter", true)],
        ),
    ];

    let mut questions = Vec::with_capacity(samples.len());
    for (id, text, options) in samples {
        let options = options
            .into_iter()
            .map(|(oid, otext, correct)| {
                OptionDefinition::new(OptionId::new(oid), otext, correct)
            })
            .collect();
        questions.push(QuestionDefinition::new(QuestionId::new(id), text, options)?);
    }

    Ok(QuizDefinition::new(QuizId::new(1), passing_score, questions)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let quiz = sample_quiz(args.passing_score)?;
    storage.quizzes.upsert_quiz(args.course_id, &quiz).await?;

    for i in 0..args.completions {
        let completed_at = now - Duration::days(i64::from(i) * 3);
        let completion = CourseCompletion::from_persisted(
            args.user_id,
            UserCourseId::new(u64::from(i + 1)),
            args.course_id,
            AttemptId::generate(),
            args.passing_score.saturating_add((i % 3) as u8 * 5).min(100),
            true,
            completed_at,
        )?;
        let _ = storage.completions.record_completion(&completion).await?;
    }

    println!(
        "Seeded course {} with a {}-question quiz and {} completions into {}",
        args.course_id.value(),
        quiz.question_count(),
        args.completions,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
