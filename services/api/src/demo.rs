use crate::infra::ConfiguredStore;
use chrono::{Duration, Utc};
use clap::Args;
use mindhelp::assessment::{
    AssessmentKind, AssessmentService, QuestionBank, RunReport, StepOutcome, UserId,
    WellnessLevel,
};
use mindhelp::config::AssessmentConfig;
use mindhelp::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

/// Answer key of the bundled certification bank; answering with it scores 20/20.
const BUNDLED_KEY: [usize; 20] = [1, 1, 1, 2, 2, 2, 1, 2, 1, 1, 2, 2, 1, 1, 2, 1, 2, 2, 2, 2];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Wellness answers as scale values (100, 75, 50, 25 or 0), comma separated.
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_wellness_value,
        default_values_t = [25u8, 0, 25, 0, 0]
    )]
    pub(crate) wellness: Vec<u8>,
    /// Let the wellness countdown run out after this many answers.
    #[arg(long)]
    pub(crate) expire_after: Option<usize>,
    /// Certification answers as zero-based option indices, comma separated. Defaults to the
    /// bundled answer key.
    #[arg(long, value_delimiter = ',')]
    pub(crate) certification: Vec<usize>,
    /// Skip the certification portion of the demo.
    #[arg(long)]
    pub(crate) skip_certification: bool,
    /// Persist demo results to this JSON file instead of memory.
    #[arg(long)]
    pub(crate) store_path: Option<PathBuf>,
}

pub(crate) fn parse_wellness_value(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    raw.parse::<u8>()
        .ok()
        .and_then(WellnessLevel::from_value)
        .map(WellnessLevel::value)
        .ok_or_else(|| format!("'{raw}' is not one of 100, 75, 50, 25, 0"))
}

fn wellness_option(value: u8) -> Option<usize> {
    WellnessLevel::ordered()
        .iter()
        .position(|level| level.value() == value)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        wellness,
        expire_after,
        certification,
        skip_certification,
        store_path,
    } = args;

    let config = AssessmentConfig {
        store_path,
        ..AssessmentConfig::default()
    };
    let bank = Arc::new(QuestionBank::load(&config)?);
    let store = ConfiguredStore::from_config(&config);
    println!("MindHelp assessment demo (storage: {})", store.describe());
    let service = AssessmentService::new(bank, Arc::new(store), &config);

    run_wellness(&service, &wellness, expire_after, &config)?;

    if skip_certification {
        return Ok(());
    }
    let answers = if certification.is_empty() {
        BUNDLED_KEY.to_vec()
    } else {
        certification
    };
    run_certification(&service, &answers)
}

fn run_wellness(
    service: &AssessmentService<ConfiguredStore>,
    values: &[u8],
    expire_after: Option<usize>,
    config: &AssessmentConfig,
) -> Result<(), AppError> {
    let student = UserId("demo-student".to_string());
    let start = Utc::now();

    println!("\nWellness assessment");
    let view = service.start(&student, AssessmentKind::Wellness, start);
    println!(
        "- {} questions, {} second limit",
        view.total,
        view.remaining_seconds.unwrap_or_default()
    );

    let cutoff = expire_after.unwrap_or(values.len()).min(values.len());
    let mut report = None;
    for (index, value) in values.iter().take(cutoff).enumerate() {
        let Some(option) = wellness_option(*value) else {
            continue;
        };
        let at = start + Duration::seconds(index as i64 + 1);
        match service.answer(&student, option, at) {
            Ok(step) => {
                println!("  Q{}: answered {}", index + 1, value);
                report = step.run.report;
            }
            Err(err) => {
                println!("  Q{}: rejected ({})", index + 1, err);
                return Ok(());
            }
        }
    }

    if report.is_none() {
        let deadline = start + Duration::seconds(i64::from(config.wellness_time_limit_secs));
        println!("  ...countdown runs out");
        match service.status(&student, deadline) {
            Ok(view) => report = view.report,
            Err(err) => {
                println!("  Status unavailable: {}", err);
                return Ok(());
            }
        }
    }

    match report {
        Some(RunReport::Wellness(report)) => {
            println!(
                "- Completed ({:?}) with {} of {} answered",
                report.completion.reason, report.completion.answered, report.completion.total
            );
            match report.dispatch {
                Some(dispatch) => {
                    println!(
                        "- Score {} -> {} | {} ({})",
                        dispatch.score.value(),
                        dispatch.band.label(),
                        dispatch.message.title,
                        dispatch.route
                    );
                    if dispatch.show_emergency_resources {
                        println!("- Emergency resources shown");
                    }
                }
                None => println!("- No answers recorded; nothing stored"),
            }
        }
        _ => println!("- Run did not complete"),
    }

    let sessions = service.sessions(&student)?;
    if sessions.is_empty() {
        println!("  Auto-scheduled sessions: none");
    } else {
        println!("  Auto-scheduled sessions:");
        for session in sessions {
            println!(
                "    - [{}] {} with {} at {}",
                session.priority.label(),
                session.category,
                session.counselor,
                session.slot
            );
        }
    }

    Ok(())
}

fn run_certification(
    service: &AssessmentService<ConfiguredStore>,
    answers: &[usize],
) -> Result<(), AppError> {
    let applicant = UserId("demo-helper".to_string());
    let now = Utc::now();

    println!("\nPeer helper certification");
    let view = service.start(&applicant, AssessmentKind::Certification, now);
    println!("- {} questions", view.total);

    for (index, option) in answers.iter().enumerate() {
        match service.answer(&applicant, *option, now) {
            Ok(step) => {
                if let (StepOutcome::Completed(_), Some(RunReport::Certification(report))) =
                    (step.step, step.run.report)
                {
                    println!(
                        "- {:?}: {} -> {}",
                        report.dispatch.outcome, report.dispatch.summary, report.dispatch.route
                    );
                    break;
                }
            }
            Err(err) => {
                println!("  Q{}: rejected ({})", index + 1, err);
                return Ok(());
            }
        }
    }

    match service.helper_certification(&applicant)? {
        Some(record) => println!(
            "  Helper certified at {} ({}%)",
            record.certified_at.format("%Y-%m-%d %H:%M UTC"),
            record.percentage
        ),
        None => println!("  No certification recorded"),
    }

    Ok(())
}
