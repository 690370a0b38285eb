use super::common::*;

use crate::assessment::domain::AssessmentKind;
use crate::assessment::presenter::{
    AssessmentRun, CompletionReason, PresenterError, RunState, StepOutcome,
};

fn wellness_run() -> AssessmentRun {
    let bank = bank();
    AssessmentRun::new(bank.questionnaire(AssessmentKind::Wellness), Some(300))
}

#[test]
fn actions_before_start_are_ignored() {
    let mut run = wellness_run();

    assert_eq!(run.state(), RunState::NotStarted);
    assert_eq!(run.select(0, morning()).expect("in range"), StepOutcome::NotStarted);
    assert_eq!(run.advance(morning()), StepOutcome::NotStarted);
    assert!(run.answers().is_empty());
}

#[test]
fn start_is_only_honored_once() {
    let mut run = wellness_run();

    assert!(run.start(morning()));
    assert!(!run.start(seconds_after(morning(), 10)));
    assert_eq!(run.remaining_secs(), Some(300));
}

#[test]
fn advance_without_selection_keeps_the_cursor() {
    let mut run = wellness_run();
    run.start(morning());

    assert_eq!(run.advance(morning()), StepOutcome::NoSelection);
    assert_eq!(run.cursor(), 0);
}

#[test]
fn selection_can_change_until_advance() {
    let mut run = wellness_run();
    run.start(morning());

    run.select(0, morning()).expect("in range");
    run.select(3, morning()).expect("in range");
    assert_eq!(run.pending_selection(), Some(3));

    assert_eq!(run.advance(morning()), StepOutcome::Advanced { cursor: 1 });
    assert_eq!(run.answers()[0].option, 3);
    assert_eq!(run.answers()[0].question_index, 0);
    assert_eq!(run.pending_selection(), None);
}

#[test]
fn out_of_range_option_is_rejected() {
    let mut run = wellness_run();
    run.start(morning());

    let error = run.select(5, morning()).expect_err("only five options");
    assert!(matches!(
        error,
        PresenterError::OptionOutOfRange {
            position: 1,
            option: 5,
            available: 5
        }
    ));
}

#[test]
fn answering_every_question_completes_once() {
    let bank = bank();
    let questionnaire = bank.questionnaire(AssessmentKind::Wellness);
    let mut run = AssessmentRun::new(questionnaire, Some(300));
    run.start(morning());

    let mut completions = Vec::new();
    for index in 0..questionnaire.len() {
        assert!(run.current_question(questionnaire).is_some());
        let at = seconds_after(morning(), index as i64 + 1);
        if let StepOutcome::Completed(completion) = run.answer(0, at).expect("in range") {
            completions.push(completion);
        }
    }

    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].reason, CompletionReason::AllAnswered);
    assert_eq!(completions[0].answered, 5);
    assert!(run.is_completed());
    assert!(run.current_question(questionnaire).is_none());
    assert_eq!(run.progress(), 1.0);
    assert_eq!(run.answer(0, morning()).expect("ignored"), StepOutcome::AlreadyCompleted);
}

#[test]
fn progress_tracks_the_cursor() {
    let mut run = wellness_run();
    run.start(morning());

    run.answer(1, morning()).expect("in range");
    run.answer(1, morning()).expect("in range");

    assert_eq!(run.cursor(), 2);
    assert!((run.progress() - 0.4).abs() < f64::EPSILON);
}

#[test]
fn ticking_to_zero_completes_with_recorded_answers() {
    let bank = bank();
    let mut run = AssessmentRun::new(bank.questionnaire(AssessmentKind::Wellness), Some(3));
    run.start(morning());
    run.answer(0, morning()).expect("in range");
    run.select(2, morning()).expect("in range");

    assert!(run.tick(seconds_after(morning(), 1)).is_none());
    assert!(run.tick(seconds_after(morning(), 2)).is_none());
    let completion = run
        .tick(seconds_after(morning(), 3))
        .expect("third tick expires the countdown");

    assert_eq!(completion.reason, CompletionReason::TimerExpired);
    assert_eq!(completion.answered, 1);
    assert_eq!(run.pending_selection(), None);
    assert!(run.tick(seconds_after(morning(), 4)).is_none());
}

#[test]
fn actions_after_the_deadline_complete_instead_of_applying() {
    let mut run = wellness_run();
    run.start(morning());
    run.answer(0, morning()).expect("in range");

    let late = seconds_after(morning(), 301);
    let outcome = run.answer(1, late).expect("in range");

    match outcome {
        StepOutcome::Completed(completion) => {
            assert_eq!(completion.reason, CompletionReason::TimerExpired);
            assert_eq!(completion.answered, 1);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(run.answers().len(), 1);
}

#[test]
fn clock_sync_never_adds_time() {
    let mut run = wellness_run();
    run.start(morning());

    assert!(run.sync_clock(seconds_after(morning(), 120)).is_none());
    assert_eq!(run.remaining_secs(), Some(180));

    assert!(run.sync_clock(seconds_after(morning(), 60)).is_none());
    assert_eq!(run.remaining_secs(), Some(180));
}

#[test]
fn countdown_reports_its_deadline() {
    let mut run = wellness_run();
    run.start(morning());

    let countdown = run.countdown().expect("time limited");
    assert_eq!(countdown.limit_secs(), 300);
    assert_eq!(countdown.deadline(), Some(seconds_after(morning(), 300)));
}

#[test]
fn untimed_runs_never_expire() {
    let bank = bank();
    let mut run = AssessmentRun::new(bank.questionnaire(AssessmentKind::Certification), None);
    run.start(morning());

    assert!(run.sync_clock(seconds_after(morning(), 86_400)).is_none());
    assert!(run.tick(seconds_after(morning(), 86_401)).is_none());
    assert_eq!(run.state(), RunState::InProgress);
}
