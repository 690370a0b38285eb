//! Sequential question presenter.
//!
//! An [`AssessmentRun`] walks `NotStarted → InProgress → Completed`. Every mutating call takes the
//! current wall-clock time so the countdown is caught up before the action is applied; a run whose
//! countdown reached zero completes with whatever answers were recorded, and the pending
//! (uncommitted) selection is dropped. Completion is reported exactly once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::bank::Questionnaire;
use super::domain::{AssessmentKind, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    AllAnswered,
    TimerExpired,
}

/// Recorded answer: the option picked for the question at `question_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_index: usize,
    pub option: usize,
}

/// Terminal transition details, emitted once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub reason: CompletionReason,
    pub answered: usize,
    pub total: usize,
    pub completed_at: DateTime<Utc>,
}

/// Result of a single presenter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutcome {
    Selected { option: usize },
    Advanced { cursor: usize },
    Completed(Completion),
    /// Advance requested without a selection; ignored.
    NoSelection,
    NotStarted,
    AlreadyCompleted,
}

/// Countdown measured in whole seconds from the moment the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    limit_secs: u32,
    remaining_secs: u32,
    started_at: Option<DateTime<Utc>>,
}

impl Countdown {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            remaining_secs: limit_secs,
            started_at: None,
        }
    }

    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .map(|started| started + Duration::seconds(i64::from(self.limit_secs)))
    }

    fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.remaining_secs = self.limit_secs;
    }

    /// Removes one second. Returns true when this tick reached zero.
    fn tick(&mut self) -> bool {
        if self.remaining_secs == 0 {
            return false;
        }
        self.remaining_secs -= 1;
        self.remaining_secs == 0
    }

    /// Catches up with the wall clock. Remaining time only ever decreases.
    fn sync(&mut self, now: DateTime<Utc>) -> bool {
        let Some(started) = self.started_at else {
            return false;
        };
        if self.remaining_secs == 0 {
            return false;
        }

        let elapsed = (now - started).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let remaining = self.limit_secs.saturating_sub(elapsed);
        if remaining < self.remaining_secs {
            self.remaining_secs = remaining;
        }
        self.remaining_secs == 0
    }
}

/// In-memory state of one attempt at a questionnaire.
#[derive(Debug, Clone)]
pub struct AssessmentRun {
    kind: AssessmentKind,
    option_counts: Vec<usize>,
    answers: Vec<Answer>,
    pending: Option<usize>,
    state: RunState,
    countdown: Option<Countdown>,
    completion: Option<Completion>,
}

impl AssessmentRun {
    /// Prepares a run over `questionnaire`. `time_limit_secs` of `None` disables the countdown.
    pub fn new(questionnaire: &Questionnaire, time_limit_secs: Option<u32>) -> Self {
        Self {
            kind: questionnaire.kind(),
            option_counts: questionnaire
                .questions()
                .iter()
                .map(|question| question.options.len())
                .collect(),
            answers: Vec::with_capacity(questionnaire.len()),
            pending: None,
            state: RunState::NotStarted,
            countdown: time_limit_secs.map(Countdown::new),
            completion: None,
        }
    }

    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Zero-based index of the question awaiting an answer.
    pub fn cursor(&self) -> usize {
        self.answers.len()
    }

    pub fn total(&self) -> usize {
        self.option_counts.len()
    }

    /// `cursor / total`, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.cursor() as f64 / self.total() as f64
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn pending_selection(&self) -> Option<usize> {
        self.pending
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining_secs)
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn current_question<'q>(&self, questionnaire: &'q Questionnaire) -> Option<&'q Question> {
        if self.state != RunState::InProgress {
            return None;
        }
        questionnaire.question(self.cursor())
    }

    /// Explicit start. Returns false when the run already left `NotStarted`.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != RunState::NotStarted {
            return false;
        }
        self.state = RunState::InProgress;
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.start(now);
        }
        true
    }

    /// Records the option for the current question without moving on.
    pub fn select(
        &mut self,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<StepOutcome, PresenterError> {
        if let Some(blocked) = self.gate(now) {
            return Ok(blocked);
        }

        let cursor = self.cursor();
        let available = self.option_counts.get(cursor).copied().unwrap_or(0);
        if option >= available {
            return Err(PresenterError::OptionOutOfRange {
                position: cursor + 1,
                option,
                available,
            });
        }

        self.pending = Some(option);
        Ok(StepOutcome::Selected { option })
    }

    /// Commits the pending selection and moves the cursor forward.
    pub fn advance(&mut self, now: DateTime<Utc>) -> StepOutcome {
        if let Some(blocked) = self.gate(now) {
            return blocked;
        }

        let Some(option) = self.pending.take() else {
            return StepOutcome::NoSelection;
        };

        let question_index = self.cursor();
        self.answers.push(Answer {
            question_index,
            option,
        });

        if self.cursor() == self.total() {
            return self
                .finish(CompletionReason::AllAnswered, now)
                .map(StepOutcome::Completed)
                .unwrap_or(StepOutcome::AlreadyCompleted);
        }

        StepOutcome::Advanced {
            cursor: self.cursor(),
        }
    }

    /// Select and advance in one step, the way the wellness flow records a tap.
    pub fn answer(
        &mut self,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<StepOutcome, PresenterError> {
        match self.select(option, now)? {
            StepOutcome::Selected { .. } => Ok(self.advance(now)),
            other => Ok(other),
        }
    }

    /// One wall-clock second elapsed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if self.state != RunState::InProgress {
            return None;
        }
        let expired = self.countdown.as_mut().map(Countdown::tick).unwrap_or(false);
        if expired {
            self.finish(CompletionReason::TimerExpired, now)
        } else {
            None
        }
    }

    /// Applies all wall-clock time elapsed up to `now`.
    pub fn sync_clock(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if self.state != RunState::InProgress {
            return None;
        }
        let expired = self
            .countdown
            .as_mut()
            .map(|countdown| countdown.sync(now))
            .unwrap_or(false);
        if expired {
            self.finish(CompletionReason::TimerExpired, now)
        } else {
            None
        }
    }

    fn gate(&mut self, now: DateTime<Utc>) -> Option<StepOutcome> {
        match self.state {
            RunState::NotStarted => Some(StepOutcome::NotStarted),
            RunState::Completed => Some(StepOutcome::AlreadyCompleted),
            RunState::InProgress => self.sync_clock(now).map(StepOutcome::Completed),
        }
    }

    fn finish(&mut self, reason: CompletionReason, now: DateTime<Utc>) -> Option<Completion> {
        if self.state == RunState::Completed {
            return None;
        }

        self.state = RunState::Completed;
        self.pending = None;
        let completion = Completion {
            reason,
            answered: self.answers.len(),
            total: self.total(),
            completed_at: now,
        };
        self.completion = Some(completion);
        Some(completion)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    #[error("option {option} is not available for question {position} ({available} options)")]
    OptionOutOfRange {
        /// One-based position of the question being answered.
        position: usize,
        option: usize,
        available: usize,
    },
}
