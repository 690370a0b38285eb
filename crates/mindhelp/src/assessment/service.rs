use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::bank::QuestionBank;
use super::dispatch::{
    CertificationDispatch, CertificationOutcome, Dispatcher, RandomSlotPicker, SessionRecord,
    SlotPicker, WellnessDispatch,
};
use super::domain::{AssessmentKind, QuestionView, UserId};
use super::presenter::{AssessmentRun, Completion, PresenterError, RunState, StepOutcome};
use super::scoring::{score_run, RunScore, WellnessScore};
use super::store::{
    HelperCertificationRecord, StoreError, UserStore, UserStoreExt, WellnessScoreRecord,
};
use crate::config::AssessmentConfig;

/// Coordinates runs, scoring, dispatch and persistence. One run per user.
pub struct AssessmentService<S> {
    bank: Arc<QuestionBank>,
    store: Arc<S>,
    dispatcher: Dispatcher,
    wellness_time_limit_secs: u32,
    certification_time_limit_secs: u32,
    runs: Mutex<HashMap<UserId, RunSlot>>,
}

/// How long a completed run stays readable through `status` before the sweep drops it.
pub const COMPLETED_RUN_RETENTION_SECS: i64 = 10 * 60;

struct RunSlot {
    run: AssessmentRun,
    /// Persisted outcome, visible to clients.
    report: Option<RunReport>,
    /// Outcome whose store writes failed; retried on the next call that touches the run.
    unpersisted: Option<RunReport>,
}

impl RunSlot {
    fn new(run: AssessmentRun) -> Self {
        Self {
            run,
            report: None,
            unpersisted: None,
        }
    }

    fn retention_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.unpersisted.is_none()
            && self.report.as_ref().is_some_and(|report| {
                now - report.completion().completed_at
                    >= chrono::Duration::seconds(COMPLETED_RUN_RETENTION_SECS)
            })
    }
}

impl<S> AssessmentService<S>
where
    S: UserStore + 'static,
{
    pub fn new(bank: Arc<QuestionBank>, store: Arc<S>, config: &AssessmentConfig) -> Self {
        Self::with_slot_picker(bank, store, config, Arc::new(RandomSlotPicker))
    }

    pub fn with_slot_picker(
        bank: Arc<QuestionBank>,
        store: Arc<S>,
        config: &AssessmentConfig,
        picker: Arc<dyn SlotPicker>,
    ) -> Self {
        Self {
            bank,
            store,
            dispatcher: Dispatcher::new(config.passing_score, picker)
                .with_utc_offset(config.session_utc_offset()),
            wellness_time_limit_secs: config.wellness_time_limit_secs,
            certification_time_limit_secs: config.certification_time_limit_secs,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn time_limit(&self, kind: AssessmentKind) -> u32 {
        match kind {
            AssessmentKind::Wellness => self.wellness_time_limit_secs,
            AssessmentKind::Certification => self.certification_time_limit_secs,
        }
    }

    /// Starts a fresh run, silently abandoning any run the user already had.
    pub fn start(&self, user: &UserId, kind: AssessmentKind, now: DateTime<Utc>) -> RunStatusView {
        let questionnaire = self.bank.questionnaire(kind);
        let mut run = AssessmentRun::new(questionnaire, Some(self.time_limit(kind)));
        run.start(now);

        let slot = RunSlot::new(run);
        let view = self.status_view(user, &slot);

        let mut runs = self.runs.lock().expect("run registry mutex poisoned");
        if let Some(previous) = runs.insert(user.clone(), slot) {
            if previous.run.state() == RunState::InProgress {
                debug!(user = %user, kind = %previous.run.kind(), "abandoned run replaced by a new start");
            }
        }

        info!(user = %user, %kind, questions = questionnaire.len(), "assessment started");
        view
    }

    pub fn select(
        &self,
        user: &UserId,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<StepView, AssessmentServiceError> {
        self.step(user, |run| run.select(option, now))
    }

    /// Commits the pending selection. Without one the call is a no-op.
    pub fn advance(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<StepView, AssessmentServiceError> {
        self.step(user, |run| Ok(run.advance(now)))
    }

    pub fn answer(
        &self,
        user: &UserId,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<StepView, AssessmentServiceError> {
        self.step(user, |run| run.answer(option, now))
    }

    /// Current run state after catching the countdown up to `now`.
    pub fn status(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<RunStatusView, AssessmentServiceError> {
        let mut runs = self.runs.lock().expect("run registry mutex poisoned");
        let slot = runs
            .get_mut(user)
            .ok_or_else(|| AssessmentServiceError::NoActiveRun(user.clone()))?;

        if let Some(completion) = slot.run.sync_clock(now) {
            slot.unpersisted = Some(self.conclude(user, &slot.run, completion));
        }
        self.settle(user, slot)?;

        let view = self.status_view(user, slot);
        if view.report.as_ref().is_some_and(RunReport::discards_run) {
            runs.remove(user);
        }
        Ok(view)
    }

    /// Drops the user's run without scoring or persisting anything.
    pub fn abandon(&self, user: &UserId) -> Result<(), AssessmentServiceError> {
        let mut runs = self.runs.lock().expect("run registry mutex poisoned");
        let slot = runs
            .remove(user)
            .ok_or_else(|| AssessmentServiceError::NoActiveRun(user.clone()))?;
        debug!(
            user = %user,
            kind = %slot.run.kind(),
            answered = slot.run.answers().len(),
            "assessment abandoned"
        );
        Ok(())
    }

    /// Finalizes every in-progress run whose countdown has run out and retries outcomes whose
    /// writes failed earlier. Returns how many were persisted. Completed runs older than
    /// [`COMPLETED_RUN_RETENTION_SECS`] are dropped.
    pub fn expire_due(&self, now: DateTime<Utc>) -> usize {
        let mut runs = self.runs.lock().expect("run registry mutex poisoned");
        let mut finalized = 0;
        let mut discarded = Vec::new();

        for (user, slot) in runs.iter_mut() {
            if let Some(completion) = slot.run.sync_clock(now) {
                slot.unpersisted = Some(self.conclude(user, &slot.run, completion));
            }
            match self.settle(user, slot) {
                Ok(true) => {
                    finalized += 1;
                    if slot.report.as_ref().is_some_and(RunReport::discards_run) {
                        discarded.push(user.clone());
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    error!(user = %user, error = %err, "failed to persist expired assessment");
                }
            }
        }

        for user in discarded {
            runs.remove(&user);
        }

        let before = runs.len();
        runs.retain(|_, slot| !slot.retention_elapsed(now));
        let evicted = before - runs.len();
        if evicted > 0 {
            debug!(evicted, "completed runs dropped after retention");
        }
        finalized
    }

    pub fn wellness_score(
        &self,
        user: &UserId,
    ) -> Result<Option<WellnessScoreRecord>, AssessmentServiceError> {
        Ok(self.store.wellness_score(user)?)
    }

    pub fn sessions(&self, user: &UserId) -> Result<Vec<SessionRecord>, AssessmentServiceError> {
        Ok(self.store.sessions(user)?)
    }

    pub fn helper_certification(
        &self,
        user: &UserId,
    ) -> Result<Option<HelperCertificationRecord>, AssessmentServiceError> {
        Ok(self.store.helper_certification(user)?)
    }

    fn step<F>(&self, user: &UserId, action: F) -> Result<StepView, AssessmentServiceError>
    where
        F: FnOnce(&mut AssessmentRun) -> Result<StepOutcome, PresenterError>,
    {
        let mut runs = self.runs.lock().expect("run registry mutex poisoned");
        let slot = runs
            .get_mut(user)
            .ok_or_else(|| AssessmentServiceError::NoActiveRun(user.clone()))?;

        let pending = slot
            .unpersisted
            .as_ref()
            .map(|report| *report.completion());
        let step = match pending {
            // A completed run whose writes failed earlier: retry them instead of acting.
            Some(completion) => StepOutcome::Completed(completion),
            None => action(&mut slot.run)?,
        };
        match step {
            StepOutcome::Completed(completion) => {
                if pending.is_none() {
                    slot.unpersisted = Some(self.conclude(user, &slot.run, completion));
                }
                self.settle(user, slot).map_err(|err| {
                    error!(user = %user, error = %err, "failed to persist completed assessment");
                    err
                })?;
            }
            StepOutcome::NoSelection => {
                debug!(user = %user, cursor = slot.run.cursor(), "advance ignored without a selection");
            }
            _ => {}
        }

        let view = self.status_view(user, slot);
        if view.report.as_ref().is_some_and(RunReport::discards_run) {
            runs.remove(user);
            debug!(user = %user, "failed certification attempt discarded");
        }

        Ok(StepView { step, run: view })
    }

    /// Persists a pending outcome, if any. Returns whether one was written by this call; on
    /// failure the outcome stays pending.
    fn settle(&self, user: &UserId, slot: &mut RunSlot) -> Result<bool, AssessmentServiceError> {
        let Some(report) = slot.unpersisted.take() else {
            return Ok(false);
        };
        if let Err(err) = self.persist(user, &report) {
            slot.unpersisted = Some(report);
            return Err(err);
        }
        slot.report = Some(report);
        Ok(true)
    }

    /// Scores the run and decides its outcome. Touches no storage, so a retry reuses the same
    /// sessions and ids.
    fn conclude(&self, user: &UserId, run: &AssessmentRun, completion: Completion) -> RunReport {
        let questionnaire = self.bank.questionnaire(run.kind());

        match score_run(run, questionnaire) {
            RunScore::Wellness(Some(score)) => {
                let dispatch = self
                    .dispatcher
                    .dispatch_wellness(score, completion.completed_at);
                info!(
                    user = %user,
                    reason = ?completion.reason,
                    answered = completion.answered,
                    score = score.value(),
                    band = dispatch.band.label(),
                    "wellness assessment completed"
                );
                RunReport::Wellness(WellnessReport {
                    completion,
                    score: Some(score),
                    dispatch: Some(dispatch),
                })
            }
            RunScore::Wellness(None) => {
                info!(
                    user = %user,
                    reason = ?completion.reason,
                    "wellness assessment completed without answers; nothing recorded"
                );
                RunReport::Wellness(WellnessReport {
                    completion,
                    score: None,
                    dispatch: None,
                })
            }
            RunScore::Certification(score) => {
                let dispatch = self.dispatcher.dispatch_certification(score);
                info!(
                    user = %user,
                    reason = ?completion.reason,
                    correct = score.correct,
                    total = score.total,
                    outcome = ?dispatch.outcome,
                    "certification assessment completed"
                );
                RunReport::Certification(CertificationReport {
                    completion,
                    dispatch,
                })
            }
        }
    }

    /// Writes the outcome. Safe to repeat after a failure: the score is overwritten and the
    /// session append, the only non-idempotent write, goes last.
    fn persist(&self, user: &UserId, report: &RunReport) -> Result<(), AssessmentServiceError> {
        match report {
            RunReport::Wellness(WellnessReport {
                completion,
                score: Some(score),
                dispatch: Some(dispatch),
            }) => {
                self.store.record_wellness_score(
                    user,
                    &WellnessScoreRecord {
                        score: *score,
                        completed_at: completion.completed_at,
                    },
                )?;
                if !dispatch.sessions.is_empty() {
                    self.store.append_sessions(user, &dispatch.sessions)?;
                    warn!(
                        user = %user,
                        score = score.value(),
                        sessions = dispatch.sessions.len(),
                        "critical wellness score; support sessions auto-scheduled"
                    );
                }
            }
            RunReport::Wellness(_) => {}
            RunReport::Certification(CertificationReport {
                completion,
                dispatch,
            }) => {
                if dispatch.outcome == CertificationOutcome::Passed {
                    self.store.record_helper_certification(
                        user,
                        &HelperCertificationRecord {
                            correct: dispatch.score.correct,
                            total: dispatch.score.total,
                            percentage: dispatch.percentage,
                            certified_at: completion.completed_at,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    fn status_view(&self, user: &UserId, slot: &RunSlot) -> RunStatusView {
        let run = &slot.run;
        let questionnaire = self.bank.questionnaire(run.kind());
        RunStatusView {
            user_id: user.clone(),
            kind: run.kind(),
            state: run.state(),
            answered: run.cursor(),
            total: run.total(),
            progress: run.progress(),
            remaining_seconds: run.remaining_secs(),
            current_question: run
                .current_question(questionnaire)
                .map(|question| question.view(run.cursor() + 1)),
            pending_selection: run.pending_selection(),
            report: slot.report.clone(),
        }
    }
}

/// Drives countdown expiry once per `period` for runs nobody is interacting with.
pub async fn run_expiry_sweeper<S>(service: Arc<AssessmentService<S>>, period: Duration)
where
    S: UserStore + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let finalized = service.expire_due(Utc::now());
        if finalized > 0 {
            debug!(finalized, "expired assessments finalized");
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunReport {
    Wellness(WellnessReport),
    Certification(CertificationReport),
}

impl RunReport {
    pub fn completion(&self) -> &Completion {
        match self {
            Self::Wellness(report) => &report.completion,
            Self::Certification(report) => &report.completion,
        }
    }

    /// Failed certification attempts are not kept; the applicant starts over.
    pub fn discards_run(&self) -> bool {
        matches!(
            self,
            Self::Certification(CertificationReport { dispatch, .. })
                if dispatch.outcome == CertificationOutcome::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessReport {
    pub completion: Completion,
    pub score: Option<WellnessScore>,
    pub dispatch: Option<WellnessDispatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationReport {
    pub completion: Completion,
    pub dispatch: CertificationDispatch,
}

/// Run snapshot returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub user_id: UserId,
    pub kind: AssessmentKind,
    pub state: RunState,
    pub answered: usize,
    pub total: usize,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_selection: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

/// Response to a presenter interaction. `run` is the final snapshot when the run was discarded.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: StepOutcome,
    pub run: RunStatusView,
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("no assessment in progress for user {0}")]
    NoActiveRun(UserId),
    #[error(transparent)]
    Presenter(#[from] PresenterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
