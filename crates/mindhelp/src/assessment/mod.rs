//! Wellness and peer-helper certification assessments.
//!
//! Questions come from a [`QuestionBank`], an [`AssessmentRun`] presents them one at a time under a
//! countdown, and on completion the [`AssessmentService`] scores the run, lets the [`Dispatcher`]
//! pick an outcome, and writes the results to the per-user [`UserStore`].

pub mod bank;
pub mod dispatch;
pub mod domain;
pub mod presenter;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use bank::{QuestionBank, QuestionBankError, Questionnaire, QuestionnaireView};
pub use dispatch::{
    CertificationDispatch, CertificationOutcome, Dispatcher, FixedSlotPicker, RandomSlotPicker,
    SessionPriority, SessionRecord, SlotPicker, WellnessBand, WellnessDispatch,
};
pub use domain::{AnswerOption, AssessmentKind, Question, QuestionView, UserId, WellnessLevel};
pub use presenter::{
    Answer, AssessmentRun, Completion, CompletionReason, PresenterError, RunState, StepOutcome,
};
pub use router::assessment_router;
pub use scoring::{score_run, CertificationScore, RunScore, WellnessScore};
pub use service::{
    run_expiry_sweeper, AssessmentService, AssessmentServiceError, RunReport, RunStatusView,
    StepView,
};
pub use store::{
    HelperCertificationRecord, InMemoryStore, JsonFileStore, StoreError, StoreKey, UserStore,
    UserStoreExt, WellnessScoreRecord,
};
