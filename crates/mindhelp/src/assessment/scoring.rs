use serde::{Deserialize, Serialize};

use super::bank::Questionnaire;
use super::domain::{AssessmentKind, WellnessLevel};
use super::presenter::{Answer, AssessmentRun};

/// Wellness score on the 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WellnessScore(u8);

impl WellnessScore {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Mean of the answered levels, rounded half up.
    ///
    /// The divisor is the number of answers given, so a run cut short by the timer is scored over
    /// the questions it reached. Returns `None` when nothing was answered.
    pub fn from_levels(levels: &[WellnessLevel]) -> Option<Self> {
        if levels.is_empty() {
            return None;
        }
        let count = levels.len() as u32;
        let sum: u32 = levels.iter().map(|level| u32::from(level.value())).sum();
        let rounded = (2 * sum + count) / (2 * count);
        Some(Self(rounded as u8))
    }
}

impl TryFrom<u8> for WellnessScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("wellness score {value} exceeds 100"))
    }
}

impl From<WellnessScore> for u8 {
    fn from(score: WellnessScore) -> Self {
        score.0
    }
}

/// Certification result: keyed matches over the full questionnaire length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationScore {
    pub correct: usize,
    pub total: usize,
}

impl CertificationScore {
    /// Counts answers matching the keyed option. Unanswered questions count as wrong because the
    /// denominator is the questionnaire length, not the answered count.
    pub fn grade(answers: &[Answer], questionnaire: &Questionnaire) -> Self {
        let correct = answers
            .iter()
            .filter(|answer| {
                questionnaire
                    .question(answer.question_index)
                    .is_some_and(|question| question.is_correct(answer.option))
            })
            .count();

        Self {
            correct,
            total: questionnaire.len(),
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    /// Whole percentage, rounded half up.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct * 200 + self.total) / (2 * self.total)) as u8
    }

    /// Inclusive comparison against the passing fraction.
    pub fn passes(&self, passing_score: f64) -> bool {
        self.fraction() >= passing_score
    }
}

/// Score derived from a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScore {
    /// `None` when the run completed without a single answer.
    Wellness(Option<WellnessScore>),
    Certification(CertificationScore),
}

pub fn score_run(run: &AssessmentRun, questionnaire: &Questionnaire) -> RunScore {
    match run.kind() {
        AssessmentKind::Wellness => {
            let levels: Vec<WellnessLevel> = run
                .answers()
                .iter()
                .filter_map(|answer| WellnessLevel::from_option(answer.option))
                .collect();
            RunScore::Wellness(WellnessScore::from_levels(&levels))
        }
        AssessmentKind::Certification => {
            RunScore::Certification(CertificationScore::grade(run.answers(), questionnaire))
        }
    }
}
