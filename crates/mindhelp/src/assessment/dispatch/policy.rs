use serde::{Deserialize, Serialize};

use super::super::scoring::{CertificationScore, WellnessScore};

/// Scores at or below this value also get a same-day session.
pub const IMMEDIATE_SESSION_CEILING: u8 = 10;

pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const LOGIN_ROUTE: &str = "/login";

/// Wellness outcome bands, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessBand {
    Excellent,
    Good,
    NeedsImprovement,
    Critical,
}

impl WellnessBand {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Excellent,
            Self::Good,
            Self::NeedsImprovement,
            Self::Critical,
        ]
    }

    /// Inclusive lower bound of the band.
    pub const fn floor(self) -> u8 {
        match self {
            Self::Excellent => 75,
            Self::Good => 50,
            Self::NeedsImprovement => 30,
            Self::Critical => 0,
        }
    }

    /// First band (high to low) whose floor the score reaches.
    pub fn classify(score: WellnessScore) -> Self {
        Self::ordered()
            .into_iter()
            .find(|band| score.value() >= band.floor())
            .unwrap_or(Self::Critical)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsImprovement => "needs_improvement",
            Self::Critical => "critical",
        }
    }

    pub const fn synthesizes_sessions(self) -> bool {
        matches!(self, Self::Critical)
    }

    pub const fn message(self) -> BandMessage {
        match self {
            Self::Excellent => BandMessage {
                title: "Great Job!",
                message: "Your mental wellness is in excellent shape. Keep up the great work!",
                tone: "green",
            },
            Self::Good => BandMessage {
                title: "You're Doing Well",
                message: "Your wellness is good, but there's room for improvement. Consider exploring our wellness resources.",
                tone: "yellow",
            },
            Self::NeedsImprovement => BandMessage {
                title: "Let's Focus on Improvement",
                message: "Your wellness needs attention. We recommend connecting with our peer support community.",
                tone: "orange",
            },
            Self::Critical => BandMessage {
                title: "We're Here to Help",
                message: "Your wellness score indicates you could benefit from professional support. We've automatically scheduled a session with a psychiatrist.",
                tone: "red",
            },
        }
    }
}

/// Result-screen copy for a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandMessage {
    pub title: &'static str,
    pub message: &'static str,
    pub tone: &'static str,
}

/// Pass/fail outcome of the peer-helper quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationOutcome {
    /// Registration is finalized and the helper lands on the dashboard.
    Passed,
    /// Registration is discarded and the applicant returns to login.
    Failed,
}

impl CertificationOutcome {
    pub fn decide(score: &CertificationScore, passing_score: f64) -> Self {
        if score.passes(passing_score) {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    pub const fn route(self) -> &'static str {
        match self {
            Self::Passed => DASHBOARD_ROUTE,
            Self::Failed => LOGIN_ROUTE,
        }
    }

    pub fn summary(self, score: &CertificationScore, passing_score: f64) -> String {
        let required = (passing_score * 100.0).round() as u32;
        match self {
            Self::Passed => format!(
                "qualified as a peer helper with {}% ({} of {} correct)",
                score.percentage(),
                score.correct,
                score.total
            ),
            Self::Failed => format!(
                "scored {}% ({} of {} correct); at least {}% is required",
                score.percentage(),
                score.correct,
                score.total,
                required
            ),
        }
    }
}
