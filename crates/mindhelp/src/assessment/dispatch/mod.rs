mod policy;
mod sessions;

pub use policy::{
    BandMessage, CertificationOutcome, WellnessBand, DASHBOARD_ROUTE, IMMEDIATE_SESSION_CEILING,
    LOGIN_ROUTE,
};
pub use sessions::{
    FixedSlotPicker, RandomSlotPicker, SessionPriority, SessionRecord, SessionStatus, SlotPicker,
    IMMEDIATE_SLOTS, URGENT_SLOT,
};

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

use super::scoring::{CertificationScore, WellnessScore};

/// Maps scores to outcomes. Holds the passing threshold, the slot picker and the offset used to
/// decide what "today" means for booked sessions.
#[derive(Clone)]
pub struct Dispatcher {
    passing_score: f64,
    picker: Arc<dyn SlotPicker>,
    utc_offset: FixedOffset,
}

impl Dispatcher {
    pub fn new(passing_score: f64, picker: Arc<dyn SlotPicker>) -> Self {
        Self {
            passing_score,
            picker,
            utc_offset: Utc.fix(),
        }
    }

    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    pub fn passing_score(&self) -> f64 {
        self.passing_score
    }

    pub fn dispatch_wellness(
        &self,
        score: WellnessScore,
        completed_at: DateTime<Utc>,
    ) -> WellnessDispatch {
        let band = WellnessBand::classify(score);
        let critical_floor = score.value() <= IMMEDIATE_SESSION_CEILING;

        let mut booked = Vec::new();
        if band.synthesizes_sessions() {
            booked.push(sessions::urgent_session(completed_at, self.utc_offset));
            if critical_floor {
                booked.push(sessions::immediate_session(
                    completed_at,
                    self.utc_offset,
                    self.picker.as_ref(),
                ));
            }
        }

        WellnessDispatch {
            score,
            band,
            route: DASHBOARD_ROUTE,
            message: band.message(),
            show_emergency_resources: band.synthesizes_sessions() && critical_floor,
            sessions: booked,
        }
    }

    pub fn dispatch_certification(&self, score: CertificationScore) -> CertificationDispatch {
        let outcome = CertificationOutcome::decide(&score, self.passing_score);
        CertificationDispatch {
            outcome,
            route: outcome.route(),
            summary: outcome.summary(&score, self.passing_score),
            percentage: score.percentage(),
            score,
        }
    }
}

/// Wellness band decision plus any sessions it synthesized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessDispatch {
    pub score: WellnessScore,
    pub band: WellnessBand,
    pub route: &'static str,
    pub message: BandMessage,
    pub show_emergency_resources: bool,
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationDispatch {
    pub outcome: CertificationOutcome,
    pub route: &'static str,
    pub summary: String,
    pub percentage: u8,
    pub score: CertificationScore,
}
