use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Same-day slots offered for immediate sessions.
pub const IMMEDIATE_SLOTS: [(u32, u32); 4] = [(14, 0), (15, 30), (17, 0), (18, 30)];

/// Next-day slot used for urgent sessions.
pub const URGENT_SLOT: (u32, u32) = (10, 0);

const URGENT_COUNSELOR: &str = "Dr. Kavya Sharma";
const IMMEDIATE_COUNSELOR: &str = "Dr. Priya Gupta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPriority {
    Urgent,
    Immediate,
}

impl SessionPriority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Immediate => "immediate",
        }
    }

    pub const fn category(self) -> &'static str {
        match self {
            Self::Urgent => "Priority Consultation",
            Self::Immediate => "Emergency Consultation",
        }
    }

    pub const fn counselor(self) -> &'static str {
        match self {
            Self::Urgent => URGENT_COUNSELOR,
            Self::Immediate => IMMEDIATE_COUNSELOR,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Urgent => "Low wellness score detected - priority session scheduled for tomorrow",
            Self::Immediate => "Critical wellness score - immediate attention required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    AutoScheduled,
}

/// Support session synthesized from a low wellness score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub category: String,
    pub counselor: String,
    /// Human-readable slot, e.g. `Today, 3:30 PM`.
    pub slot: String,
    /// Wall-clock time in the dispatcher's configured offset.
    pub scheduled_for: NaiveDateTime,
    pub priority: SessionPriority,
    pub status: SessionStatus,
    pub reason: String,
}

/// Chooses one of `candidates` slots. Injected so tests can pin the pick.
pub trait SlotPicker: Send + Sync {
    fn pick(&self, candidates: usize) -> usize;
}

/// Uniform pick backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSlotPicker;

impl SlotPicker for RandomSlotPicker {
    fn pick(&self, candidates: usize) -> usize {
        if candidates == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..candidates)
    }
}

/// Always returns the same index.
#[derive(Debug, Clone, Copy)]
pub struct FixedSlotPicker(pub usize);

impl SlotPicker for FixedSlotPicker {
    fn pick(&self, _candidates: usize) -> usize {
        self.0
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Random per-process tag so ids stay unique when a persisted store outlives the process.
fn process_tag() -> u32 {
    static TAG: OnceLock<u32> = OnceLock::new();
    *TAG.get_or_init(|| rand::thread_rng().gen())
}

/// `<priority>-<completion millis>-<process tag>-<sequence>`.
fn next_session_id(priority: SessionPriority, completed_at: DateTime<Utc>) -> String {
    let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{:08x}-{sequence}",
        priority.label(),
        completed_at.timestamp_millis(),
        process_tag()
    )
}

fn slot_time((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn slot_label(day: &str, time: NaiveTime) -> String {
    format!("{day}, {}", time.format("%-I:%M %p"))
}

/// Urgent session on the day after `completed_at`, at the fixed morning slot. Days follow `offset`.
pub fn urgent_session(completed_at: DateTime<Utc>, offset: FixedOffset) -> SessionRecord {
    let priority = SessionPriority::Urgent;
    let time = slot_time(URGENT_SLOT);
    let day = completed_at.with_timezone(&offset).date_naive() + Duration::days(1);
    build(
        priority,
        completed_at,
        slot_label("Tomorrow", time),
        day.and_time(time),
    )
}

/// Immediate session later on the day of `completed_at`, slot chosen by `picker`.
pub fn immediate_session(
    completed_at: DateTime<Utc>,
    offset: FixedOffset,
    picker: &dyn SlotPicker,
) -> SessionRecord {
    let priority = SessionPriority::Immediate;
    let index = picker.pick(IMMEDIATE_SLOTS.len()) % IMMEDIATE_SLOTS.len();
    let time = slot_time(IMMEDIATE_SLOTS[index]);
    let day = completed_at.with_timezone(&offset).date_naive();
    build(
        priority,
        completed_at,
        slot_label("Today", time),
        day.and_time(time),
    )
}

fn build(
    priority: SessionPriority,
    completed_at: DateTime<Utc>,
    slot: String,
    scheduled_for: NaiveDateTime,
) -> SessionRecord {
    SessionRecord {
        id: next_session_id(priority, completed_at),
        category: priority.category().to_string(),
        counselor: priority.counselor().to_string(),
        slot,
        scheduled_for,
        priority,
        status: SessionStatus::AutoScheduled,
        reason: priority.reason().to_string(),
    }
}
