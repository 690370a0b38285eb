use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity the per-user storage is scoped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two questionnaires the platform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    /// Five-question self assessment taken by students on arrival.
    Wellness,
    /// Twenty-question quiz gating peer-helper registration.
    Certification,
}

impl AssessmentKind {
    pub const fn ordered() -> [Self; 2] {
        [Self::Wellness, Self::Certification]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Wellness => "wellness",
            Self::Certification => "certification",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Wellness => "Wellness Assessment",
            Self::Certification => "Peer Helper Certification",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Fixed answer scale shared by every wellness question, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessLevel {
    Great,
    Good,
    Neutral,
    Bad,
    Poor,
}

impl WellnessLevel {
    pub const fn ordered() -> [Self; 5] {
        [Self::Great, Self::Good, Self::Neutral, Self::Bad, Self::Poor]
    }

    pub const fn value(self) -> u8 {
        match self {
            Self::Great => 100,
            Self::Good => 75,
            Self::Neutral => 50,
            Self::Bad => 25,
            Self::Poor => 0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Neutral => "Neutral",
            Self::Bad => "Bad",
            Self::Poor => "Poor",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Great => "😄",
            Self::Good => "😊",
            Self::Neutral => "😐",
            Self::Bad => "😞",
            Self::Poor => "😢",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Great => "Excellent",
            Self::Good => "Pretty good",
            Self::Neutral => "It's okay",
            Self::Bad => "Not great",
            Self::Poor => "Really struggling",
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|level| level.value() == value)
    }

    /// Maps a zero-based option index (as presented) back to its level.
    pub fn from_option(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    pub(crate) fn option(self) -> AnswerOption {
        AnswerOption {
            label: self.label().to_string(),
            emoji: Some(self.emoji().to_string()),
            description: Some(self.description().to_string()),
            value: Some(self.value()),
        }
    }
}

/// One selectable answer as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
}

/// Immutable question definition loaded with the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub category: String,
    pub options: Vec<AnswerOption>,
    /// Only certification questions carry a keyed answer.
    pub correct_option: Option<usize>,
}

impl Question {
    pub fn is_correct(&self, option: usize) -> bool {
        self.correct_option == Some(option)
    }

    pub fn view(&self, position: usize) -> QuestionView {
        QuestionView {
            id: self.id,
            position,
            prompt: self.prompt.clone(),
            category: self.category.clone(),
            options: self.options.clone(),
        }
    }
}

/// Question as exposed to clients. Never includes the keyed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: u32,
    /// One-based position within the questionnaire.
    pub position: usize,
    pub prompt: String,
    pub category: String,
    pub options: Vec<AnswerOption>,
}
