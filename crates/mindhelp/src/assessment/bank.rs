use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{AnswerOption, AssessmentKind, Question, QuestionView, WellnessLevel};
use crate::config::AssessmentConfig;

const WELLNESS_CSV: &str = include_str!("data/wellness_questions.csv");
const CERTIFICATION_CSV: &str = include_str!("data/certification_questions.csv");
const PEER_HELPER_GUIDELINES: &str = include_str!("data/peer_helper_guidelines.md");

pub const WELLNESS_FILE: &str = "wellness_questions.csv";
pub const CERTIFICATION_FILE: &str = "certification_questions.csv";
pub const GUIDELINES_FILE: &str = "peer_helper_guidelines.md";

/// Ordered question list for one assessment kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Questionnaire {
    kind: AssessmentKind,
    questions: Vec<Question>,
    guidelines: Option<String>,
}

impl Questionnaire {
    pub fn new(
        kind: AssessmentKind,
        questions: Vec<Question>,
        guidelines: Option<String>,
    ) -> Result<Self, QuestionBankError> {
        validate(kind, &questions)?;
        Ok(Self {
            kind,
            questions,
            guidelines,
        })
    }

    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Study material shown before the questionnaire starts.
    pub fn guidelines(&self) -> Option<&str> {
        self.guidelines.as_deref()
    }

    pub fn view(&self) -> QuestionnaireView {
        QuestionnaireView {
            kind: self.kind,
            title: self.kind.label(),
            questions: self
                .questions
                .iter()
                .enumerate()
                .map(|(index, question)| question.view(index + 1))
                .collect(),
        }
    }
}

/// Client-facing listing of a questionnaire.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireView {
    pub kind: AssessmentKind,
    pub title: &'static str,
    pub questions: Vec<QuestionView>,
}

/// Static question data for both flows, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    wellness: Questionnaire,
    certification: Questionnaire,
}

impl QuestionBank {
    /// The bank compiled into the crate.
    pub fn standard() -> Result<Self, QuestionBankError> {
        Self::from_readers(
            WELLNESS_CSV.as_bytes(),
            CERTIFICATION_CSV.as_bytes(),
            Some(PEER_HELPER_GUIDELINES.to_string()),
        )
    }

    /// Uses `config.question_bank_dir` when set, otherwise the compiled-in bank.
    pub fn load(config: &AssessmentConfig) -> Result<Self, QuestionBankError> {
        match &config.question_bank_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::standard(),
        }
    }

    /// Reads both CSVs from `dir`. A missing guidelines file falls back to the bundled text.
    pub fn from_dir(dir: &Path) -> Result<Self, QuestionBankError> {
        let wellness = open(&dir.join(WELLNESS_FILE))?;
        let certification = open(&dir.join(CERTIFICATION_FILE))?;

        let guidelines_path = dir.join(GUIDELINES_FILE);
        let guidelines = if guidelines_path.exists() {
            std::fs::read_to_string(&guidelines_path).map_err(|source| QuestionBankError::Io {
                path: guidelines_path,
                source,
            })?
        } else {
            PEER_HELPER_GUIDELINES.to_string()
        };

        Self::from_readers(wellness, certification, Some(guidelines))
    }

    pub fn from_readers<W: Read, C: Read>(
        wellness: W,
        certification: C,
        guidelines: Option<String>,
    ) -> Result<Self, QuestionBankError> {
        let wellness = Questionnaire::new(AssessmentKind::Wellness, parse_wellness(wellness)?, None)?;
        let certification = Questionnaire::new(
            AssessmentKind::Certification,
            parse_certification(certification)?,
            guidelines,
        )?;

        Ok(Self {
            wellness,
            certification,
        })
    }

    pub fn questionnaire(&self, kind: AssessmentKind) -> &Questionnaire {
        match kind {
            AssessmentKind::Wellness => &self.wellness,
            AssessmentKind::Certification => &self.certification,
        }
    }
}

fn open(path: &Path) -> Result<File, QuestionBankError> {
    File::open(path).map_err(|source| QuestionBankError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct WellnessRow {
    id: u32,
    category: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct CertificationRow {
    id: u32,
    category: String,
    prompt: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    option_a: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    option_b: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    option_c: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    option_d: Option<String>,
    correct_option: usize,
}

impl CertificationRow {
    fn into_question(self) -> Question {
        let options = [self.option_a, self.option_b, self.option_c, self.option_d]
            .into_iter()
            .flatten()
            .map(|label| AnswerOption {
                label,
                emoji: None,
                description: None,
                value: None,
            })
            .collect();

        Question {
            id: self.id,
            prompt: self.prompt,
            category: self.category,
            options,
            correct_option: Some(self.correct_option),
        }
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn parse_wellness<R: Read>(reader: R) -> Result<Vec<Question>, QuestionBankError> {
    let scale: Vec<AnswerOption> = WellnessLevel::ordered()
        .into_iter()
        .map(WellnessLevel::option)
        .collect();

    let mut questions = Vec::new();
    for row in csv_reader(reader).deserialize::<WellnessRow>() {
        let row = row.map_err(|source| QuestionBankError::Csv {
            kind: AssessmentKind::Wellness,
            source,
        })?;
        questions.push(Question {
            id: row.id,
            prompt: row.prompt,
            category: row.category,
            options: scale.clone(),
            correct_option: None,
        });
    }
    Ok(questions)
}

fn parse_certification<R: Read>(reader: R) -> Result<Vec<Question>, QuestionBankError> {
    let mut questions = Vec::new();
    for row in csv_reader(reader).deserialize::<CertificationRow>() {
        let row = row.map_err(|source| QuestionBankError::Csv {
            kind: AssessmentKind::Certification,
            source,
        })?;
        questions.push(row.into_question());
    }
    Ok(questions)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn validate(kind: AssessmentKind, questions: &[Question]) -> Result<(), QuestionBankError> {
    if questions.is_empty() {
        return Err(QuestionBankError::Empty { kind });
    }

    let mut seen = HashSet::new();
    for question in questions {
        if !seen.insert(question.id) {
            return Err(QuestionBankError::DuplicateId {
                kind,
                id: question.id,
            });
        }
        if question.options.len() < 2 {
            return Err(QuestionBankError::TooFewOptions { id: question.id });
        }
        if let Some(correct) = question.correct_option {
            if correct >= question.options.len() {
                return Err(QuestionBankError::CorrectOptionOutOfRange {
                    id: question.id,
                    correct,
                    options: question.options.len(),
                });
            }
        } else if kind == AssessmentKind::Certification {
            return Err(QuestionBankError::MissingAnswerKey { id: question.id });
        }
    }

    Ok(())
}

/// Reasons a question bank cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("failed to parse {kind} questions: {source}")]
    Csv {
        kind: AssessmentKind,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{kind} question bank is empty")]
    Empty { kind: AssessmentKind },
    #[error("{kind} question bank repeats question id {id}")]
    DuplicateId { kind: AssessmentKind, id: u32 },
    #[error("question {id} needs at least two answer options")]
    TooFewOptions { id: u32 },
    #[error("question {id} keys option {correct} but only offers {options} option(s)")]
    CorrectOptionOutOfRange {
        id: u32,
        correct: usize,
        options: usize,
    },
    #[error("certification question {id} has no correct option")]
    MissingAnswerKey { id: u32 },
}
