// Database models - Quiz question
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

/// How a question is answered and marked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Multiple choice, marked against `answer`
    Objective,
    /// Free text, marked by the host
    Subjective,
}

impl QuestionKind {
    pub const ALL: &'static [&'static str] = &["objective", "subjective"];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Objective => "objective",
            QuestionKind::Subjective => "subjective",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "subjective" => QuestionKind::Subjective,
            _ => QuestionKind::Objective,
        }
    }
}

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Question", "questions")
        .column(
            ColumnDef::new("_questionId", ColumnType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .column(
            ColumnDef::new("questionId", ColumnType::Uuid)
                .not_null()
                .unique()
                .default(DefaultValue::UuidV4),
        )
        .column(
            ColumnDef::new("_meetingId", ColumnType::Integer)
                .not_null()
                .indexed()
                .references("meetings", "_meetingId"),
        )
        .column(
            ColumnDef::new("kind", ColumnType::Enum(QuestionKind::ALL))
                .not_null()
                .default(DefaultValue::Text("objective")),
        )
        .column(ColumnDef::new("prompt", ColumnType::Text).not_null())
        .column(ColumnDef::new("options", ColumnType::Json))
        .column(ColumnDef::new("answer", ColumnType::Text))
        .column(
            ColumnDef::new("marks", ColumnType::Integer)
                .not_null()
                .default(DefaultValue::Integer(1)),
        )
        .timestamps()
        .belongs_to("meeting", "Meeting", "_meetingId")
        .has_many("answers", "SubjectiveAttempt", "_questionId")
});

/// A quiz question asked during a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_questionId", default)]
    pub question_pk: Option<i64>,
    pub question_id: String,
    #[serde(rename = "_meetingId", default)]
    pub meeting_pk: Option<i64>,
    pub kind: QuestionKind,
    pub prompt: String,
    /// Choices for objective questions
    pub options: Option<serde_json::Value>,
    pub answer: Option<String>,
    pub marks: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Question {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
