// Database models - Subjective answer
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, Entity, EntitySchema};

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("SubjectiveAttempt", "subjective_attempts")
        .column(
            ColumnDef::new("_attemptId", ColumnType::Integer)
                .references("attempts", "_attemptId")
                .primary_key(),
        )
        .column(
            ColumnDef::new("_questionId", ColumnType::Integer)
                .references("questions", "_questionId")
                .primary_key(),
        )
        .column(ColumnDef::new("response", ColumnType::Text).not_null())
        .column(ColumnDef::new("marksAwarded", ColumnType::Real))
        .timestamps()
        .belongs_to("attempt", "Attempt", "_attemptId")
        .belongs_to("question", "Question", "_questionId")
});

/// A free-text answer to a subjective question, keyed by (attempt, question)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectiveAttempt {
    #[serde(rename = "_attemptId", default)]
    pub attempt_pk: Option<i64>,
    #[serde(rename = "_questionId", default)]
    pub question_pk: Option<i64>,
    pub response: String,
    /// Unset until the host marks the answer
    pub marks_awarded: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for SubjectiveAttempt {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
