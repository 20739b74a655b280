// Database models - Quiz attempt
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Attempt", "attempts")
        .column(ColumnDef::new("_attemptId", ColumnType::Integer).primary_key().auto_increment())
        .column(
            ColumnDef::new("attemptId", ColumnType::Uuid)
                .not_null()
                .unique()
                .default(DefaultValue::UuidV4),
        )
        .column(
            ColumnDef::new("_meetingId", ColumnType::Integer)
                .not_null()
                .references("meetings", "_meetingId"),
        )
        .column(
            ColumnDef::new("_participantId", ColumnType::Integer)
                .not_null()
                .indexed()
                .references("participants", "_participantId"),
        )
        .column(ColumnDef::new("score", ColumnType::Real))
        .column(ColumnDef::new("submittedAt", ColumnType::Timestamp))
        .timestamps()
        .belongs_to("meeting", "Meeting", "_meetingId")
        .belongs_to("participant", "Participant", "_participantId")
        .has_many("answers", "SubjectiveAttempt", "_attemptId")
});

/// One participant's run through a meeting's quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(rename = "_attemptId", default)]
    pub attempt_pk: Option<i64>,
    pub attempt_id: String,
    #[serde(rename = "_meetingId", default)]
    pub meeting_pk: Option<i64>,
    #[serde(rename = "_participantId", default)]
    pub participant_pk: Option<i64>,
    pub score: Option<f64>,
    pub submitted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Attempt {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
