// Database models - Participant
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Participant", "participants")
        .column(
            ColumnDef::new("_participantId", ColumnType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .column(
            ColumnDef::new("participantId", ColumnType::Uuid)
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
        // Guests join without an account
        .column(ColumnDef::new("userId", ColumnType::Integer).references("users", "userId"))
        .column(
            ColumnDef::new("roleId", ColumnType::Integer)
                .not_null()
                .references("roles", "roleId"),
        )
        .column(ColumnDef::new("displayName", ColumnType::Text).not_null())
        .column(ColumnDef::new("joinedAt", ColumnType::Timestamp))
        .column(ColumnDef::new("leftAt", ColumnType::Timestamp))
        .timestamps()
        .belongs_to("meeting", "Meeting", "_meetingId")
        .belongs_to("user", "User", "userId")
        .belongs_to("role", "Role", "roleId")
        .has_many("attempts", "Attempt", "_participantId")
        .has_many("chats", "Chat", "_participantId")
});

/// A seat in a meeting, held by a user or a guest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(rename = "_participantId", default)]
    pub participant_pk: Option<i64>,
    pub participant_id: String,
    #[serde(rename = "_meetingId", default)]
    pub meeting_pk: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub role_id: Option<i64>,
    pub display_name: String,
    pub joined_at: Option<String>,
    pub left_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Participant {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
