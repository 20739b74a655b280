// Database models - Chat
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

/// Chat message visibility
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Public,
    Private,
    System,
}

impl ChatType {
    pub const ALL: &'static [&'static str] = &["public", "private", "system"];
    pub const DEFAULT: &'static str = "public";

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Public => "public",
            ChatType::Private => "private",
            ChatType::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "public" => ChatType::Public,
            "private" => ChatType::Private,
            "system" => ChatType::System,
            _ => ChatType::Public,
        }
    }
}

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Chat", "chats")
        .column(ColumnDef::new("_chatId", ColumnType::Integer).primary_key().auto_increment())
        .column(
            ColumnDef::new("chatId", ColumnType::Uuid)
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
        // System messages have no sender
        .column(
            ColumnDef::new("_participantId", ColumnType::Integer)
                .references("participants", "_participantId"),
        )
        .column(ColumnDef::new("message", ColumnType::Text).not_null())
        .column(
            ColumnDef::new("type", ColumnType::Enum(ChatType::ALL))
                .not_null()
                .default(DefaultValue::Text(ChatType::DEFAULT)),
        )
        .timestamps()
        .belongs_to("meeting", "Meeting", "_meetingId")
        .belongs_to("sender", "Participant", "_participantId")
});

/// A chat message posted in a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_chatId", default)]
    pub chat_pk: Option<i64>,
    pub chat_id: String,
    #[serde(rename = "_meetingId", default)]
    pub meeting_pk: Option<i64>,
    #[serde(rename = "_participantId", default)]
    pub participant_pk: Option<i64>,
    pub message: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Chat {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
