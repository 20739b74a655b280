// Database models - Meeting
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

/// Meeting lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl MeetingStatus {
    pub const ALL: &'static [&'static str] = &["scheduled", "live", "ended", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Live => "live",
            MeetingStatus::Ended => "ended",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "scheduled" => MeetingStatus::Scheduled,
            "live" => MeetingStatus::Live,
            "ended" => MeetingStatus::Ended,
            "cancelled" => MeetingStatus::Cancelled,
            _ => MeetingStatus::Scheduled,
        }
    }
}

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Meeting", "meetings")
        .column(ColumnDef::new("_meetingId", ColumnType::Integer).primary_key().auto_increment())
        .column(
            ColumnDef::new("meetingId", ColumnType::Uuid)
                .not_null()
                .unique()
                .default(DefaultValue::UuidV4),
        )
        .column(
            ColumnDef::new("hostId", ColumnType::Integer)
                .not_null()
                .indexed()
                .references("users", "userId"),
        )
        .column(ColumnDef::new("title", ColumnType::Text).not_null())
        .column(
            ColumnDef::new("status", ColumnType::Enum(MeetingStatus::ALL))
                .not_null()
                .default(DefaultValue::Text("scheduled")),
        )
        .column(ColumnDef::new("scheduledAt", ColumnType::Timestamp))
        .column(ColumnDef::new("startedAt", ColumnType::Timestamp))
        .column(ColumnDef::new("endedAt", ColumnType::Timestamp))
        .timestamps()
        .belongs_to("host", "User", "hostId")
        .has_many("participants", "Participant", "_meetingId")
        .has_many("chats", "Chat", "_meetingId")
        .has_many("questions", "Question", "_meetingId")
        .has_many("attempts", "Attempt", "_meetingId")
});

/// A meeting hosted by a user
///
/// `_meetingId` is the join key; `meetingId` is the identifier handed out to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(rename = "_meetingId", default)]
    pub meeting_pk: Option<i64>,
    pub meeting_id: String,
    #[serde(default)]
    pub host_id: Option<i64>,
    pub title: String,
    pub status: MeetingStatus,
    pub scheduled_at: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Meeting {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
