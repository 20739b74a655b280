// Database models - User
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, Entity, EntitySchema};

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("User", "users")
        .column(ColumnDef::new("userId", ColumnType::Integer).primary_key().auto_increment())
        .column(ColumnDef::new("email", ColumnType::Text).not_null().unique())
        .column(ColumnDef::new("password", ColumnType::Text).not_null())
        .has_many("meetings", "Meeting", "hostId")
        .has_many("participations", "Participant", "userId")
});

/// An account that can host or join meetings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub email: String,
    /// Password hash, never the plain text
    pub password: String,
}

impl Entity for User {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
