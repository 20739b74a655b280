// Database models - Role
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::database::schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema};

static SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Role", "roles")
        .column(ColumnDef::new("roleId", ColumnType::Integer).primary_key().auto_increment())
        .column(ColumnDef::new("name", ColumnType::Text).not_null().unique())
        .column(
            ColumnDef::new("canPresent", ColumnType::Boolean)
                .not_null()
                .default(DefaultValue::Integer(0)),
        )
        .column(
            ColumnDef::new("canModerate", ColumnType::Boolean)
                .not_null()
                .default(DefaultValue::Integer(0)),
        )
        .has_many("participants", "Participant", "roleId")
});

/// Permission set a participant holds inside a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    pub role_id: Option<i64>,
    pub name: String,
    pub can_present: bool,
    pub can_moderate: bool,
}

impl Role {
    /// Names of the roles seeded by the initial migration
    pub const HOST: &'static str = "host";
    pub const MODERATOR: &'static str = "moderator";
    pub const ATTENDEE: &'static str = "attendee";
}

impl Entity for Role {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }
}
