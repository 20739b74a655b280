// Database module for the meeting store
// SQLite persistence for users, meetings, participants, chat and quizzes,
// with model descriptors and policy-restricted query helpers

pub mod attributes;
pub mod executor;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod query;
pub mod record;
pub mod registry;
pub mod repository;
pub mod safe;
pub mod schema;
pub mod shared;

pub use attributes::AttributePolicy;
pub use manager::DatabaseManager;
pub use models::*;
pub use query::{
    values_from_json, Condition, CreateOptions, Direction, FindOptions, FindOrCreateOptions, Include,
    IncludeSpec, Op, OrderBy, Values,
};
pub use record::Record;
pub use registry::SchemaRegistry;
pub use repository::Repository;
pub use safe::{apply_attribute_policy, restrict_include};
pub use schema::{ColumnDef, ColumnType, DefaultValue, Entity, EntitySchema, RelationKind};
pub use shared::SharedDatabase;
