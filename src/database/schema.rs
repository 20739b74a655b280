// Entity schema descriptors
// Each table is described once as data: columns, key roles, defaults and relations.
// Models build their descriptor with the builders below; the registry and the
// query layer read it directly.

use serde::de::DeserializeOwned;

/// Name of the creation timestamp column added by `EntitySchema::timestamps`
pub const CREATED_AT: &str = "createdAt";
/// Name of the modification timestamp column added by `EntitySchema::timestamps`
pub const UPDATED_AT: &str = "updatedAt";

/// SQL default for timestamp columns; same text as `now_timestamp`
pub const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.sssZ`, matching `NOW_SQL`
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// SQL column type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    /// UTC timestamp stored as TEXT, see `now_timestamp`
    Timestamp,
    /// UUID stored as TEXT
    Uuid,
    /// JSON document stored as TEXT
    Json,
    /// TEXT restricted to a fixed set of values
    Enum(&'static [&'static str]),
}

impl ColumnType {
    /// The SQLite storage type used in DDL
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text
            | ColumnType::Timestamp
            | ColumnType::Uuid
            | ColumnType::Json
            | ColumnType::Enum(_) => "TEXT",
        }
    }

    /// Allowed values for enum columns
    pub fn enum_values(&self) -> Option<&'static [&'static str]> {
        match self {
            ColumnType::Enum(values) => Some(values),
            _ => None,
        }
    }
}

/// Default applied when an insert leaves the column out
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Literal text, applied by the SQL DEFAULT clause
    Text(&'static str),
    /// Literal integer, applied by the SQL DEFAULT clause
    Integer(i64),
    /// Current UTC time, filled in on insert
    Now,
    /// Random v4 UUID, filled in on insert
    UuidV4,
}

impl DefaultValue {
    /// The expression the table DDL declares as DEFAULT, `None` when SQLite has none
    pub fn sql_default(&self) -> Option<String> {
        match self {
            DefaultValue::Text(text) => Some(format!("'{}'", text.replace('\'', "''"))),
            DefaultValue::Integer(value) => Some(value.to_string()),
            DefaultValue::Now => Some(NOW_SQL.to_string()),
            DefaultValue::UuidV4 => None,
        }
    }

    /// Produce a generated value, `None` for literal defaults
    pub fn generate(&self) -> Option<serde_json::Value> {
        match self {
            DefaultValue::Now => Some(now_timestamp().into()),
            DefaultValue::UuidV4 => Some(uuid::Uuid::new_v4().to_string().into()),
            DefaultValue::Text(_) | DefaultValue::Integer(_) => None,
        }
    }
}

/// A foreign-key reference to another table's column
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// The role a column plays in keys
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRole {
    None,
    Primary,
    Foreign(ForeignKey),
    /// Part of a composite primary key and also a reference to another table
    PrimaryForeign(ForeignKey),
}

/// A single column declaration
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub unique: bool,
    pub indexed: bool,
    pub auto_increment: bool,
    pub key: KeyRole,
}

impl ColumnDef {
    /// A nullable, unkeyed column
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            default: None,
            unique: false,
            indexed: false,
            auto_increment: false,
            key: KeyRole::None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Integer primary key assigned by SQLite
    pub fn primary_key(mut self) -> Self {
        self.key = match self.key {
            KeyRole::Foreign(fk) | KeyRole::PrimaryForeign(fk) => KeyRole::PrimaryForeign(fk),
            KeyRole::None | KeyRole::Primary => KeyRole::Primary,
        };
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Reference `table.column`
    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        let fk = ForeignKey { table, column };
        self.key = match self.key {
            KeyRole::Primary | KeyRole::PrimaryForeign(_) => KeyRole::PrimaryForeign(fk),
            KeyRole::None | KeyRole::Foreign(_) => KeyRole::Foreign(fk),
        };
        self
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.key, KeyRole::Primary | KeyRole::PrimaryForeign(_))
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        match &self.key {
            KeyRole::Foreign(fk) | KeyRole::PrimaryForeign(fk) => Some(fk),
            KeyRole::None | KeyRole::Primary => None,
        }
    }

    /// Index columns are primary or foreign keys
    pub fn is_index(&self) -> bool {
        !matches!(self.key, KeyRole::None)
    }
}

/// Relation cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The foreign key lives on this table and points at the target
    BelongsTo,
    /// The foreign key lives on the target and points at this table
    HasMany,
    /// Like `HasMany`, but embeds at most one row
    HasOne,
}

/// A named relation from one model to another
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// Key the included rows are embedded under
    pub alias: &'static str,
    pub kind: RelationKind,
    /// Target model name
    pub target: &'static str,
    pub foreign_key: &'static str,
    /// Column the foreign key points at; the primary key when `None`
    pub key: Option<&'static str>,
}

/// Complete descriptor of one table-backed model
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: Vec<ColumnDef>,
    pub relations: Vec<RelationDef>,
    pub timestamps: bool,
}

impl EntitySchema {
    pub fn new(name: &'static str, table: &'static str) -> Self {
        Self {
            name,
            table,
            columns: Vec::new(),
            relations: Vec::new(),
            timestamps: false,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Add `createdAt` / `updatedAt`, both defaulting to now
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self.columns.push(
            ColumnDef::new(CREATED_AT, ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::Now),
        );
        self.columns.push(
            ColumnDef::new(UPDATED_AT, ColumnType::Timestamp)
                .not_null()
                .default(DefaultValue::Now),
        );
        self
    }

    pub fn belongs_to(self, alias: &'static str, target: &'static str, foreign_key: &'static str) -> Self {
        self.relation(alias, RelationKind::BelongsTo, target, foreign_key)
    }

    pub fn has_many(self, alias: &'static str, target: &'static str, foreign_key: &'static str) -> Self {
        self.relation(alias, RelationKind::HasMany, target, foreign_key)
    }

    pub fn has_one(self, alias: &'static str, target: &'static str, foreign_key: &'static str) -> Self {
        self.relation(alias, RelationKind::HasOne, target, foreign_key)
    }

    fn relation(
        mut self,
        alias: &'static str,
        kind: RelationKind,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relations.push(RelationDef {
            alias,
            kind,
            target,
            foreign_key,
            key: None,
        });
        self
    }

    /// Look up a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_string()).collect()
    }

    /// Primary key columns in declaration order
    pub fn primary_keys(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.is_primary_key()).collect()
    }

    /// The primary key when it is a single column
    pub fn single_primary_key(&self) -> Option<&'static str> {
        match self.primary_keys().as_slice() {
            [only] => Some(only.name),
            _ => None,
        }
    }

    /// Relation by alias
    pub fn get_relation(&self, alias: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.alias == alias)
    }

    /// Relations pointing at a target model
    pub fn relations_to(&self, target: &str) -> Vec<&RelationDef> {
        self.relations.iter().filter(|r| r.target == target).collect()
    }
}

/// A table-backed model with a static descriptor
///
/// Implemented once per model; `Repository<E>` is generic over it.
pub trait Entity: DeserializeOwned + Send + 'static {
    fn schema() -> &'static EntitySchema;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntitySchema {
        EntitySchema::new("Sample", "samples")
            .column(ColumnDef::new("_sampleId", ColumnType::Integer).primary_key().auto_increment())
            .column(ColumnDef::new("ownerId", ColumnType::Integer).not_null().references("owners", "ownerId"))
            .column(ColumnDef::new("label", ColumnType::Text))
            .timestamps()
            .belongs_to("owner", "Owner", "ownerId")
    }

    #[test]
    fn test_builder_key_roles() {
        let schema = sample();
        let pk = schema.get_column("_sampleId").unwrap();
        assert!(pk.is_primary_key());
        assert!(!pk.nullable);

        let fk = schema.get_column("ownerId").unwrap();
        assert_eq!(fk.foreign_key().unwrap().table, "owners");
        assert!(fk.is_index());
        assert!(!schema.get_column("label").unwrap().is_index());
    }

    #[test]
    fn test_composite_key_column() {
        let column = ColumnDef::new("_attemptId", ColumnType::Integer)
            .references("attempts", "_attemptId")
            .primary_key();
        assert!(column.is_primary_key());
        assert_eq!(column.foreign_key().unwrap().column, "_attemptId");
    }

    #[test]
    fn test_timestamps_appended() {
        let schema = sample();
        assert_eq!(
            schema.column_names(),
            vec!["_sampleId", "ownerId", "label", CREATED_AT, UPDATED_AT]
        );
        assert_eq!(schema.single_primary_key(), Some("_sampleId"));
        assert_eq!(schema.relations_to("Owner").len(), 1);
    }

    #[test]
    fn test_generated_defaults() {
        assert!(DefaultValue::UuidV4.generate().unwrap().as_str().unwrap().len() == 36);
        assert!(DefaultValue::Text("public").generate().is_none());
        assert_eq!(DefaultValue::Text("public").sql_default().as_deref(), Some("'public'"));
        assert_eq!(DefaultValue::Integer(1).sql_default().as_deref(), Some("1"));
        assert!(DefaultValue::UuidV4.sql_default().is_none());
    }

    #[test]
    fn test_now_timestamp_format() {
        let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").unwrap();
        assert!(re.is_match(&now_timestamp()));
        let generated = DefaultValue::Now.generate().unwrap();
        assert!(re.is_match(generated.as_str().unwrap()));
    }
}
