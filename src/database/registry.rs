// Schema registry
// Holds every model descriptor by name and checks that keys and relations line up.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use super::models;
use super::schema::{EntitySchema, RelationDef, RelationKind};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Registered model descriptors, keyed by model name
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    models: HashMap<&'static str, &'static EntitySchema>,
    order: Vec<&'static str>,
}

/// A relation resolved against the registry
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRelation<'r> {
    pub relation: &'r RelationDef,
    pub target: &'static EntitySchema,
    /// Column on the source table used to match rows
    pub local_key: &'static str,
    /// Column on the target table used to match rows
    pub remote_key: &'static str,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every model of this crate, validated
    pub fn with_models() -> Result<Self> {
        let mut registry = Self::new();
        for schema in models::all_schemas() {
            registry.register(schema)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn register(&mut self, schema: &'static EntitySchema) -> Result<()> {
        if self.models.contains_key(schema.name) {
            bail!("Model {} is already registered", schema.name);
        }
        log::debug!("Registering model {} (table {})", schema.name, schema.table);
        self.models.insert(schema.name, schema);
        self.order.push(schema.name);
        Ok(())
    }

    pub fn get(&self, model: &str) -> Option<&'static EntitySchema> {
        self.models.get(model).copied()
    }

    pub fn require(&self, model: &str) -> Result<&'static EntitySchema> {
        match self.get(model) {
            Some(schema) => Ok(schema),
            None => bail!("Model {} is not registered", model),
        }
    }

    pub fn by_table(&self, table: &str) -> Option<&'static EntitySchema> {
        self.models.values().copied().find(|s| s.table == table)
    }

    /// Registered models in registration order
    pub fn schemas(&self) -> impl Iterator<Item = &'static EntitySchema> + '_ {
        self.order.iter().filter_map(|name| self.models.get(name).copied())
    }

    /// Resolve the relation an include refers to
    ///
    /// With an alias the relation is looked up by name; without one the source
    /// must have exactly one relation to `target`.
    pub fn resolve_relation<'s>(
        &self,
        source: &'s EntitySchema,
        target: &str,
        alias: Option<&str>,
    ) -> Result<ResolvedRelation<'s>> {
        let relation = match alias {
            Some(alias) => match source.get_relation(alias) {
                Some(relation) if relation.target == target => relation,
                Some(relation) => bail!(
                    "Relation {}.{} points at {}, not {}",
                    source.name,
                    alias,
                    relation.target,
                    target
                ),
                None => bail!("{} has no relation named {}", source.name, alias),
            },
            None => match source.relations_to(target).as_slice() {
                [only] => *only,
                [] => bail!("{} is not associated to {}", target, source.name),
                _ => bail!(
                    "{} is associated to {} more than once, include it by alias",
                    target,
                    source.name
                ),
            },
        };
        self.resolve(source, relation)
    }

    fn resolve<'s>(&self, source: &EntitySchema, relation: &'s RelationDef) -> Result<ResolvedRelation<'s>> {
        let target = self.require(relation.target)?;

        let (local_key, remote_key) = match relation.kind {
            RelationKind::BelongsTo => {
                let key = match relation.key.or_else(|| target.single_primary_key()) {
                    Some(key) => key,
                    None => bail!("{} has no single primary key for {}.{}", target.name, source.name, relation.alias),
                };
                (relation.foreign_key, key)
            }
            RelationKind::HasMany | RelationKind::HasOne => {
                let key = match relation.key.or_else(|| source.single_primary_key()) {
                    Some(key) => key,
                    None => bail!("{} has no single primary key for {}.{}", source.name, source.name, relation.alias),
                };
                (key, relation.foreign_key)
            }
        };

        if source.get_column(local_key).is_none() {
            bail!("{}.{} refers to missing column {}.{}", source.name, relation.alias, source.table, local_key);
        }
        if target.get_column(remote_key).is_none() {
            bail!("{}.{} refers to missing column {}.{}", source.name, relation.alias, target.table, remote_key);
        }

        Ok(ResolvedRelation {
            relation,
            target,
            local_key,
            remote_key,
        })
    }

    /// Check identifiers, keys and relations of every registered model
    pub fn validate(&self) -> Result<()> {
        for schema in self.schemas() {
            check_identifier(schema.table)?;
            if schema.primary_keys().is_empty() {
                bail!("Model {} has no primary key", schema.name);
            }

            for column in &schema.columns {
                check_identifier(column.name)?;
                if let Some(fk) = column.foreign_key() {
                    let Some(target) = self.by_table(fk.table) else {
                        bail!("{}.{} references unregistered table {}", schema.table, column.name, fk.table);
                    };
                    if target.get_column(fk.column).is_none() {
                        bail!("{}.{} references missing column {}.{}", schema.table, column.name, fk.table, fk.column);
                    }
                }
            }

            for relation in &schema.relations {
                self.resolve(schema, relation)?;
            }
        }

        log::debug!("Validated {} model schemas", self.order.len());
        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        bail!("Invalid SQL identifier: {:?}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{ColumnDef, ColumnType};

    #[test]
    fn test_with_models_validates() {
        let registry = SchemaRegistry::with_models().unwrap();
        assert_eq!(registry.schemas().count(), 8);
        assert_eq!(registry.get("Meeting").unwrap().table, "meetings");
        assert_eq!(registry.by_table("subjective_attempts").unwrap().name, "SubjectiveAttempt");
    }

    #[test]
    fn test_resolve_has_many_and_belongs_to() {
        let registry = SchemaRegistry::with_models().unwrap();
        let meeting = registry.require("Meeting").unwrap();

        let participants = registry.resolve_relation(meeting, "Participant", None).unwrap();
        assert_eq!(participants.local_key, "_meetingId");
        assert_eq!(participants.remote_key, "_meetingId");
        assert_eq!(participants.relation.alias, "participants");

        let host = registry.resolve_relation(meeting, "User", Some("host")).unwrap();
        assert_eq!(host.local_key, "hostId");
        assert_eq!(host.remote_key, "userId");
    }

    #[test]
    fn test_unrelated_include_is_rejected() {
        let registry = SchemaRegistry::with_models().unwrap();
        let user = registry.require("User").unwrap();
        let err = registry.resolve_relation(user, "Question", None).unwrap_err();
        assert!(err.to_string().contains("not associated"));
    }

    #[test]
    fn test_dangling_foreign_key_fails_validation() {
        static ORPHAN: Lazy<EntitySchema> = Lazy::new(|| {
            EntitySchema::new("Orphan", "orphans")
                .column(ColumnDef::new("orphanId", ColumnType::Integer).primary_key())
                .column(ColumnDef::new("parentId", ColumnType::Integer).references("parents", "parentId"))
        });

        let mut registry = SchemaRegistry::new();
        registry.register(&ORPHAN).unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("unregistered table parents"));
    }

    #[test]
    fn test_invalid_identifier() {
        static BAD: Lazy<EntitySchema> = Lazy::new(|| {
            EntitySchema::new("Bad", "bad table")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
        });

        let mut registry = SchemaRegistry::new();
        registry.register(&BAD).unwrap();
        assert!(registry.validate().is_err());
        assert!(registry.register(&BAD).is_err());
    }
}
