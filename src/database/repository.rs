// Model repository
// Native queries for one model plus the safe variants that force a
// policy-selected projection before delegating to them.

use std::marker::PhantomData;

use anyhow::{bail, Result};
use rusqlite::Connection;
use serde_json::Value;

use super::attributes::AttributePolicy;
use super::executor::Executor;
use super::query::{Condition, CreateOptions, FindOptions, FindOrCreateOptions, Values};
use super::record::Record;
use super::safe::apply_attribute_policy;
use super::schema::{Entity, EntitySchema};
use super::DatabaseManager;

/// Query access to the table behind `E`
pub struct Repository<'db, E: Entity> {
    db: &'db DatabaseManager,
    _marker: PhantomData<fn() -> E>,
}

impl DatabaseManager {
    /// Repository for a model
    pub fn repository<E: Entity>(&self) -> Repository<'_, E> {
        Repository {
            db: self,
            _marker: PhantomData,
        }
    }
}

impl<'db, E: Entity> Repository<'db, E> {
    pub fn schema(&self) -> &'static EntitySchema {
        E::schema()
    }

    /// Find all rows matching the options; every column when `options` is `None`
    pub fn find_all(&self, options: Option<FindOptions>) -> Result<Vec<Record>> {
        let options = options.unwrap_or_default();
        self.db.with_connection(|conn| self.executor(conn).find_all(E::schema(), &options))
    }

    pub fn find_one(&self, options: Option<FindOptions>) -> Result<Option<Record>> {
        let options = options.unwrap_or_default();
        self.db.with_connection(|conn| self.executor(conn).find_one(E::schema(), &options))
    }

    /// Find a row by primary key; composite keys take one value per key column
    pub fn find_by_pk(&self, pk: &[Value], options: Option<FindOptions>) -> Result<Option<Record>> {
        let mut options = options.unwrap_or_default();
        options.filter.extend(pk_filter(E::schema(), pk)?);
        self.find_one(Some(options))
    }

    /// Insert a row and read it back
    pub fn create(&self, values: Values, options: Option<CreateOptions>) -> Result<Record> {
        let attributes = options.and_then(|o| o.attributes);
        self.db
            .with_connection(|conn| create_impl(&self.executor(conn), E::schema(), &values, attributes))
    }

    /// Find the first match, or insert one built from the filter equalities and defaults
    ///
    /// Returns the record and whether it was created.
    pub fn find_or_create(&self, options: FindOrCreateOptions) -> Result<(Record, bool)> {
        self.db.with_transaction(|conn| {
            let executor = self.executor(conn);
            let schema = E::schema();
            let find = options.find_options();

            if let Some(record) = executor.find_one(schema, &find)? {
                return Ok((record, false));
            }

            let rowid = executor.insert(schema, &options.create_values())?;
            let reread = FindOptions {
                filter: vec![Condition::eq("rowid", rowid)],
                ..find
            };
            match executor.find_one(schema, &reread)? {
                Some(record) => Ok((record, true)),
                None => bail!("{} row {} vanished after insert", schema.name, rowid),
            }
        })
    }

    /// Update matching rows, returning how many changed
    pub fn update(&self, values: Values, filter: &[Condition]) -> Result<usize> {
        self.db
            .with_connection(|conn| self.executor(conn).update(E::schema(), &values, filter))
    }

    /// Delete matching rows, returning how many were removed
    pub fn destroy(&self, filter: &[Condition]) -> Result<usize> {
        self.db
            .with_connection(|conn| self.executor(conn).delete(E::schema(), filter))
    }

    pub fn count(&self, filter: &[Condition]) -> Result<i64> {
        self.db
            .with_connection(|conn| self.executor(conn).count(E::schema(), filter))
    }

    /// `find_all` decoded into the typed model
    pub fn find_all_typed(&self, options: Option<FindOptions>) -> Result<Vec<E>> {
        self.find_all(options)?.iter().map(Record::decode).collect()
    }

    pub fn find_all_safe(&self, policy: AttributePolicy, options: Option<FindOptions>) -> Result<Vec<Record>> {
        let options = self.restrict(policy, options)?;
        self.find_all(options)
    }

    pub fn find_one_safe(&self, policy: AttributePolicy, options: Option<FindOptions>) -> Result<Option<Record>> {
        let options = self.restrict(policy, options)?;
        self.find_one(options)
    }

    pub fn find_by_pk_safe(
        &self,
        policy: AttributePolicy,
        pk: &[Value],
        options: Option<FindOptions>,
    ) -> Result<Option<Record>> {
        let options = self.restrict(policy, options)?;
        self.find_by_pk(pk, options)
    }

    pub fn find_or_create_safe(
        &self,
        policy: AttributePolicy,
        mut options: FindOrCreateOptions,
    ) -> Result<(Record, bool)> {
        let restricted = self.restrict(
            policy,
            Some(FindOptions {
                attributes: options.attributes.take(),
                include: options.include.take(),
                ..FindOptions::default()
            }),
        )?;
        if let Some(restricted) = restricted {
            options.attributes = restricted.attributes;
            options.include = restricted.include;
        }
        self.find_or_create(options)
    }

    /// Insert a row and read it back with the policy projection
    pub fn create_safe(
        &self,
        policy: AttributePolicy,
        values: Values,
        options: Option<CreateOptions>,
    ) -> Result<Record> {
        let mut options = options.unwrap_or_default();
        options.attributes = Some(E::schema().get_attributes(policy));
        self.create(values, Some(options))
    }

    fn restrict(&self, policy: AttributePolicy, options: Option<FindOptions>) -> Result<Option<FindOptions>> {
        apply_attribute_policy(self.db.registry(), E::schema(), policy, options)
    }

    fn executor<'c>(&'c self, conn: &'c Connection) -> Executor<'c> {
        Executor::new(conn, self.db.registry())
    }
}

fn pk_filter(schema: &EntitySchema, pk: &[Value]) -> Result<Vec<Condition>> {
    let keys = schema.primary_keys();
    if keys.len() != pk.len() {
        bail!(
            "{} has {} primary key column(s), got {} value(s)",
            schema.name,
            keys.len(),
            pk.len()
        );
    }
    Ok(keys
        .iter()
        .zip(pk)
        .map(|(column, value)| Condition::eq(column.name, value.clone()))
        .collect())
}

fn create_impl(
    executor: &Executor<'_>,
    schema: &EntitySchema,
    values: &Values,
    attributes: Option<Vec<String>>,
) -> Result<Record> {
    let rowid = executor.insert(schema, values)?;
    match executor.find_by_rowid(schema, rowid, attributes)? {
        Some(record) => Ok(record),
        None => bail!("{} row {} vanished after insert", schema.name, rowid),
    }
}
