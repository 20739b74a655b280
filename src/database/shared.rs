// Shared async access to the database
// Runs repository calls on tokio's blocking pool so async callers never hold
// the connection lock on a runtime worker.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

use super::attributes::AttributePolicy;
use super::query::{CreateOptions, FindOptions, FindOrCreateOptions, Values};
use super::record::Record;
use super::schema::Entity;
use super::DatabaseManager;

/// Cloneable handle to a DatabaseManager
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<DatabaseManager>,
}

impl SharedDatabase {
    pub fn new(db: DatabaseManager) -> Self {
        Self {
            inner: Arc::new(db),
        }
    }

    pub fn inner(&self) -> &DatabaseManager {
        &self.inner
    }

    pub fn arc(&self) -> Arc<DatabaseManager> {
        self.inner.clone()
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatabaseManager) -> Result<T> + Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .context("Database task panicked")?
    }

    pub async fn find_all_safe<E: Entity>(
        &self,
        policy: AttributePolicy,
        options: Option<FindOptions>,
    ) -> Result<Vec<Record>> {
        self.run(move |db| db.repository::<E>().find_all_safe(policy, options))
            .await
    }

    pub async fn find_one_safe<E: Entity>(
        &self,
        policy: AttributePolicy,
        options: Option<FindOptions>,
    ) -> Result<Option<Record>> {
        self.run(move |db| db.repository::<E>().find_one_safe(policy, options))
            .await
    }

    pub async fn find_by_pk_safe<E: Entity>(
        &self,
        policy: AttributePolicy,
        pk: Vec<Value>,
        options: Option<FindOptions>,
    ) -> Result<Option<Record>> {
        self.run(move |db| db.repository::<E>().find_by_pk_safe(policy, &pk, options))
            .await
    }

    pub async fn find_or_create_safe<E: Entity>(
        &self,
        policy: AttributePolicy,
        options: FindOrCreateOptions,
    ) -> Result<(Record, bool)> {
        self.run(move |db| db.repository::<E>().find_or_create_safe(policy, options))
            .await
    }

    pub async fn create_safe<E: Entity>(
        &self,
        policy: AttributePolicy,
        values: Values,
        options: Option<CreateOptions>,
    ) -> Result<Record> {
        self.run(move |db| db.repository::<E>().create_safe(policy, values, options))
            .await
    }
}

impl std::ops::Deref for SharedDatabase {
    type Target = DatabaseManager;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
