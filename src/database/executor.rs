// Query executor
// Renders query options into SQLite statements and runs them on a connection.
// Includes are loaded one level per query (`WHERE key IN (...)`) and stitched
// into their parent rows under the relation alias.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};

use super::query::{Condition, FindOptions, IncludeSpec, Op, OrderBy, Values};
use super::record::{from_sql_value, to_sql_value, Record};
use super::registry::{ResolvedRelation, SchemaRegistry};
use super::schema::{now_timestamp, ColumnDef, EntitySchema, RelationKind, UPDATED_AT};
use crate::{sql_debug, sql_trace};

/// Parent keys bound per include query
const IN_CHUNK_SIZE: usize = 1000;

/// Quote an SQL identifier
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Table-qualified column, so an unknown name is an error rather than a string literal
fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote(table), quote(column))
}

fn render_condition(table: &str, condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    match condition {
        Condition::Compare { column, op } => {
            let column = qualified(table, column);
            match op {
                Op::Eq(Value::Null) | Op::IsNull => format!("{} IS NULL", column),
                Op::Ne(Value::Null) | Op::NotNull => format!("{} IS NOT NULL", column),
                Op::Eq(value) => bind(&column, "=", value, params),
                Op::Ne(value) => bind(&column, "<>", value, params),
                Op::Gt(value) => bind(&column, ">", value, params),
                Op::Gte(value) => bind(&column, ">=", value, params),
                Op::Lt(value) => bind(&column, "<", value, params),
                Op::Lte(value) => bind(&column, "<=", value, params),
                Op::Like(pattern) => {
                    params.push(SqlValue::Text(pattern.clone()));
                    format!("{} LIKE ?", column)
                }
                Op::In(values) if values.is_empty() => "0 = 1".to_string(),
                Op::In(values) => {
                    params.extend(values.iter().map(to_sql_value));
                    let placeholders = vec!["?"; values.len()].join(", ");
                    format!("{} IN ({})", column, placeholders)
                }
            }
        }
        Condition::Any(conditions) if conditions.is_empty() => "0 = 1".to_string(),
        Condition::Any(conditions) => group(table, conditions, " OR ", params),
        Condition::All(conditions) if conditions.is_empty() => "1 = 1".to_string(),
        Condition::All(conditions) => group(table, conditions, " AND ", params),
    }
}

fn bind(column: &str, sql_op: &str, value: &Value, params: &mut Vec<SqlValue>) -> String {
    params.push(to_sql_value(value));
    format!("{} {} ?", column, sql_op)
}

fn group(table: &str, conditions: &[Condition], joiner: &str, params: &mut Vec<SqlValue>) -> String {
    let parts: Vec<String> = conditions
        .iter()
        .map(|c| render_condition(table, c, params))
        .collect();
    format!("({})", parts.join(joiner))
}

fn where_clause(table: &str, filter: &[Condition], params: &mut Vec<SqlValue>) -> String {
    if filter.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filter
        .iter()
        .map(|c| render_condition(table, c, params))
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn order_clause(table: &str, order: &[OrderBy]) -> String {
    if order.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = order
        .iter()
        .map(|o| format!("{} {}", qualified(table, &o.column), o.direction.as_sql()))
        .collect();
    format!(" ORDER BY {}", parts.join(", "))
}

fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (None, None) => String::new(),
        (Some(limit), None) => format!(" LIMIT {}", limit),
        (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
        // SQLite needs a LIMIT before OFFSET
        (None, Some(offset)) => format!(" LIMIT -1 OFFSET {}", offset),
    }
}

/// One level of a select, as handed down the include tree
struct Select<'q> {
    attributes: Option<&'q [String]>,
    filter: Vec<Condition>,
    order: &'q [OrderBy],
    limit: Option<u64>,
    offset: Option<u64>,
    includes: &'q [IncludeSpec],
}

/// A fetched row: projected values plus the join keys needed to stitch includes
struct LoadedRow {
    values: Map<String, Value>,
    keys: Map<String, Value>,
}

fn group_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Runs queries for registered models on one connection
pub struct Executor<'a> {
    conn: &'a Connection,
    registry: &'a SchemaRegistry,
}

impl<'a> Executor<'a> {
    pub fn new(conn: &'a Connection, registry: &'a SchemaRegistry) -> Self {
        Self { conn, registry }
    }

    /// Select rows with their includes
    pub fn find_all(&self, schema: &EntitySchema, options: &FindOptions) -> Result<Vec<Record>> {
        let select = Select {
            attributes: options.attributes.as_deref(),
            filter: options.filter.clone(),
            order: &options.order,
            limit: options.limit,
            offset: options.offset,
            includes: options.include.as_ref().map(|i| i.specs()).unwrap_or(&[]),
        };

        let rows = self.load(schema, &select, None)?;
        Ok(rows
            .into_iter()
            .map(|row| Record::new(schema.name, row.values))
            .collect())
    }

    pub fn find_one(&self, schema: &EntitySchema, options: &FindOptions) -> Result<Option<Record>> {
        let mut options = options.clone();
        options.limit = Some(1);
        Ok(self.find_all(schema, &options)?.into_iter().next())
    }

    fn load(&self, schema: &EntitySchema, select: &Select<'_>, join_key: Option<&str>) -> Result<Vec<LoadedRow>> {
        let projection: Vec<String> = match select.attributes {
            Some(attributes) => attributes.to_vec(),
            None => schema.column_names(),
        };

        let relations = select
            .includes
            .iter()
            .map(|spec| {
                let resolved = self
                    .registry
                    .resolve_relation(schema, &spec.model, spec.alias.as_deref())?;
                Ok((spec, resolved))
            })
            .collect::<Result<Vec<_>>>()?;

        // Join keys are fetched even when the projection leaves them out
        let mut hidden: Vec<&str> = Vec::new();
        for key in join_key.into_iter().chain(relations.iter().map(|(_, r)| r.local_key)) {
            if !hidden.contains(&key) {
                hidden.push(key);
            }
        }
        let mut selected = projection.clone();
        for key in &hidden {
            if !selected.iter().any(|c| c == key) {
                selected.push(key.to_string());
            }
        }

        let mut params = Vec::new();
        let columns: Vec<String> = selected.iter().map(|c| qualified(schema.table, c)).collect();
        // An empty projection still yields one (empty) record per row
        let columns = if columns.is_empty() { "1".to_string() } else { columns.join(", ") };
        let sql = format!(
            "SELECT {} FROM {}{}{}{}",
            columns,
            quote(schema.table),
            where_clause(schema.table, &select.filter, &mut params),
            order_clause(schema.table, select.order),
            limit_clause(select.limit, select.offset),
        );
        sql_debug!("{}", sql);
        sql_trace!("params: {:?}", params);

        let column_defs: Vec<Option<&ColumnDef>> = selected.iter().map(|c| schema.get_column(c)).collect();
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare {} query", schema.name))?;

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut values = Map::new();
                let mut keys = Map::new();
                for (idx, name) in selected.iter().enumerate() {
                    let value = from_sql_value(row.get_ref(idx)?, column_defs[idx]);
                    if hidden.contains(&name.as_str()) {
                        keys.insert(name.clone(), value.clone());
                    }
                    if idx < projection.len() {
                        values.insert(name.clone(), value);
                    }
                }
                Ok(LoadedRow { values, keys })
            })
            .with_context(|| format!("Failed to query {}", schema.name))?;

        let mut rows = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to collect {} rows", schema.name))?;

        for (spec, resolved) in &relations {
            self.attach(&mut rows, spec, resolved)?;
        }

        Ok(rows)
    }

    fn attach(&self, rows: &mut [LoadedRow], spec: &IncludeSpec, resolved: &ResolvedRelation<'_>) -> Result<()> {
        let mut seen = HashSet::new();
        let mut parent_keys = Vec::new();
        for row in rows.iter() {
            if let Some(value) = row.keys.get(resolved.local_key) {
                if let Some(key) = group_key(value) {
                    if seen.insert(key) {
                        parent_keys.push(value.clone());
                    }
                }
            }
        }

        // Each chunk stays well under SQLite's bound-variable limit
        let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
        for chunk in parent_keys.chunks(IN_CHUNK_SIZE) {
            let mut filter = spec.filter.clone();
            filter.push(Condition::is_in(resolved.remote_key, chunk.to_vec()));

            let select = Select {
                attributes: spec.attributes.as_deref(),
                filter,
                order: &spec.order,
                limit: None,
                offset: None,
                includes: spec.include.as_ref().map(|i| i.specs()).unwrap_or(&[]),
            };

            for child in self.load(resolved.target, &select, Some(resolved.remote_key))? {
                if let Some(key) = child.keys.get(resolved.remote_key).and_then(group_key) {
                    grouped.entry(key).or_default().push(Value::Object(child.values));
                }
            }
        }

        for row in rows.iter_mut() {
            let children = row
                .keys
                .get(resolved.local_key)
                .and_then(group_key)
                .and_then(|key| grouped.get(&key));

            let embedded = match resolved.relation.kind {
                RelationKind::HasMany => Value::Array(children.cloned().unwrap_or_default()),
                RelationKind::BelongsTo | RelationKind::HasOne => children
                    .and_then(|c| c.first().cloned())
                    .unwrap_or(Value::Null),
            };
            row.values.insert(resolved.relation.alias.to_string(), embedded);
        }

        Ok(())
    }

    /// Insert a row, filling generated defaults, and return its rowid
    pub fn insert(&self, schema: &EntitySchema, values: &Values) -> Result<i64> {
        let mut row = values.clone();
        for column in &schema.columns {
            if row.contains_key(column.name) {
                continue;
            }
            if let Some(value) = column.default.as_ref().and_then(|d| d.generate()) {
                row.insert(column.name.to_string(), value);
            }
        }

        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(schema.table))
        } else {
            let columns: Vec<String> = row.keys().map(|c| quote(c)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(schema.table),
                columns.join(", "),
                vec!["?"; row.len()].join(", ")
            )
        };
        let params: Vec<SqlValue> = row.values().map(to_sql_value).collect();
        sql_debug!("{}", sql);
        sql_trace!("params: {:?}", params);

        self.conn
            .execute(&sql, params_from_iter(params.iter()))
            .with_context(|| format!("Failed to insert {}", schema.name))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Re-read a row by rowid with the given projection
    pub fn find_by_rowid(
        &self,
        schema: &EntitySchema,
        rowid: i64,
        attributes: Option<Vec<String>>,
    ) -> Result<Option<Record>> {
        let options = FindOptions {
            attributes,
            filter: vec![Condition::eq("rowid", rowid)],
            ..FindOptions::default()
        };
        self.find_one(schema, &options)
    }

    /// Update matching rows; refreshes `updatedAt` on timestamped models
    pub fn update(&self, schema: &EntitySchema, values: &Values, filter: &[Condition]) -> Result<usize> {
        let mut values = values.clone();
        if schema.timestamps && !values.contains_key(UPDATED_AT) {
            values.insert(UPDATED_AT.to_string(), Value::String(now_timestamp()));
        }
        if values.is_empty() {
            return Ok(0);
        }

        let mut params: Vec<SqlValue> = values.values().map(to_sql_value).collect();
        let assignments: Vec<String> = values.keys().map(|c| format!("{} = ?", quote(c))).collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote(schema.table),
            assignments.join(", "),
            where_clause(schema.table, filter, &mut params),
        );
        sql_debug!("{}", sql);
        sql_trace!("params: {:?}", params);

        self.conn
            .execute(&sql, params_from_iter(params.iter()))
            .with_context(|| format!("Failed to update {}", schema.name))
    }

    /// Delete matching rows
    pub fn delete(&self, schema: &EntitySchema, filter: &[Condition]) -> Result<usize> {
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {}{}",
            quote(schema.table),
            where_clause(schema.table, filter, &mut params),
        );
        sql_debug!("{}", sql);

        self.conn
            .execute(&sql, params_from_iter(params.iter()))
            .with_context(|| format!("Failed to delete {}", schema.name))
    }

    pub fn count(&self, schema: &EntitySchema, filter: &[Condition]) -> Result<i64> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote(schema.table),
            where_clause(schema.table, filter, &mut params),
        );
        sql_debug!("{}", sql);

        self.conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
            .with_context(|| format!("Failed to count {}", schema.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::query::Direction;
    use serde_json::json;

    #[test]
    fn test_render_conditions() {
        let mut params = Vec::new();
        let sql = where_clause(
            "users",
            &[
                Condition::eq("email", "a@b.com"),
                Condition::Any(vec![Condition::is_null("password"), Condition::ne("userId", 3)]),
                Condition::is_in("userId", vec![]),
            ],
            &mut params,
        );
        assert_eq!(
            sql,
            " WHERE \"users\".\"email\" = ? AND (\"users\".\"password\" IS NULL OR \"users\".\"userId\" <> ?) AND 0 = 1"
        );
        assert_eq!(params, vec![SqlValue::Text("a@b.com".into()), SqlValue::Integer(3)]);
    }

    #[test]
    fn test_eq_null_renders_is_null() {
        let mut params = Vec::new();
        let sql = where_clause("chats", &[Condition::eq("_participantId", json!(null))], &mut params);
        assert_eq!(sql, " WHERE \"chats\".\"_participantId\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_order_and_limit() {
        let order = vec![OrderBy {
            column: "createdAt".into(),
            direction: Direction::Desc,
        }];
        assert_eq!(order_clause("chats", &order), " ORDER BY \"chats\".\"createdAt\" DESC");
        assert_eq!(limit_clause(Some(10), Some(20)), " LIMIT 10 OFFSET 20");
        assert_eq!(limit_clause(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(limit_clause(None, None), "");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("type"), "\"type\"");
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
