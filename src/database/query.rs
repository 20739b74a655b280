// Query option types
// The shape callers hand to the repository: filters, includes, ordering, paging
// and the projection the safe helpers inject.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column values for inserts and updates, keyed by column name
pub type Values = serde_json::Map<String, Value>;

/// Column values from a JSON object
pub fn values_from_json(value: Value) -> Result<Values> {
    match value {
        Value::Object(values) => Ok(values),
        other => bail!("Expected an object of column values, got {}", other),
    }
}

/// Comparison applied to a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Like(String),
    In(Vec<Value>),
    IsNull,
    NotNull,
}

/// A filter condition; a list of conditions is ANDed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Compare { column: String, op: Op },
    /// True when any inner condition holds
    Any(Vec<Condition>),
    /// True when every inner condition holds
    All(Vec<Condition>),
}

impl Condition {
    pub fn compare(column: impl Into<String>, op: Op) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Eq(value.into()))
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Op::Ne(value.into()))
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(column, Op::In(values))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::compare(column, Op::IsNull)
    }

    /// The column/value pair when this is a plain equality test
    pub fn as_equality(&self) -> Option<(&str, &Value)> {
        match self {
            Condition::Compare {
                column,
                op: Op::Eq(value),
            } => Some((column.as_str(), value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// A relation expansion: embed rows of `model` into each parent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeSpec {
    /// Target model name
    pub model: String,
    /// Relation alias, required when the parent relates to `model` more than once
    pub alias: Option<String>,
    /// Columns of the included rows, all columns when `None`
    pub attributes: Option<Vec<String>>,
    #[serde(default)]
    pub filter: Vec<Condition>,
    #[serde(default)]
    pub order: Vec<OrderBy>,
    pub include: Option<Include>,
}

impl IncludeSpec {
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            alias: None,
            attributes: None,
            filter: Vec::new(),
            order: Vec::new(),
            include: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn include(mut self, include: impl Into<Include>) -> Self {
        self.include = Some(include.into());
        self
    }
}

/// One include descriptor or a collection of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Include {
    One(Box<IncludeSpec>),
    Many(Vec<IncludeSpec>),
}

impl Include {
    pub fn into_vec(self) -> Vec<IncludeSpec> {
        match self {
            Include::One(spec) => vec![*spec],
            Include::Many(specs) => specs,
        }
    }

    pub fn specs(&self) -> &[IncludeSpec] {
        match self {
            Include::One(spec) => std::slice::from_ref(spec.as_ref()),
            Include::Many(specs) => specs,
        }
    }
}

impl From<IncludeSpec> for Include {
    fn from(spec: IncludeSpec) -> Self {
        Include::One(Box::new(spec))
    }
}

impl From<Vec<IncludeSpec>> for Include {
    fn from(specs: Vec<IncludeSpec>) -> Self {
        Include::Many(specs)
    }
}

/// Options for find queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// Projection; all columns when `None`
    pub attributes: Option<Vec<String>>,
    pub filter: Vec<Condition>,
    pub include: Option<Include>,
    pub order: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn include(mut self, include: impl Into<Include>) -> Self {
        self.include = Some(include.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Options for `create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    /// Columns of the returned record; all columns when `None`
    pub attributes: Option<Vec<String>>,
}

/// Options for `find_or_create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOrCreateOptions {
    /// Lookup filter; its equality conditions also seed the created row
    pub filter: Vec<Condition>,
    /// Extra column values used only when a row is created
    pub defaults: Values,
    pub attributes: Option<Vec<String>>,
    pub include: Option<Include>,
}

impl FindOrCreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn default_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(column.into(), value.into());
        self
    }

    /// The find half of the operation
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            attributes: self.attributes.clone(),
            filter: self.filter.clone(),
            include: self.include.clone(),
            order: Vec::new(),
            limit: Some(1),
            offset: None,
        }
    }

    /// Row values used when nothing matched: filter equalities, then defaults
    pub fn create_values(&self) -> Values {
        let mut values = Values::new();
        for condition in &self.filter {
            if let Some((column, value)) = condition.as_equality() {
                values.insert(column.to_string(), value.clone());
            }
        }
        for (column, value) in &self.defaults {
            values.insert(column.clone(), value.clone());
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_include_normalisation() {
        let one: Include = IncludeSpec::model("Participant").into();
        assert_eq!(one.specs().len(), 1);
        assert_eq!(one.into_vec()[0].model, "Participant");

        let many: Include = vec![IncludeSpec::model("Chat"), IncludeSpec::model("Question")].into();
        assert_eq!(many.specs().len(), 2);
    }

    #[test]
    fn test_include_builder() {
        let spec = IncludeSpec::model("User")
            .alias("host")
            .attributes(["email"])
            .include(IncludeSpec::model("Meeting"));
        assert_eq!(spec.alias.as_deref(), Some("host"));
        assert_eq!(spec.attributes, Some(vec!["email".to_string()]));
        assert!(matches!(spec.include, Some(Include::One(_))));
    }

    #[test]
    fn test_values_from_json() {
        let values = values_from_json(json!({"title": "Standup"})).unwrap();
        assert_eq!(values.get("title"), Some(&json!("Standup")));
        assert!(values_from_json(json!(["title"])).is_err());
    }

    #[test]
    fn test_sparse_options_from_json() {
        let options: FindOptions =
            serde_json::from_value(json!({"limit": 5, "include": {"model": "Participant"}})).unwrap();
        assert_eq!(options.limit, Some(5));
        assert!(options.filter.is_empty());
        assert_eq!(options.include, Some(Include::One(Box::new(IncludeSpec::model("Participant")))));

        let options: FindOptions = serde_json::from_value(json!({
            "include": [{"model": "User", "alias": "host", "include": {"model": "Meeting"}}]
        }))
        .unwrap();
        let host = &options.include.unwrap().into_vec()[0];
        assert_eq!(host.alias.as_deref(), Some("host"));
        assert_eq!(host.include.as_ref().unwrap().specs()[0].model, "Meeting");

        let options: FindOrCreateOptions = serde_json::from_value(json!({"attributes": ["name"]})).unwrap();
        assert!(options.filter.is_empty() && options.defaults.is_empty());

        let original = FindOptions::new()
            .filter(Condition::eq("status", "live"))
            .include(IncludeSpec::model("Chat").order_by("createdAt", Direction::Desc))
            .limit(10);
        let reread: FindOptions = serde_json::from_value(serde_json::to_value(&original).unwrap()).unwrap();
        assert_eq!(reread, original);

        assert!(serde_json::from_value::<FindOptions>(json!({"include": {"alias": "host"}})).is_err());
    }

    #[test]
    fn test_find_or_create_values() {
        let options = FindOrCreateOptions::new()
            .filter(Condition::eq("name", "presenter"))
            .filter(Condition::is_null("canModerate"))
            .default_value("canPresent", true);

        let values = options.create_values();
        assert_eq!(values.get("name"), Some(&json!("presenter")));
        assert_eq!(values.get("canPresent"), Some(&json!(true)));
        assert!(!values.contains_key("canModerate"));
        assert_eq!(options.find_options().limit, Some(1));
    }
}
