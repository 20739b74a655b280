// Attribute-filtering policy
// Decides whether key columns (primary and foreign keys) are part of a projection.

use serde::{Deserialize, Serialize};

use super::schema::EntitySchema;

/// Projection policy applied by the safe query helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributePolicy {
    /// Every declared column
    WithIndexes,
    /// Every declared column except primary and foreign keys
    WithoutIndexes,
}

impl AttributePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributePolicy::WithIndexes => "with_indexes",
            AttributePolicy::WithoutIndexes => "without_indexes",
        }
    }
}

impl EntitySchema {
    /// Primary and foreign key columns
    pub fn get_indexes(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_index())
            .map(|c| c.name.to_string())
            .collect()
    }

    /// Columns that are neither primary nor foreign keys
    pub fn get_non_indexes(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.is_index())
            .map(|c| c.name.to_string())
            .collect()
    }

    /// Projection for a policy, in declaration order
    pub fn get_attributes(&self, policy: AttributePolicy) -> Vec<String> {
        match policy {
            AttributePolicy::WithIndexes => self.column_names(),
            AttributePolicy::WithoutIndexes => self.get_non_indexes(),
        }
    }
}
