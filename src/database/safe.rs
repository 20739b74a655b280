// Safe-query option rewriting
// Forces an explicit, policy-selected projection on a query and on every
// include below it, before the query reaches the executor.

use anyhow::Result;

use super::attributes::AttributePolicy;
use super::query::{FindOptions, Include, IncludeSpec};
use super::registry::SchemaRegistry;
use super::schema::EntitySchema;

/// Inject the policy projection into `options` and its include tree
///
/// `None` passes through untouched: the query then runs with every column.
pub fn apply_attribute_policy(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    policy: AttributePolicy,
    options: Option<FindOptions>,
) -> Result<Option<FindOptions>> {
    let Some(mut options) = options else {
        log::debug!(
            "No options for {} query, running without {} projection",
            schema.name,
            policy.as_str()
        );
        return Ok(None);
    };

    options.attributes = Some(schema.get_attributes(policy));
    if let Some(include) = options.include.take() {
        options.include = Some(restrict_include(registry, include, policy)?);
    }

    Ok(Some(options))
}

/// Replace each include entry's projection with its model's policy projection
///
/// Walks the tree one level at a time until no nested include remains.
/// A single include descriptor comes back as a one-entry collection.
pub fn restrict_include(
    registry: &SchemaRegistry,
    include: Include,
    policy: AttributePolicy,
) -> Result<Include> {
    let mut root = include.into_vec();
    let mut level: Vec<&mut IncludeSpec> = root.iter_mut().collect();

    while !level.is_empty() {
        let mut next = Vec::new();
        for spec in level {
            let schema = registry.require(&spec.model)?;
            spec.attributes = Some(schema.get_attributes(policy));

            if let Some(nested) = spec.include.take() {
                spec.include = Some(Include::Many(nested.into_vec()));
            }
            if let Some(Include::Many(children)) = spec.include.as_mut() {
                next.extend(children.iter_mut());
            }
        }
        level = next;
    }

    Ok(Include::Many(root))
}
