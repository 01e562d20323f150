//! Tag projection - decides which fields take part in a stage.
//!
//! Projection always drops keys the schema does not declare. A tag narrows
//! the result further to fields carrying that tag, recursing into nested
//! schemas. With `ignore_tag_for_sub_schema` nested-schema fields skip the
//! tag check and are kept in full (still stripped of undeclared keys).

use serde_json::Value;

use crate::entity::Entity;
use crate::schema::{FieldSpec, FieldType};

/// Project `entity` onto `fields`, optionally restricted to `tag`.
///
/// Fields absent from `entity` stay absent; nothing is defaulted here.
pub fn project(
    fields: &[FieldSpec],
    entity: &Entity,
    tag: Option<&str>,
    ignore_tag_for_sub_schema: bool,
) -> Entity {
    let mut out = Entity::new();
    for field in fields {
        let Some(value) = entity.get(field.name()) else {
            continue;
        };

        let field_type = field.field_type();
        let exempt = ignore_tag_for_sub_schema && field_type.is_sub_schema();

        let projected = if exempt {
            project_value(field_type, value, None, ignore_tag_for_sub_schema)
        } else {
            if let Some(tag) = tag {
                if !field.has_tag(tag) {
                    continue;
                }
            }
            project_value(field_type, value, tag, ignore_tag_for_sub_schema)
        };
        out.insert(field.name().to_string(), projected);
    }
    out
}

fn project_value(
    field_type: &FieldType,
    value: &Value,
    tag: Option<&str>,
    ignore_tag_for_sub_schema: bool,
) -> Value {
    match (field_type, value) {
        (FieldType::Schema(schema), Value::Object(child)) => Value::Object(project(
            schema.fields(),
            child,
            tag,
            ignore_tag_for_sub_schema,
        )),
        (FieldType::Array(inner), Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| project_value(inner, item, tag, ignore_tag_for_sub_schema))
                .collect(),
        ),
        _ => value.clone(),
    }
}
