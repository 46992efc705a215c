/*!
Compatibility checks between two schema versions (spec §4.6): classify
every field-id-keyed difference, then judge backward/forward/full safety
from the classification.
*/

use std::collections::BTreeMap;

use crate::types::{AllType, NestedField, Schema};

use super::promotion::promote;

/// One classified difference between an old and new schema, keyed by the
/// field-id both sides agree on (added/removed fields only have one side).
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDiff {
    /// A field-id present in `new` but not `old`.
    Added { id: i32, name: String },
    /// A field-id present in `old` but not `new`.
    Removed { id: i32, name: String },
    /// Same field-id, different name.
    Renamed { id: i32, old_name: String, new_name: String },
    /// Same field-id, different (non-identical) type.
    TypeChanged { id: i32, name: String, from: AllType, to: AllType },
    /// Same field-id, required/optional flipped.
    NullabilityChanged { id: i32, name: String, was_required: bool, now_required: bool },
    /// Same field-id, different `doc`.
    DocChanged { id: i32, name: String },
    /// Same field-id set, different declaration order among siblings.
    Reordered,
}

fn flatten(schema: &Schema) -> BTreeMap<i32, &NestedField> {
    fn walk<'a>(fields: &'a [NestedField], out: &mut BTreeMap<i32, &'a NestedField>) {
        for f in fields {
            out.insert(f.id, f);
            if let AllType::Struct(s) = &f.field_type {
                walk(&s.fields, out);
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(&schema.struct_fields.fields, &mut out);
    out
}

/// Classifies every difference between `old` and `new`, keyed by field-id
/// (spec §4.6: added/removed/renamed/type-changed/nullability-changed/
/// doc-changed/reordered).
pub fn compare(old: &Schema, new: &Schema) -> Vec<SchemaDiff> {
    let old_fields = flatten(old);
    let new_fields = flatten(new);
    let mut diffs = Vec::new();

    for (id, old_field) in &old_fields {
        match new_fields.get(id) {
            None => diffs.push(SchemaDiff::Removed {
                id: *id,
                name: old_field.name.clone(),
            }),
            Some(new_field) => {
                if old_field.name != new_field.name {
                    diffs.push(SchemaDiff::Renamed {
                        id: *id,
                        old_name: old_field.name.clone(),
                        new_name: new_field.name.clone(),
                    });
                }
                if old_field.field_type != new_field.field_type {
                    diffs.push(SchemaDiff::TypeChanged {
                        id: *id,
                        name: new_field.name.clone(),
                        from: old_field.field_type.clone(),
                        to: new_field.field_type.clone(),
                    });
                }
                if old_field.required != new_field.required {
                    diffs.push(SchemaDiff::NullabilityChanged {
                        id: *id,
                        name: new_field.name.clone(),
                        was_required: old_field.required,
                        now_required: new_field.required,
                    });
                }
                if old_field.doc != new_field.doc {
                    diffs.push(SchemaDiff::DocChanged {
                        id: *id,
                        name: new_field.name.clone(),
                    });
                }
            }
        }
    }
    for (id, new_field) in &new_fields {
        if !old_fields.contains_key(id) {
            diffs.push(SchemaDiff::Added {
                id: *id,
                name: new_field.name.clone(),
            });
        }
    }

    let old_order: Vec<i32> = old.struct_fields.fields.iter().map(|f| f.id).collect();
    let new_order: Vec<i32> = new.struct_fields.fields.iter().map(|f| f.id).collect();
    let shared_old: Vec<i32> = old_order.iter().copied().filter(|id| new_fields.contains_key(id)).collect();
    let shared_new: Vec<i32> = new_order.iter().copied().filter(|id| old_fields.contains_key(id)).collect();
    if shared_old != shared_new {
        diffs.push(SchemaDiff::Reordered);
    }

    diffs
}

/// Backward compatibility: a reader built against `new` can read data
/// written under `old`. Type promotions are legal; `optional -> required`
/// is not; everything else is safe (spec §4.6).
pub fn is_backward_compatible(old: &Schema, new: &Schema) -> bool {
    compare(old, new).iter().all(|d| match d {
        SchemaDiff::TypeChanged { from, to, .. } => match (from, to) {
            (AllType::Primitive(a), AllType::Primitive(b)) => promote(a, b),
            _ => false,
        },
        SchemaDiff::NullabilityChanged { was_required, now_required, .. } => !(!*was_required && *now_required),
        _ => true,
    })
}

/// Forward compatibility: a reader built against `old` can read data
/// written under `new`. Removing fields, making a required field optional,
/// and any type change are unsafe; everything else is safe (spec §4.6).
pub fn is_forward_compatible(old: &Schema, new: &Schema) -> bool {
    compare(old, new).iter().all(|d| match d {
        SchemaDiff::Removed { .. } => false,
        SchemaDiff::TypeChanged { .. } => false,
        SchemaDiff::NullabilityChanged { was_required, now_required, .. } => !(*was_required && !*now_required),
        _ => true,
    })
}

/// Full compatibility: both backward and forward.
pub fn is_fully_compatible(old: &Schema, new: &Schema) -> bool {
    is_backward_compatible(old, new) && is_forward_compatible(old, new)
}
