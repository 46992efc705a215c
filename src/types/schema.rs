/*!
A table's [schema](https://iceberg.apache.org/spec/#schemas-and-data-types)
is a list of named, field-id-stamped columns (spec §3.2). All data types
are either [PrimitiveType] or nested types, which are [List], [Map], or
[Struct]. A [Schema] is itself a [Struct] plus a `schema-id`.
*/

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{IcebergError, Result};

use super::primitive::PrimitiveType;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
/// A union of all types a [NestedField] may hold.
pub enum AllType {
    /// A primitive type.
    Primitive(PrimitiveType),
    /// A struct type.
    Struct(Struct),
    /// A list type.
    List(List),
    /// A map type.
    Map(Map),
}

impl AllType {
    /// The maximum field-id anywhere within this type, or `None` for a
    /// primitive (which introduces no field-ids of its own).
    pub fn max_field_id(&self) -> Option<i32> {
        match self {
            AllType::Primitive(_) => None,
            AllType::Struct(s) => s.fields.iter().map(|f| f.max_field_id()).max(),
            AllType::List(l) => {
                let nested = l.element.max_field_id();
                Some(nested.map_or(l.element_id, |n| n.max(l.element_id)))
            }
            AllType::Map(m) => {
                let key_nested = m.key.max_field_id().unwrap_or(m.key_id);
                let value_nested = m.value.max_field_id().unwrap_or(m.value_id);
                Some(key_nested.max(value_nested).max(m.key_id).max(m.value_id))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// A named, field-id-stamped column or nested field.
pub struct NestedField {
    /// Globally unique, monotonically allocated field id.
    pub id: i32,
    /// Field name.
    pub name: String,
    /// Whether the field must be non-null.
    pub required: bool,
    #[serde(rename = "type")]
    /// The field's type.
    pub field_type: AllType,
    /// Field documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Immutable default applied when reading a row written before the field existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_default: Option<JsonValue>,
    /// Default used by writers that do not populate this field explicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_default: Option<JsonValue>,
}

impl NestedField {
    /// The maximum field-id introduced by this field, including any nested structure.
    pub fn max_field_id(&self) -> i32 {
        self.field_type.max_field_id().map_or(self.id, |n| n.max(self.id))
    }

    /// Validates the per-field invariants of spec §3.2 (iii, v are schema-level
    /// and checked by [Schema::validate]; this checks the field in isolation).
    pub fn validate(&self) -> Result<()> {
        if let AllType::Primitive(p) = &self.field_type {
            if p.must_be_optional() && self.required {
                return Err(IcebergError::InvalidInput(format!(
                    "field {} ({}) has an unknown type and must be optional",
                    self.id, self.name
                )));
            }
            if p.default_must_be_null() {
                if let Some(d) = &self.initial_default {
                    if !d.is_null() {
                        return Err(IcebergError::InvalidInput(format!(
                            "field {} ({}) default must be null for type {}",
                            self.id, self.name, p
                        )));
                    }
                }
            }
            if let PrimitiveType::Geography { algorithm, .. } = p {
                super::primitive::validate_geography_algorithm(algorithm)?;
            }
        }
        if let AllType::Struct(_) = &self.field_type {
            if let Some(d) = &self.initial_default {
                if !(d.is_null() || matches!(d, JsonValue::Object(o) if o.is_empty())) {
                    return Err(IcebergError::InvalidInput(format!(
                        "field {} ({}) struct default must be {{}} or null",
                        self.id, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// A struct type: an ordered list of fields.
pub struct Struct {
    /// The struct's fields, in declaration order.
    pub fields: Vec<NestedField>,
}

impl Struct {
    /// Looks up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by id, recursing into nested structs/lists/maps.
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        for field in &self.fields {
            if field.id == id {
                return Some(field);
            }
            if let Some(found) = find_in_type(&field.field_type, id) {
                return Some(found);
            }
        }
        None
    }
}

fn find_in_type(t: &AllType, id: i32) -> Option<&NestedField> {
    match t {
        AllType::Primitive(_) => None,
        AllType::Struct(s) => s.field_by_id(id),
        AllType::List(l) => {
            if l.element_id == id {
                None
            } else {
                find_in_type(&l.element, id)
            }
        }
        AllType::Map(m) => find_in_type(&m.key, id).or_else(|| find_in_type(&m.value, id)),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// A list type: a single, field-id-stamped element type.
pub struct List {
    /// Field id of the list's element.
    pub element_id: i32,
    /// Whether the element may be null.
    pub element_required: bool,
    /// The element type, boxed because types are recursive.
    pub element: Box<AllType>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// A map type: field-id-stamped key and value types.
pub struct Map {
    /// Field id of the map's key.
    pub key_id: i32,
    /// The key type.
    pub key: Box<AllType>,
    /// Field id of the map's value.
    pub value_id: i32,
    /// Whether the value may be null.
    pub value_required: bool,
    /// The value type.
    pub value: Box<AllType>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// A table schema: a struct of fields plus a schema id and identifier fields.
pub struct Schema {
    /// The schema's id, unique within a table's `schemas[]`.
    pub schema_id: i32,
    /// Field ids that together uniquely identify a row, protected from drop (spec §4.6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_field_ids: Option<Vec<i32>>,
    #[serde(flatten)]
    /// The schema's top-level struct.
    pub struct_fields: Struct,
}

impl Schema {
    /// Recurses into structs/lists/maps to find the highest field-id in the schema
    /// (spec §4.1's `find_max_field_id`).
    pub fn find_max_field_id(&self) -> i32 {
        self.struct_fields
            .fields
            .iter()
            .map(|f| f.max_field_id())
            .max()
            .unwrap_or(0)
    }

    /// Validates the whole-schema invariants of spec §3.2: unique field ids
    /// across the tree, and per-field invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        self.validate_struct(&self.struct_fields, &mut seen)
    }

    fn validate_struct(
        &self,
        s: &Struct,
        seen: &mut std::collections::HashSet<i32>,
    ) -> Result<()> {
        for field in &s.fields {
            if !seen.insert(field.id) {
                return Err(IcebergError::InvalidInput(format!(
                    "duplicate field id {} in schema {}",
                    field.id, self.schema_id
                )));
            }
            field.validate()?;
            match &field.field_type {
                AllType::Struct(inner) => self.validate_struct(inner, seen)?,
                AllType::List(l) => {
                    if !seen.insert(l.element_id) {
                        return Err(IcebergError::InvalidInput(format!(
                            "duplicate field id {} in schema {}",
                            l.element_id, self.schema_id
                        )));
                    }
                    if let AllType::Struct(inner) = l.element.as_ref() {
                        self.validate_struct(inner, seen)?;
                    }
                }
                AllType::Map(m) => {
                    for id in [m.key_id, m.value_id] {
                        if !seen.insert(id) {
                            return Err(IcebergError::InvalidInput(format!(
                                "duplicate field id {id} in schema {}",
                                self.schema_id
                            )));
                        }
                    }
                    if let AllType::Struct(inner) = m.value.as_ref() {
                        self.validate_struct(inner, seen)?;
                    }
                }
                AllType::Primitive(_) => {}
            }
        }
        Ok(())
    }

    /// Looks up a field by name at the top level.
    pub fn field_by_name(&self, name: &str) -> Option<&NestedField> {
        self.struct_fields.field_by_name(name)
    }

    /// Looks up a field anywhere in the schema by id.
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        self.struct_fields.field_by_id(id)
    }
}
