/*!
[SchemaEvolutionBuilder] accumulates schema-evolution [Operation]s and
applies them in two passes (spec §4.6): [SchemaEvolutionBuilder::validate]
dry-runs every op against a cloned working schema, and
[SchemaEvolutionBuilder::build] applies the same sequence for real,
allocating fresh field-ids and bumping `schema-id`.
*/

use serde_json::Value as JsonValue;

use crate::error::{IcebergError, Result};
use crate::types::{AllType, NestedField, Schema, Struct};

use super::allocator::{renumber_ids, FieldIdAllocator};
use super::promotion::types_compatible;

/// Where a moved column lands relative to its siblings (spec §4.6:
/// `move-column(first|last|before X|after X)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePosition {
    /// Becomes the first field of its parent struct.
    First,
    /// Becomes the last field of its parent struct.
    Last,
    /// Placed immediately before sibling `name`.
    Before(String),
    /// Placed immediately after sibling `name`.
    After(String),
}

/// One schema-evolution operation (spec §4.6). Paths are dot-separated
/// names resolved through nested structs only — list/map element types are
/// leaves for evolution purposes.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Adds a new field under `parent` (`None` for the top level).
    AddColumn {
        /// Dotted path to the parent struct, or `None` for the schema root.
        parent: Option<String>,
        /// New field's name.
        name: String,
        /// New field's type; nested structure is assigned fresh field-ids.
        field_type: AllType,
        /// Whether the new field is required.
        required: bool,
        /// Field documentation.
        doc: Option<String>,
        /// Required when `required` is true (spec §3.2 invariant v).
        initial_default: Option<JsonValue>,
    },
    /// Removes the field at `path`.
    DropColumn {
        /// Dotted path to the field.
        path: String,
    },
    /// Renames the field at `path`.
    RenameColumn {
        /// Dotted path to the field.
        path: String,
        /// The field's new name.
        new_name: String,
    },
    /// Widens the field at `path`'s type.
    UpdateType {
        /// Dotted path to the field.
        path: String,
        /// The field's new type; must be compatible per the promotion table.
        new_type: AllType,
    },
    /// Relaxes the field at `path` to optional.
    MakeOptional {
        /// Dotted path to the field.
        path: String,
    },
    /// Tightens the field at `path` to required.
    MakeRequired {
        /// Dotted path to the field.
        path: String,
    },
    /// Replaces the field at `path`'s documentation.
    UpdateDoc {
        /// Dotted path to the field.
        path: String,
        /// New documentation, or `None` to clear it.
        doc: Option<String>,
    },
    /// Repositions the field at `path` among its siblings.
    MoveColumn {
        /// Dotted path to the field.
        path: String,
        /// Target position.
        position: MovePosition,
    },
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

fn navigate_to_parent<'a>(root: &'a mut Struct, path: &[&str]) -> Result<&'a mut Struct> {
    if path.len() <= 1 {
        return Ok(root);
    }
    let head = path[0];
    let field = root
        .fields
        .iter_mut()
        .find(|f| f.name == head)
        .ok_or_else(|| IcebergError::NotFound(format!("no such field: {head}")))?;
    match &mut field.field_type {
        AllType::Struct(s) => navigate_to_parent(s, &path[1..]),
        _ => Err(IcebergError::InvalidInput(format!(
            "{head} is not a struct; schema evolution cannot navigate through it"
        ))),
    }
}

fn field_index(parent: &Struct, name: &str) -> Result<usize> {
    parent
        .fields
        .iter()
        .position(|f| f.name == name)
        .ok_or_else(|| IcebergError::NotFound(format!("no such field: {name}")))
}

/// Accumulates and applies schema-evolution [Operation]s (spec §4.6).
pub struct SchemaEvolutionBuilder {
    base: Schema,
    identifier_field_ids: Vec<i32>,
    ops: Vec<Operation>,
}

impl SchemaEvolutionBuilder {
    /// Starts a builder from `base`. `base.identifier_field_ids` is carried
    /// forward and consulted to protect identifier columns from drop.
    pub fn new(base: Schema) -> Self {
        let identifier_field_ids = base.identifier_field_ids.clone().unwrap_or_default();
        SchemaEvolutionBuilder {
            base,
            identifier_field_ids,
            ops: Vec::new(),
        }
    }

    /// Queues an add-column operation.
    pub fn add_column(
        mut self,
        parent: Option<&str>,
        name: &str,
        field_type: AllType,
        required: bool,
        doc: Option<String>,
        initial_default: Option<JsonValue>,
    ) -> Self {
        self.ops.push(Operation::AddColumn {
            parent: parent.map(str::to_string),
            name: name.to_string(),
            field_type,
            required,
            doc,
            initial_default,
        });
        self
    }

    /// Queues a drop-column operation.
    pub fn drop_column(mut self, path: &str) -> Self {
        self.ops.push(Operation::DropColumn { path: path.to_string() });
        self
    }

    /// Queues a rename-column operation.
    pub fn rename_column(mut self, path: &str, new_name: &str) -> Self {
        self.ops.push(Operation::RenameColumn {
            path: path.to_string(),
            new_name: new_name.to_string(),
        });
        self
    }

    /// Queues a type-widening operation.
    pub fn update_type(mut self, path: &str, new_type: AllType) -> Self {
        self.ops.push(Operation::UpdateType { path: path.to_string(), new_type });
        self
    }

    /// Queues a make-optional operation.
    pub fn make_optional(mut self, path: &str) -> Self {
        self.ops.push(Operation::MakeOptional { path: path.to_string() });
        self
    }

    /// Queues a make-required operation.
    pub fn make_required(mut self, path: &str) -> Self {
        self.ops.push(Operation::MakeRequired { path: path.to_string() });
        self
    }

    /// Queues a doc-update operation.
    pub fn update_doc(mut self, path: &str, doc: Option<String>) -> Self {
        self.ops.push(Operation::UpdateDoc { path: path.to_string(), doc });
        self
    }

    /// Queues a move-column operation.
    pub fn move_column(mut self, path: &str, position: MovePosition) -> Self {
        self.ops.push(Operation::MoveColumn { path: path.to_string(), position });
        self
    }

    /// Dry-runs the queued operations against a clone of the base schema,
    /// surfacing the first conflict without mutating anything (spec §4.6:
    /// the "validate" pass).
    pub fn validate(&self, last_column_id: i32) -> Result<()> {
        let mut working = self.base.clone();
        let mut alloc = FieldIdAllocator::new(last_column_id);
        apply_ops(&mut working, &self.ops, &mut alloc, &self.identifier_field_ids)?;
        working.validate()
    }

    /// Applies the queued operations, producing the new schema (with
    /// `schema-id` set to `next_schema_id`) and the new `last-column-id`.
    /// An empty operation list is a no-op: the schema and `schema-id` are
    /// returned unchanged (spec §8.2 boundary case).
    pub fn build(self, next_schema_id: i32, last_column_id: i32) -> Result<(Schema, i32)> {
        if self.ops.is_empty() {
            return Ok((self.base, last_column_id));
        }
        let mut working = self.base.clone();
        let mut alloc = FieldIdAllocator::new(last_column_id);
        apply_ops(&mut working, &self.ops, &mut alloc, &self.identifier_field_ids)?;
        working.schema_id = next_schema_id;
        working.validate()?;
        let new_last_column_id = alloc.last_allocated().max(last_column_id);
        Ok((working, new_last_column_id))
    }
}

fn apply_ops(schema: &mut Schema, ops: &[Operation], alloc: &mut FieldIdAllocator, identifier_field_ids: &[i32]) -> Result<()> {
    for op in ops {
        apply_one(schema, op, alloc, identifier_field_ids)?;
    }
    Ok(())
}

fn apply_one(schema: &mut Schema, op: &Operation, alloc: &mut FieldIdAllocator, identifier_field_ids: &[i32]) -> Result<()> {
    match op {
        Operation::AddColumn {
            parent,
            name,
            field_type,
            required,
            doc,
            initial_default,
        } => {
            let has_non_null_default = matches!(initial_default, Some(v) if !v.is_null());
            if *required && !has_non_null_default {
                return Err(IcebergError::InvalidInput(format!(
                    "new required field {name} must carry a non-null initial-default"
                )));
            }
            let path: Vec<&str> = parent.as_deref().map(split_path).unwrap_or_default();
            let parent_struct = if path.is_empty() {
                &mut schema.struct_fields
            } else {
                let padded = [path.as_slice(), &[""]].concat();
                navigate_to_parent(&mut schema.struct_fields, &padded)?
            };
            if parent_struct.fields.iter().any(|f| f.name == *name) {
                return Err(IcebergError::AlreadyExists(format!("field {name} already exists")));
            }
            let id = alloc.next();
            let renumbered_type = renumber_ids(field_type, alloc);
            parent_struct.fields.push(NestedField {
                id,
                name: name.clone(),
                required: *required,
                field_type: renumbered_type,
                doc: doc.clone(),
                initial_default: initial_default.clone(),
                write_default: None,
            });
            Ok(())
        }
        Operation::DropColumn { path } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            if identifier_field_ids.contains(&parent.fields[idx].id) {
                return Err(IcebergError::IdentifierFieldProtected {
                    field_id: parent.fields[idx].id,
                    name: parent.fields[idx].name.clone(),
                });
            }
            parent.fields.remove(idx);
            Ok(())
        }
        Operation::RenameColumn { path, new_name } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            if parent.fields.iter().any(|f| f.name == *new_name && f.name != leaf) {
                return Err(IcebergError::AlreadyExists(format!("field {new_name} already exists")));
            }
            let idx = field_index(parent, leaf)?;
            parent.fields[idx].name = new_name.clone();
            Ok(())
        }
        Operation::UpdateType { path, new_type } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            let field = &mut parent.fields[idx];
            if !types_compatible(&field.field_type, new_type) {
                return Err(IcebergError::IncompatibleType {
                    from: format!("{:?}", field.field_type),
                    to: format!("{new_type:?}"),
                });
            }
            field.field_type = new_type.clone();
            Ok(())
        }
        Operation::MakeOptional { path } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            parent.fields[idx].required = false;
            Ok(())
        }
        Operation::MakeRequired { path } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            parent.fields[idx].required = true;
            Ok(())
        }
        Operation::UpdateDoc { path, doc } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            parent.fields[idx].doc = doc.clone();
            Ok(())
        }
        Operation::MoveColumn { path, position } => {
            let segments = split_path(path);
            let parent = navigate_to_parent(&mut schema.struct_fields, &segments)?;
            let leaf = *segments.last().unwrap();
            let idx = field_index(parent, leaf)?;
            let field = parent.fields.remove(idx);
            let target = match position {
                MovePosition::First => 0,
                MovePosition::Last => parent.fields.len(),
                MovePosition::Before(sibling) => field_index(parent, sibling)?,
                MovePosition::After(sibling) => field_index(parent, sibling)? + 1,
            };
            parent.fields.insert(target.min(parent.fields.len()), field);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveType;

    fn base_schema() -> Schema {
        Schema {
            schema_id: 0,
            identifier_field_ids: Some(vec![1]),
            struct_fields: Struct {
                fields: vec![
                    NestedField {
                        id: 1,
                        name: "id".to_string(),
                        required: true,
                        field_type: AllType::Primitive(PrimitiveType::Long),
                        doc: None,
                        initial_default: None,
                        write_default: None,
                    },
                    NestedField {
                        id: 2,
                        name: "name".to_string(),
                        required: false,
                        field_type: AllType::Primitive(PrimitiveType::String),
                        doc: None,
                        initial_default: None,
                        write_default: None,
                    },
                ],
            },
        }
    }

    #[test]
    fn test_add_optional_column() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).add_column(
            None,
            "phone",
            AllType::Primitive(PrimitiveType::String),
            false,
            None,
            None,
        );
        let (schema, last_column_id) = builder.build(1, 2).unwrap();
        assert_eq!(schema.schema_id, 1);
        assert_eq!(last_column_id, 3);
        assert_eq!(schema.field_by_name("phone").unwrap().id, 3);
    }

    #[test]
    fn test_add_required_column_without_default_fails() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).add_column(
            None,
            "must_have",
            AllType::Primitive(PrimitiveType::Int),
            true,
            None,
            None,
        );
        assert!(builder.build(1, 2).is_err());
    }

    #[test]
    fn test_rename_preserves_field_id() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).rename_column("name", "full_name");
        let (schema, _) = builder.build(1, 2).unwrap();
        assert_eq!(schema.field_by_name("full_name").unwrap().id, 2);
        assert!(schema.field_by_name("name").is_none());
    }

    #[test]
    fn test_widen_int_to_long() {
        let mut base = base_schema();
        base.struct_fields.fields.push(NestedField {
            id: 3,
            name: "count".to_string(),
            required: false,
            field_type: AllType::Primitive(PrimitiveType::Int),
            doc: None,
            initial_default: None,
            write_default: None,
        });
        let builder = SchemaEvolutionBuilder::new(base).update_type("count", AllType::Primitive(PrimitiveType::Long));
        let (schema, _) = builder.build(1, 3).unwrap();
        assert_eq!(schema.field_by_name("count").unwrap().field_type, AllType::Primitive(PrimitiveType::Long));
    }

    #[test]
    fn test_narrowing_rejected() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).update_type("id", AllType::Primitive(PrimitiveType::Int));
        assert!(builder.build(1, 2).is_err());
    }

    #[test]
    fn test_drop_identifier_field_rejected() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).drop_column("id");
        let err = builder.build(1, 2).unwrap_err();
        assert!(matches!(err, IcebergError::IdentifierFieldProtected { .. }));
    }

    #[test]
    fn test_drop_non_identifier_field_ok() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).drop_column("name");
        let (schema, _) = builder.build(1, 2).unwrap();
        assert!(schema.field_by_name("name").is_none());
    }

    #[test]
    fn test_empty_plan_is_noop_same_schema_id() {
        let builder = SchemaEvolutionBuilder::new(base_schema());
        let (schema, last_column_id) = builder.build(5, 2).unwrap();
        assert_eq!(schema.schema_id, 0);
        assert_eq!(last_column_id, 2);
    }

    #[test]
    fn test_move_column_before_sibling() {
        let mut base = base_schema();
        base.struct_fields.fields.push(NestedField {
            id: 3,
            name: "created_at".to_string(),
            required: false,
            field_type: AllType::Primitive(PrimitiveType::Timestamptz),
            doc: None,
            initial_default: None,
            write_default: None,
        });
        let builder = SchemaEvolutionBuilder::new(base).move_column("created_at", MovePosition::Before("name".to_string()));
        let (schema, _) = builder.build(1, 3).unwrap();
        let names: Vec<&str> = schema.struct_fields.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "created_at", "name"]);
    }

    #[test]
    fn test_validate_does_not_mutate_base() {
        let builder = SchemaEvolutionBuilder::new(base_schema()).drop_column("name");
        builder.validate(2).unwrap();
        assert_eq!(builder.base.struct_fields.fields.len(), 2);
    }
}
