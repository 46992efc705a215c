/*!
[FieldIdAllocator] is the one mutable-across-operations value in schema
evolution (spec §9): a monotonic counter seeded from `last-column-id`,
handed through builder calls rather than kept as a global.
*/

use crate::types::{AllType, List, Map, NestedField, Struct};

/// Monotonic field-id counter. Ids are never reused, including after a
/// column is dropped (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct FieldIdAllocator {
    next: i32,
}

impl FieldIdAllocator {
    /// Creates an allocator that will hand out `last_column_id + 1` next.
    pub fn new(last_column_id: i32) -> Self {
        FieldIdAllocator {
            next: last_column_id + 1,
        }
    }

    /// Allocates and returns the next id.
    pub fn next(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The highest id handed out so far, or the seed minus one if none has
    /// been allocated yet.
    pub fn last_allocated(&self) -> i32 {
        self.next - 1
    }
}

/// Assigns fresh field-ids throughout `type_`'s nested structure, reserving
/// one id per list element, two per map (key + value), and one per struct
/// field (spec §4.6: "nested types reserve additional ids"). The type's own
/// identity (primitive vs struct/list/map shape) is preserved; only ids
/// are renumbered.
pub fn renumber_ids(type_: &AllType, alloc: &mut FieldIdAllocator) -> AllType {
    match type_ {
        AllType::Primitive(p) => AllType::Primitive(p.clone()),
        AllType::Struct(s) => AllType::Struct(Struct {
            fields: s
                .fields
                .iter()
                .map(|f| NestedField {
                    id: alloc.next(),
                    name: f.name.clone(),
                    required: f.required,
                    field_type: renumber_ids(&f.field_type, alloc),
                    doc: f.doc.clone(),
                    initial_default: f.initial_default.clone(),
                    write_default: f.write_default.clone(),
                })
                .collect(),
        }),
        AllType::List(l) => {
            let element_id = alloc.next();
            let element = renumber_ids(&l.element, alloc);
            AllType::List(List {
                element_id,
                element_required: l.element_required,
                element: Box::new(element),
            })
        }
        AllType::Map(m) => {
            let key_id = alloc.next();
            let key = renumber_ids(&m.key, alloc);
            let value_id = alloc.next();
            let value = renumber_ids(&m.value, alloc);
            AllType::Map(Map {
                key_id,
                key: Box::new(key),
                value_id,
                value_required: m.value_required,
                value: Box::new(value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveType;

    #[test]
    fn test_allocator_monotonic() {
        let mut alloc = FieldIdAllocator::new(5);
        assert_eq!(alloc.next(), 6);
        assert_eq!(alloc.next(), 7);
        assert_eq!(alloc.last_allocated(), 7);
    }

    #[test]
    fn test_renumber_list_reserves_one_id() {
        let mut alloc = FieldIdAllocator::new(0);
        let list_type = AllType::List(List {
            element_id: 999,
            element_required: false,
            element: Box::new(AllType::Primitive(PrimitiveType::String)),
        });
        let renumbered = renumber_ids(&list_type, &mut alloc);
        let AllType::List(l) = renumbered else { panic!("expected list") };
        assert_eq!(l.element_id, 1);
        assert_eq!(alloc.last_allocated(), 1);
    }

    #[test]
    fn test_renumber_map_reserves_two_ids() {
        let mut alloc = FieldIdAllocator::new(0);
        let map_type = AllType::Map(Map {
            key_id: 1,
            key: Box::new(AllType::Primitive(PrimitiveType::String)),
            value_id: 2,
            value_required: true,
            value: Box::new(AllType::Primitive(PrimitiveType::Int)),
        });
        let renumbered = renumber_ids(&map_type, &mut alloc);
        let AllType::Map(m) = renumbered else { panic!("expected map") };
        assert_eq!(m.key_id, 1);
        assert_eq!(m.value_id, 2);
        assert_eq!(alloc.last_allocated(), 2);
    }

    #[test]
    fn test_renumber_struct_reserves_one_id_per_field() {
        let mut alloc = FieldIdAllocator::new(0);
        let struct_type = AllType::Struct(Struct {
            fields: vec![
                NestedField {
                    id: 0,
                    name: "a".to_string(),
                    required: true,
                    field_type: AllType::Primitive(PrimitiveType::Int),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                },
                NestedField {
                    id: 0,
                    name: "b".to_string(),
                    required: false,
                    field_type: AllType::Primitive(PrimitiveType::String),
                    doc: None,
                    initial_default: None,
                    write_default: None,
                },
            ],
        });
        let renumbered = renumber_ids(&struct_type, &mut alloc);
        let AllType::Struct(s) = renumbered else { panic!("expected struct") };
        assert_eq!(s.fields[0].id, 1);
        assert_eq!(s.fields[1].id, 2);
    }
}
