/*!
Schema evolution: the fluent operation builder, the type-promotion table,
compatibility checks, and field-id allocation (spec §4.6, L6).

[SchemaEvolutionBuilder] accumulates [Operation]s and applies them in two
passes: [SchemaEvolutionBuilder::validate] dry-runs every op against a
cloned working schema to surface conflicts without mutating anything, and
[SchemaEvolutionBuilder::build] applies the same sequence for real,
allocating fresh field-ids and bumping `schema-id`.
*/

pub mod allocator;
pub mod builder;
pub mod compatibility;
pub mod promotion;

pub use allocator::FieldIdAllocator;
pub use builder::{MovePosition, Operation, SchemaEvolutionBuilder};
pub use compatibility::{compare, is_backward_compatible, is_forward_compatible, is_fully_compatible, SchemaDiff};
pub use promotion::{promote, types_compatible};
