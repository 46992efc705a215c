/*!
A minimal, purpose-built binary codec for the two Avro object types Iceberg
needs (`manifest_entry`, `manifest_file`), implemented without a dependency
on a generic Avro library (spec §4.2, §9 "Avro without a library").

Submodules:
* [varint] — zig-zag + variable-length integer primitives.
* [avro_value] — a small tagged `AvroValue` and its encode/decode routines
  for the primitive and complex (array/map/union) Avro wire shapes Iceberg
  uses.
* [container] — the Avro Object Container File framing: magic, header,
  sync marker, blocks.
* [manifest_schema] / [manifest_list_schema] — the concrete Iceberg record
  schemas (as Avro schema JSON, with `field-id` annotations), generated at
  encode time per partition spec and format version.
* [bounds] — canonical per-type encoding used inside the `lower-bounds`/
  `upper-bounds` maps, including string upper-bound truncation.
*/

pub mod avro_value;
pub mod bounds;
pub mod container;
pub mod manifest_list_schema;
pub mod manifest_schema;
pub mod varint;

pub use avro_value::AvroValue;
pub use container::{ContainerReader, ContainerWriter};
