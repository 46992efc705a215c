/*!
Manifest, manifest-list, and snapshot construction (spec §3.4, §3.5, §3.6,
§4.4): the layer that turns buffered [entry::DataFile]s into the immutable
Avro objects a [crate::metadata::TableMetadata] commit publishes.
*/

pub mod builder;
pub mod entry;
pub mod list;
pub mod manager;
pub mod snapshot;

pub use builder::{FieldSummary, ManifestBuilder, ManifestFileRow};
pub use entry::{Content, DataFile, FileFormat, ManifestEntry, Status};
pub use list::ManifestListBuilder;
pub use manager::{RefType, SnapshotManager, SnapshotReference, MAIN_BRANCH};
pub use snapshot::{Operation, Snapshot, SnapshotBuilder, Summary};
