/*!
Position and equality delete builders, lookups, application, and
compaction (spec §4.5).
*/

pub mod apply;
pub mod equality;
pub mod merger;
pub mod position;

pub use apply::{apply_deletes, ApplyResult, DataRow};
pub use equality::{EqualityDeleteBuilder, EqualityDeleteFile, EqualityDeleteLookup};
pub use merger::Merger;
pub use position::{PositionDeleteBuilder, PositionDeleteFile, PositionDeleteLookup};
