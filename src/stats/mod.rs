/*!
Per-column statistics: collection, zone maps for predicate pruning, and
shredded-variant stats merging (spec §4.3, L3).
*/

pub mod collector;
pub mod variant;
pub mod zone_map;

pub use collector::{ColumnStats, ColumnStatsCollector, ComputedFileStats, StatsAccumulator};
pub use variant::ShreddedFieldIdAllocator;
pub use zone_map::{CompareOp, ZoneMap};
