/*!
The atomic commit protocol (spec §4.8, L8): conditional publish of new
metadata against the version hint, retry on conflict, and best-effort
cleanup on failure. Layered above [crate::metadata] and below
[crate::catalog].
*/

pub mod protocol;
pub mod retry;

pub use protocol::{cleanup_on_failure, commit, compact_metadata_log, initialize_table, load_current, version_hint_path, CommitOutcome, VersionHint};
pub use retry::{CommitConfig, NoopSleeper, Sleeper};
