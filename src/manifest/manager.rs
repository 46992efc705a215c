/*!
[SnapshotManager] is a read-only view over a table's snapshot history: the
full id→[Snapshot] set plus the named ref pointers (spec §4.4). It answers
current/by-id/by-ref/by-timestamp lookups and allocates the next snapshot
sequence number; it does not itself decide how results are persisted back
into `TableMetadata` — that belongs to [crate::metadata].
*/

use std::collections::HashMap;

use crate::error::{IcebergError, Result};

use super::snapshot::{Operation, Snapshot, SnapshotBuilder};

/// Whether a named ref tracks the table's mainline history (`branch`) or
/// pins a single immutable snapshot (`tag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    /// A mutable pointer that advances as new snapshots are committed.
    Branch,
    /// An immutable pointer to one snapshot.
    Tag,
}

/// A named pointer at a snapshot, e.g. `main` or a tag (spec GLOSSARY: ref).
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotReference {
    /// The snapshot this ref currently points at.
    pub snapshot_id: i64,
    /// Branch or tag.
    pub ref_type: RefType,
    /// Number of snapshots to retain for a branch, if capped.
    pub min_snapshots_to_keep: Option<i32>,
    /// Maximum age of a snapshot on this ref before it is eligible for expiry.
    pub max_snapshot_age_ms: Option<i64>,
    /// For a branch: maximum age of the ref itself; for a tag: same.
    pub max_ref_age_ms: Option<i64>,
}

impl SnapshotReference {
    /// A branch ref with no retention overrides.
    pub fn branch(snapshot_id: i64) -> Self {
        SnapshotReference {
            snapshot_id,
            ref_type: RefType::Branch,
            min_snapshots_to_keep: None,
            max_snapshot_age_ms: None,
            max_ref_age_ms: None,
        }
    }

    /// A tag ref with no retention overrides.
    pub fn tag(snapshot_id: i64) -> Self {
        SnapshotReference {
            snapshot_id,
            ref_type: RefType::Tag,
            min_snapshots_to_keep: None,
            max_snapshot_age_ms: None,
            max_ref_age_ms: None,
        }
    }
}

/// Name of the branch every table is implicitly committed to absent an
/// explicit ref argument.
pub const MAIN_BRANCH: &str = "main";

/// Read-only-plus-allocate view over a table's snapshot history (spec §4.4).
/// Owns its snapshot/ref state so callers (the commit layer) can mutate it
/// and hand the result to `TableMetadata`.
#[derive(Debug, Clone, Default)]
pub struct SnapshotManager {
    snapshots: HashMap<i64, Snapshot>,
    refs: HashMap<String, SnapshotReference>,
    last_sequence_number: i64,
}

impl SnapshotManager {
    /// Builds a manager from a table's existing snapshots and refs.
    pub fn new(snapshots: Vec<Snapshot>, refs: HashMap<String, SnapshotReference>, last_sequence_number: i64) -> Self {
        SnapshotManager {
            snapshots: snapshots.into_iter().map(|s| (s.snapshot_id, s)).collect(),
            refs,
            last_sequence_number,
        }
    }

    /// The snapshot `main` currently points at, if any.
    pub fn get_current(&self) -> Option<&Snapshot> {
        self.get_by_ref(MAIN_BRANCH)
    }

    /// Looks up a snapshot by id.
    pub fn get_by_id(&self, id: i64) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Looks up a snapshot through a named ref.
    pub fn get_by_ref(&self, name: &str) -> Option<&Snapshot> {
        let r = self.refs.get(name)?;
        self.snapshots.get(&r.snapshot_id)
    }

    /// The ref metadata itself (not the snapshot it resolves to).
    pub fn get_ref(&self, name: &str) -> Option<&SnapshotReference> {
        self.refs.get(name)
    }

    /// The snapshot on `main`'s ancestry with the largest `timestamp_ms`
    /// that is `<= ms`; ties broken by the larger snapshot id.
    pub fn get_at_timestamp(&self, ms: i64) -> Option<&Snapshot> {
        self.snapshots
            .values()
            .filter(|s| s.timestamp_ms <= ms)
            .max_by_key(|s| (s.timestamp_ms, s.snapshot_id))
    }

    /// The chain of snapshots from `id` back to the root, following
    /// `parent_snapshot_id`, ordered newest-first.
    pub fn ancestor_chain(&self, id: i64) -> Vec<&Snapshot> {
        let mut chain = Vec::new();
        let mut current = self.snapshots.get(&id);
        while let Some(snap) = current {
            chain.push(snap);
            current = snap.parent_snapshot_id.and_then(|p| self.snapshots.get(&p));
        }
        chain
    }

    /// Points `name` at `snapshot_id` as the given ref type, replacing any
    /// prior ref of that name. Fails if `snapshot_id` is unknown.
    pub fn set_ref(&mut self, name: &str, snapshot_id: i64, ref_type: RefType) -> Result<()> {
        if !self.snapshots.contains_key(&snapshot_id) {
            return Err(IcebergError::InvalidInput(format!(
                "cannot set ref {name} to unknown snapshot {snapshot_id}"
            )));
        }
        let existing = self.refs.get(name);
        let reference = SnapshotReference {
            snapshot_id,
            ref_type,
            min_snapshots_to_keep: existing.and_then(|r| r.min_snapshots_to_keep),
            max_snapshot_age_ms: existing.and_then(|r| r.max_snapshot_age_ms),
            max_ref_age_ms: existing.and_then(|r| r.max_ref_age_ms),
        };
        self.refs.insert(name.to_string(), reference);
        Ok(())
    }

    /// Removes a named ref, if present.
    pub fn remove_ref(&mut self, name: &str) -> Option<SnapshotReference> {
        self.refs.remove(name)
    }

    /// The next sequence number this manager will allocate.
    pub fn next_sequence_number(&self) -> i64 {
        self.last_sequence_number + 1
    }

    /// Allocates the next sequence number, builds a [Snapshot] descending
    /// from `branch`'s current tip (or root if `branch` has none yet), and
    /// registers it without moving any ref — the caller advances `branch`
    /// via [Self::set_ref] once the commit that produced `manifest_list`
    /// has been durably published.
    pub fn create_snapshot(&mut self, branch: &str, operation: Operation, manifest_list: String, timestamp_ms: i64, schema_id: Option<i32>) -> Snapshot {
        let parent = self.get_by_ref(branch).map(|s| s.snapshot_id);
        let sequence_number = self.next_sequence_number();
        let snapshot = SnapshotBuilder::new(sequence_number, parent, manifest_list, operation, timestamp_ms, schema_id).build();
        self.last_sequence_number = sequence_number;
        self.snapshots.insert(snapshot.snapshot_id, snapshot.clone());
        snapshot
    }

    /// All known snapshots, in no particular order.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values()
    }

    /// All named refs.
    pub fn refs(&self) -> &HashMap<String, SnapshotReference> {
        &self.refs
    }

    /// The highest sequence number allocated so far.
    pub fn last_sequence_number(&self) -> i64 {
        self.last_sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: i64, parent: Option<i64>, seq: i64, ts: i64) -> Snapshot {
        Snapshot {
            snapshot_id: id,
            parent_snapshot_id: parent,
            sequence_number: seq,
            timestamp_ms: ts,
            manifest_list: format!("snap-{id}.avro"),
            summary: super::super::snapshot::Summary::new(Operation::Append),
            schema_id: Some(0),
            first_row_id: None,
            added_rows: None,
            key_id: None,
        }
    }

    #[test]
    fn test_ancestor_chain_and_timestamp_lookup() {
        let a = snap(1, None, 1, 1_700_000_000_000);
        let b = snap(2, Some(1), 2, 1_700_001_800_000);
        let mut refs = HashMap::new();
        refs.insert(MAIN_BRANCH.to_string(), SnapshotReference::branch(2));
        let mgr = SnapshotManager::new(vec![a, b], refs, 2);

        assert_eq!(mgr.get_current().unwrap().snapshot_id, 2);
        assert_eq!(mgr.last_sequence_number(), 2);
        let chain: Vec<i64> = mgr.ancestor_chain(2).iter().map(|s| s.snapshot_id).collect();
        assert_eq!(chain, vec![2, 1]);
        assert_eq!(mgr.get_at_timestamp(1_700_001_800_000).unwrap().snapshot_id, 2);
        assert_eq!(mgr.get_at_timestamp(1_700_000_500_000).unwrap().snapshot_id, 1);
        assert!(mgr.get_at_timestamp(1_600_000_000_000).is_none());
    }

    #[test]
    fn test_timestamp_tie_breaks_on_larger_id() {
        let a = snap(1, None, 1, 1_700_000_000_000);
        let b = snap(2, Some(1), 2, 1_700_000_000_000);
        let mgr = SnapshotManager::new(vec![a, b], HashMap::new(), 2);
        assert_eq!(mgr.get_at_timestamp(1_700_000_000_000).unwrap().snapshot_id, 2);
    }

    #[test]
    fn test_create_snapshot_allocates_next_sequence() {
        let a = snap(1, None, 1, 1_700_000_000_000);
        let mut refs = HashMap::new();
        refs.insert(MAIN_BRANCH.to_string(), SnapshotReference::branch(1));
        let mut mgr = SnapshotManager::new(vec![a], refs, 1);

        let new_snap = mgr.create_snapshot(MAIN_BRANCH, Operation::Append, "snap-2.avro".to_string(), 1_700_002_000_000, Some(0));
        assert_eq!(new_snap.sequence_number, 2);
        assert_eq!(new_snap.parent_snapshot_id, Some(1));
        assert_eq!(mgr.last_sequence_number(), 2);

        mgr.set_ref(MAIN_BRANCH, new_snap.snapshot_id, RefType::Branch).unwrap();
        assert_eq!(mgr.get_current().unwrap().snapshot_id, new_snap.snapshot_id);
    }

    #[test]
    fn test_set_ref_rejects_unknown_snapshot() {
        let mut mgr = SnapshotManager::new(Vec::new(), HashMap::new(), 0);
        assert!(mgr.set_ref(MAIN_BRANCH, 999, RefType::Branch).is_err());
    }
}
