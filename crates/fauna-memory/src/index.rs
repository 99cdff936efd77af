//! Spatial Index.
//!
//! A 2-D KD tree over the ground plane (`x`/`z`) holding every
//! [`MemoryEntry`] the agent remembers.
//!
//! # Structure
//!
//! | Piece | Role |
//! |-------|------|
//! | [`SpatialIndex`] | Owns the node arena, the live/deleted counters and the rebuild bookkeeping. |
//! | `IndexNode`      | One entry, its split axis (x at even depth, z at odd depth) and split value. |
//! | [`IndexConfig`]  | Capacity, eviction threshold and rebuild trigger. |
//!
//! Inserts never rebalance. Deletion is lazy: a node is *tombstoned* and
//! stays in the arena until [`SpatialIndex::rebuild`] rebuilds a balanced
//! tree from the surviving entries. A rebuild is due when any of the
//! following holds:
//!
//! - `rebuild_after_updates` inserts/updates happened since the last rebuild,
//! - the tree is deeper than `max_depth`,
//! - more than `max_tombstone_ratio` of the nodes are tombstoned.
//!
//! Tombstones are kept at two levels: the node flag drives the deleted-count
//! bookkeeping, the entry flag is what queries and consumers consult. Both
//! are only ever set together by the index.
//!
//! # Example
//!
//! ```rust
//! use fauna_memory::entry::MemoryEntry;
//! use fauna_memory::index::SpatialIndex;
//! use fauna_types::{Bounds, Category, FeatureVector, Point3};
//!
//! let mut index = SpatialIndex::new();
//! let p = Point3::new(1.0, 0.0, 2.0);
//! index.insert(MemoryEntry::new(
//!     p,
//!     FeatureVector::default(),
//!     Bounds::new(p, Point3::new(0.3, 0.3, 0.3)),
//!     1.0,
//!     Category::Food,
//!     0.0,
//! ));
//!
//! assert_eq!(index.range_query(&Point3::origin(), 3.0).len(), 1);
//! assert!(index.range_query(&Point3::origin(), 1.0).is_empty());
//! ```

use fauna_types::Point3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::{EntryId, MemoryEntry};

/// Position of a node inside the index arena. Only valid until the next
/// [`SpatialIndex::rebuild`].
pub type NodeId = usize;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Capacity and rebuild policy of a [`SpatialIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Upper bound on live entries.
    pub max_memory_items: usize,
    /// Entries below this confidence are the first eviction candidates.
    pub low_confidence: f32,
    /// Inserts/updates after which a rebuild is forced.
    pub rebuild_after_updates: usize,
    /// Hard cap on tree depth.
    pub max_depth: usize,
    /// Tombstoned/total ratio above which a rebuild is forced.
    pub max_tombstone_ratio: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_memory_items: 512,
            low_confidence: 0.35,
            rebuild_after_updates: 400,
            max_depth: 32,
            max_tombstone_ratio: 0.35,
        }
    }
}

/// Why [`SpatialIndex::needs_rebuild`] asked for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    UpdateBudget,
    DepthCap,
    TombstoneRatio,
}

// ────────────────────────────────────────────────────────────────────────────
// IndexNode – internal
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Z,
}

impl Axis {
    fn for_depth(depth: usize) -> Self {
        if depth % 2 == 0 { Axis::X } else { Axis::Z }
    }

    fn coord(self, p: &Point3) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Z => p.z,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexNode {
    entry: MemoryEntry,
    axis: Axis,
    split: f32,
    tombstoned: bool,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl IndexNode {
    fn new(entry: MemoryEntry, depth: usize) -> Self {
        let axis = Axis::for_depth(depth);
        let split = axis.coord(&entry.position);
        Self {
            entry,
            axis,
            split,
            tombstoned: false,
            left: None,
            right: None,
        }
    }

    fn is_live(&self) -> bool {
        !self.tombstoned && !self.entry.tombstoned
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SpatialIndex
// ────────────────────────────────────────────────────────────────────────────

/// Ground-plane KD tree with lazy deletion.
///
/// Nodes live in an arena owned by the index; child links are arena
/// positions, each node has exactly one parent and there are no back
/// links. All traversals use an explicit stack.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: Vec<IndexNode>,
    root: Option<NodeId>,
    next_id: EntryId,
    live: usize,
    deleted: usize,
    updates_since_rebuild: usize,
    /// Deepest level reached by any insert since the last rebuild.
    height: usize,
    /// Bumped on every mutation; lets readers cache projections.
    revision: u64,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // ── counters ────────────────────────────────────────────────────────────

    /// Physical node count, tombstoned nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no live entry exists.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of live (non-tombstoned) entries.
    pub fn live_len(&self) -> usize {
        self.live
    }

    /// Number of tombstoned nodes awaiting reclamation.
    pub fn tombstoned_len(&self) -> usize {
        self.deleted
    }

    /// Monotonic mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Depth tracked incrementally by inserts; equals [`depth`][Self::depth].
    pub fn height(&self) -> usize {
        self.height
    }

    // ── insert ──────────────────────────────────────────────────────────────

    /// Insert `entry` as a new live node and return its assigned id.
    ///
    /// Descends by alternating axis (`coord < split` goes left) and attaches
    /// a leaf at the first empty slot. Never rebalances.
    pub fn insert(&mut self, mut entry: MemoryEntry) -> EntryId {
        self.next_id += 1;
        let id = self.next_id;
        entry.id = id;
        entry.tombstoned = false;

        let new_node = self.nodes.len();
        let mut depth = 0;
        let mut cursor = self.root;
        let mut parent: Option<(NodeId, bool)> = None;

        while let Some(current) = cursor {
            let node = &self.nodes[current];
            let go_left = node.axis.coord(&entry.position) < node.split;
            parent = Some((current, go_left));
            cursor = if go_left { node.left } else { node.right };
            depth += 1;
        }

        self.nodes.push(IndexNode::new(entry, depth));
        match parent {
            None => self.root = Some(new_node),
            Some((p, true)) => self.nodes[p].left = Some(new_node),
            Some((p, false)) => self.nodes[p].right = Some(new_node),
        }

        self.height = self.height.max(depth + 1);
        self.live += 1;
        self.updates_since_rebuild += 1;
        self.revision += 1;
        id
    }

    /// Insert under the capacity policy of `config`.
    ///
    /// When the tree is already past the depth cap it is rebuilt first.
    /// Depth overflow is never resolved by eviction, so it never costs an
    /// entry. When the live count has reached `max_memory_items` the weakest
    /// entry is evicted (see [`evict_weakest`][Self::evict_weakest]) before
    /// the insert, so the live count never exceeds the cap.
    pub fn insert_bounded(&mut self, entry: MemoryEntry, config: &IndexConfig) -> EntryId {
        if self.height > config.max_depth {
            self.rebuild();
        }
        if self.live >= config.max_memory_items.max(1) {
            self.evict_weakest(config.low_confidence);
        }
        self.insert(entry)
    }

    /// Tombstone the first live node (arena order) whose confidence is below
    /// `low_confidence`, falling back to the least confident live node.
    /// Returns the evicted entry's id, or `None` when the index is empty.
    pub fn evict_weakest(&mut self, low_confidence: f32) -> Option<EntryId> {
        let victim = self
            .nodes
            .iter()
            .position(|n| n.is_live() && n.entry.confidence < low_confidence)
            .or_else(|| {
                self.nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.is_live())
                    .min_by(|(_, a), (_, b)| a.entry.confidence.total_cmp(&b.entry.confidence))
                    .map(|(i, _)| i)
            })?;

        let evicted = self.nodes[victim].entry.id;
        debug!(
            entry = evicted,
            confidence = self.nodes[victim].entry.confidence,
            "evicting entry at capacity"
        );
        self.tombstone(victim);
        Some(evicted)
    }

    // ── deletion ────────────────────────────────────────────────────────────

    /// Tombstone `node`. Returns `false` if it was already tombstoned or
    /// does not exist.
    pub fn tombstone(&mut self, node: NodeId) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return false;
        };
        if n.tombstoned {
            return false;
        }
        n.tombstoned = true;
        n.entry.tombstoned = true;
        self.live -= 1;
        self.deleted += 1;
        self.revision += 1;
        true
    }

    /// Tombstone every entry whose age has reached `max_age` or whose
    /// confidence is below `min_confidence`. Visits every node once; returns
    /// how many were tombstoned.
    ///
    /// An entry last seen at `t` is gone at the first pass at or after
    /// `t + max_age`.
    pub fn age_and_tombstone(&mut self, now: f32, max_age: f32, min_confidence: f32) -> usize {
        let expired: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                n.is_live()
                    && (n.entry.age(now) >= max_age || n.entry.confidence < min_confidence)
            })
            .map(|(i, _)| i)
            .collect();
        for &node in &expired {
            self.tombstone(node);
        }
        expired.len()
    }

    // ── queries ─────────────────────────────────────────────────────────────

    /// Live nodes whose ground-plane distance to `center` is strictly less
    /// than `radius`.
    pub fn range_query(&self, center: &Point3, radius: f32) -> Vec<NodeId> {
        let mut out = Vec::new();
        if radius.is_nan() || radius <= 0.0 {
            return out;
        }
        let radius_sq = radius * radius;
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_live() && node.entry.position.ground_distance_sq(center) < radius_sq {
                out.push(id);
            }
            let c = node.axis.coord(center);
            if let Some(left) = node.left
                && c - radius <= node.split
            {
                stack.push(left);
            }
            if let Some(right) = node.right
                && c + radius >= node.split
            {
                stack.push(right);
            }
        }
        out
    }

    /// Borrowing variant of [`range_query`][Self::range_query].
    pub fn entries_within(&self, center: &Point3, radius: f32) -> Vec<&MemoryEntry> {
        self.range_query(center, radius)
            .into_iter()
            .map(|id| &self.nodes[id].entry)
            .collect()
    }

    /// Entry stored at `node`, tombstoned or not.
    pub fn entry(&self, node: NodeId) -> Option<&MemoryEntry> {
        self.nodes.get(node).map(|n| &n.entry)
    }

    /// Locate the live node holding the entry with `id`.
    pub fn find(&self, id: EntryId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.is_live() && n.entry.id == id)
    }

    /// All live entries in arena order.
    pub fn live_entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.nodes.iter().filter(|n| n.is_live()).map(|n| &n.entry)
    }

    /// Maximum root-to-leaf node count. O(n).
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((id, d)) = stack.pop() {
            max = max.max(d);
            let node = &self.nodes[id];
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, d + 1));
            }
        }
        max
    }

    // ── mutation ────────────────────────────────────────────────────────────

    /// Apply `f` to the live entry at `node`; counts as one update.
    ///
    /// The entry's position and tombstone flag are owned by the index and
    /// are restored after `f` runs. Returns `false` if `node` is not live.
    pub fn modify<F: FnOnce(&mut MemoryEntry)>(&mut self, node: NodeId, f: F) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return false;
        };
        if !n.is_live() {
            return false;
        }
        let position = n.entry.position;
        let id = n.entry.id;
        f(&mut n.entry);
        n.entry.position = position;
        n.entry.id = id;
        n.entry.tombstoned = n.tombstoned;
        self.updates_since_rebuild += 1;
        self.revision += 1;
        true
    }

    /// Apply `f` to every live entry. `f` returns whether it changed the
    /// entry; the revision is bumped once if anything changed. Returns the
    /// number of changed entries.
    pub fn modify_live<F: FnMut(&mut MemoryEntry) -> bool>(&mut self, mut f: F) -> usize {
        let mut changed = 0;
        for n in self.nodes.iter_mut().filter(|n| !n.tombstoned) {
            let position = n.entry.position;
            let id = n.entry.id;
            if f(&mut n.entry) {
                changed += 1;
            }
            n.entry.position = position;
            n.entry.id = id;
            n.entry.tombstoned = false;
        }
        if changed > 0 {
            self.revision += 1;
        }
        changed
    }

    // ── rebuild ─────────────────────────────────────────────────────────────

    /// Whether the rebuild policy in `config` currently asks for a rebuild.
    pub fn needs_rebuild(&self, config: &IndexConfig) -> Option<RebuildReason> {
        if self.height > config.max_depth {
            Some(RebuildReason::DepthCap)
        } else if self.updates_since_rebuild >= config.rebuild_after_updates {
            Some(RebuildReason::UpdateBudget)
        } else if !self.nodes.is_empty()
            && self.deleted as f32 / self.nodes.len() as f32 > config.max_tombstone_ratio
        {
            Some(RebuildReason::TombstoneRatio)
        } else {
            None
        }
    }

    /// Rebuild if [`needs_rebuild`][Self::needs_rebuild] says so.
    pub fn maintain(&mut self, config: &IndexConfig) -> Option<RebuildReason> {
        let reason = self.needs_rebuild(config)?;
        let reclaimed = self.rebuild();
        debug!(?reason, reclaimed, live = self.live, depth = self.height, "spatial index rebuilt");
        Some(reason)
    }

    /// Drop every tombstoned node and rebuild a balanced tree from the
    /// survivors by recursive median split. Returns the number of nodes
    /// reclaimed. Invalidates all previously returned [`NodeId`]s.
    pub fn rebuild(&mut self) -> usize {
        let before = self.nodes.len();
        let survivors = self.take_live_in_order();

        self.nodes = Vec::with_capacity(survivors.len());
        self.live = survivors.len();
        self.root = build_balanced(&mut self.nodes, survivors, 0);
        self.deleted = 0;
        self.updates_since_rebuild = 0;
        self.height = self.depth();
        self.revision += 1;
        before - self.nodes.len()
    }

    /// Move the live entries out of the arena in in-order sequence.
    fn take_live_in_order(&mut self) -> Vec<MemoryEntry> {
        let mut order = Vec::with_capacity(self.live);
        let mut stack = Vec::new();
        let mut cursor = self.root;
        while cursor.is_some() || !stack.is_empty() {
            while let Some(id) = cursor {
                stack.push(id);
                cursor = self.nodes[id].left;
            }
            if let Some(id) = stack.pop() {
                if self.nodes[id].is_live() {
                    order.push(id);
                }
                cursor = self.nodes[id].right;
            }
        }

        let mut slots: Vec<Option<IndexNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|id| slots[id].take().map(|n| n.entry))
            .collect()
    }
}

/// Median-of-sorted-slice KD build. Recursion depth is logarithmic in the
/// number of entries.
fn build_balanced(
    nodes: &mut Vec<IndexNode>,
    mut entries: Vec<MemoryEntry>,
    depth: usize,
) -> Option<NodeId> {
    if entries.is_empty() {
        return None;
    }
    let axis = Axis::for_depth(depth);
    entries.sort_by(|a, b| axis.coord(&a.position).total_cmp(&axis.coord(&b.position)));

    let mid = entries.len() / 2;
    let right = entries.split_off(mid + 1);
    let median = entries.pop()?;
    let left = entries;

    let id = nodes.len();
    nodes.push(IndexNode::new(median, depth));
    let left_id = build_balanced(nodes, left, depth + 1);
    let right_id = build_balanced(nodes, right, depth + 1);
    nodes[id].left = left_id;
    nodes[id].right = right_id;
    Some(id)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fauna_types::{Bounds, Category, FeatureVector};
    use std::collections::HashSet;

    fn entry_at(x: f32, z: f32) -> MemoryEntry {
        let p = Point3::new(x, 0.0, z);
        MemoryEntry::new(
            p,
            FeatureVector::default(),
            Bounds::new(p, Point3::new(0.3, 0.3, 0.3)),
            1.0,
            Category::Food,
            0.0,
        )
    }

    /// Deterministic scatter of points over [-50, 50)².
    fn scatter(n: usize) -> Vec<(f32, f32)> {
        let mut state: u32 = 0x9e37_79b9;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let x = (state % 10_000) as f32 / 100.0 - 50.0;
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let z = (state % 10_000) as f32 / 100.0 - 50.0;
                (x, z)
            })
            .collect()
    }

    fn live_ids(index: &SpatialIndex) -> HashSet<EntryId> {
        index.live_entries().map(|e| e.id).collect()
    }

    // ── insert / depth ──────────────────────────────────────────────────────

    #[test]
    fn empty_index_answers_empty() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.depth(), 0);
        assert!(index.range_query(&Point3::origin(), 100.0).is_empty());
    }

    #[test]
    fn insert_assigns_distinct_ids() {
        let mut index = SpatialIndex::new();
        let a = index.insert(entry_at(0.0, 0.0));
        let b = index.insert(entry_at(1.0, 1.0));
        assert_ne!(a, b);
        assert_eq!(index.live_len(), 2);
    }

    #[test]
    fn sorted_inserts_degrade_depth_and_height_tracks_it() {
        let mut index = SpatialIndex::new();
        for i in 0..20 {
            index.insert(entry_at(i as f32, i as f32));
        }
        assert_eq!(index.depth(), 20);
        assert_eq!(index.height(), index.depth());
    }

    // ── range query ─────────────────────────────────────────────────────────

    #[test]
    fn range_query_is_exact() {
        let mut index = SpatialIndex::new();
        let points = scatter(300);
        for &(x, z) in &points {
            index.insert(entry_at(x, z));
        }
        for (i, &(cx, cz)) in scatter(25).iter().enumerate() {
            let center = Point3::new(cx, 3.0, cz);
            let radius = 2.0 + i as f32;
            let got: HashSet<EntryId> = index
                .entries_within(&center, radius)
                .into_iter()
                .map(|e| e.id)
                .collect();
            let expected: HashSet<EntryId> = index
                .live_entries()
                .filter(|e| e.position.ground_distance(&center) < radius)
                .map(|e| e.id)
                .collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn range_query_boundary_is_exclusive() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(2.0, 0.0));
        assert!(index.range_query(&Point3::origin(), 2.0).is_empty());
        assert_eq!(index.range_query(&Point3::origin(), 2.001).len(), 1);
    }

    #[test]
    fn range_query_ignores_height() {
        let mut index = SpatialIndex::new();
        let mut e = entry_at(1.0, 0.0);
        e.position.y = 40.0;
        index.insert(e);
        assert_eq!(index.range_query(&Point3::origin(), 1.5).len(), 1);
    }

    #[test]
    fn non_positive_radius_returns_nothing() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0));
        assert!(index.range_query(&Point3::origin(), 0.0).is_empty());
        assert!(index.range_query(&Point3::origin(), -1.0).is_empty());
    }

    // ── tombstones ──────────────────────────────────────────────────────────

    #[test]
    fn tombstoned_entries_are_hidden_but_kept() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0));
        let node = index.range_query(&Point3::origin(), 1.0)[0];
        assert!(index.tombstone(node));
        assert!(!index.tombstone(node));
        assert!(index.range_query(&Point3::origin(), 1.0).is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(index.tombstoned_len(), 1);
        assert!(index.entry(node).unwrap().tombstoned);
    }

    #[test]
    fn age_and_tombstone_applies_both_cutoffs() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0)); // last_seen 0
        let mut fresh = entry_at(5.0, 0.0);
        fresh.last_seen = 200.0;
        index.insert(fresh);
        let mut weak = entry_at(-5.0, 0.0);
        weak.last_seen = 200.0;
        weak.confidence = 0.01;
        index.insert(weak);

        let removed = index.age_and_tombstone(250.0, 240.0, 0.05);
        assert_eq!(removed, 2);
        assert_eq!(index.live_len(), 1);
        assert_eq!(index.live_entries().next().unwrap().position.x, 5.0);
    }

    #[test]
    fn entry_is_tombstoned_exactly_at_max_age() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0));
        assert_eq!(index.age_and_tombstone(239.9, 240.0, 0.05), 0);
        assert_eq!(index.age_and_tombstone(240.0, 240.0, 0.05), 1);
        assert!(index.is_empty());
    }

    // ── capacity ────────────────────────────────────────────────────────────

    #[test]
    fn capacity_is_never_exceeded() {
        let config = IndexConfig {
            max_memory_items: 16,
            ..IndexConfig::default()
        };
        let mut index = SpatialIndex::new();
        for &(x, z) in &scatter(100) {
            index.insert_bounded(entry_at(x, z), &config);
            assert!(index.live_len() <= 16);
        }
        assert_eq!(index.live_len(), 16);
    }

    #[test]
    fn eviction_prefers_low_confidence() {
        let config = IndexConfig {
            max_memory_items: 3,
            ..IndexConfig::default()
        };
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0));
        let mut weak = entry_at(1.0, 0.0);
        weak.confidence = 0.2;
        let weak_id = index.insert(weak);
        index.insert(entry_at(2.0, 0.0));

        index.insert_bounded(entry_at(3.0, 0.0), &config);
        assert!(!live_ids(&index).contains(&weak_id));
        assert_eq!(index.live_len(), 3);
    }

    #[test]
    fn eviction_falls_back_to_weakest() {
        let mut index = SpatialIndex::new();
        let mut a = entry_at(0.0, 0.0);
        a.confidence = 0.9;
        index.insert(a);
        let mut b = entry_at(1.0, 0.0);
        b.confidence = 0.6;
        let b_id = index.insert(b);
        assert_eq!(index.evict_weakest(0.35), Some(b_id));
        assert_eq!(SpatialIndex::new().evict_weakest(0.35), None);
    }

    // ── rebuild ─────────────────────────────────────────────────────────────

    #[test]
    fn rebuild_reclaims_tombstones_and_keeps_live_set() {
        let mut index = SpatialIndex::new();
        for &(x, z) in &scatter(200) {
            index.insert(entry_at(x, z));
        }
        let victims: Vec<NodeId> = index.range_query(&Point3::origin(), 20.0);
        for v in victims {
            index.tombstone(v);
        }
        let before = live_ids(&index);

        let reclaimed = index.rebuild();
        assert_eq!(index.tombstoned_len(), 0);
        assert_eq!(index.len(), before.len());
        assert_eq!(reclaimed, 200 - before.len());
        assert_eq!(live_ids(&index), before);
    }

    #[test]
    fn rebuild_restores_logarithmic_depth() {
        let mut index = SpatialIndex::new();
        for i in 0..127 {
            index.insert(entry_at(i as f32, -(i as f32)));
        }
        assert_eq!(index.depth(), 127);
        index.rebuild();
        assert_eq!(index.depth(), 7);
        assert_eq!(index.height(), 7);
    }

    #[test]
    fn queries_stay_exact_after_rebuild() {
        let mut index = SpatialIndex::new();
        for &(x, z) in &scatter(150) {
            index.insert(entry_at(x, z));
        }
        index.rebuild();
        for &(x, z) in &scatter(10) {
            index.insert(entry_at(x + 0.5, z - 0.5));
        }
        let center = Point3::new(4.0, 0.0, -7.0);
        let got = index.range_query(&center, 15.0).len();
        let expected = index
            .live_entries()
            .filter(|e| e.position.ground_distance(&center) < 15.0)
            .count();
        assert_eq!(got, expected);
    }

    #[test]
    fn rebuild_of_empty_index_is_noop() {
        let mut index = SpatialIndex::new();
        assert_eq!(index.rebuild(), 0);
        assert!(index.is_empty());
    }

    // ── rebuild trigger ─────────────────────────────────────────────────────

    #[test]
    fn update_budget_triggers_rebuild() {
        let config = IndexConfig {
            rebuild_after_updates: 5,
            ..IndexConfig::default()
        };
        let mut index = SpatialIndex::new();
        for i in 0..4 {
            index.insert(entry_at(i as f32, (i * 7 % 3) as f32));
        }
        assert_eq!(index.needs_rebuild(&config), None);
        index.insert(entry_at(10.0, 10.0));
        assert_eq!(index.maintain(&config), Some(RebuildReason::UpdateBudget));
        assert_eq!(index.needs_rebuild(&config), None);
    }

    #[test]
    fn depth_cap_triggers_rebuild() {
        let config = IndexConfig {
            max_depth: 8,
            ..IndexConfig::default()
        };
        let mut index = SpatialIndex::new();
        for i in 0..9 {
            index.insert(entry_at(i as f32, i as f32));
        }
        assert_eq!(index.needs_rebuild(&config), Some(RebuildReason::DepthCap));
    }

    #[test]
    fn tombstone_ratio_triggers_rebuild() {
        let config = IndexConfig::default();
        let mut index = SpatialIndex::new();
        for i in 0..10 {
            index.insert(entry_at(i as f32, 0.0));
        }
        for node in 0..4 {
            index.tombstone(node);
        }
        assert_eq!(index.needs_rebuild(&config), Some(RebuildReason::TombstoneRatio));
    }

    #[test]
    fn insert_bounded_rebuilds_past_depth_cap() {
        let config = IndexConfig {
            max_depth: 4,
            ..IndexConfig::default()
        };
        let mut index = SpatialIndex::new();
        for i in 0..6 {
            index.insert(entry_at(i as f32, i as f32));
        }
        index.insert_bounded(entry_at(100.0, 100.0), &config);
        assert!(index.depth() <= 4);
        // Nothing was evicted to get there.
        assert_eq!(index.live_len(), 7);
    }

    // ── modify ──────────────────────────────────────────────────────────────

    #[test]
    fn modify_cannot_move_or_resurrect() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(1.0, 1.0));
        let node = index.range_query(&Point3::new(1.0, 0.0, 1.0), 0.5)[0];
        let rev = index.revision();
        assert!(index.modify(node, |e| {
            e.position = Point3::new(99.0, 0.0, 99.0);
            e.confidence = 0.5;
        }));
        assert!(index.revision() > rev);
        let e = index.entry(node).unwrap();
        assert_eq!(e.position, Point3::new(1.0, 0.0, 1.0));
        assert_eq!(e.confidence, 0.5);

        index.tombstone(node);
        assert!(!index.modify(node, |e| e.tombstoned = false));
    }

    #[test]
    fn modify_live_bumps_revision_only_on_change() {
        let mut index = SpatialIndex::new();
        index.insert(entry_at(0.0, 0.0));
        let rev = index.revision();
        assert_eq!(index.modify_live(|_| false), 0);
        assert_eq!(index.revision(), rev);
        assert_eq!(
            index.modify_live(|e| {
                e.confidence = 0.9;
                true
            }),
            1
        );
        assert!(index.revision() > rev);
    }
}
