//! Index records.
//!
//! A [`MemoryEntry`] is the identity-resolved record of one physical object.
//! Entries are owned by the [`SpatialIndex`][crate::index::SpatialIndex];
//! everything else sees them by reference or by copy.

use std::collections::VecDeque;

use fauna_types::{Bounds, Category, FeatureVector, Point3};
use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the index on insert.
pub type EntryId = u64;

// ─────────────────────────────────────────────────────────────────────────────
// SemanticStats
// ─────────────────────────────────────────────────────────────────────────────

/// Danger history accumulated around an entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SemanticStats {
    /// Danger events (attack or not) registered near this entry.
    pub danger_count: u32,
    /// Outstanding attacks; decremented by forgiveness.
    pub attack_count: u32,
    pub last_attack: Option<f32>,
    pub last_danger: Option<f32>,
    /// Most recent attack timestamps, oldest first.
    pub attack_times: VecDeque<f32>,
    /// Time credited as safe experience by decay ticks (seconds).
    pub safe_time: f32,
}

impl SemanticStats {
    /// Register a danger event at `now`.
    pub fn record_danger(&mut self, now: f32) {
        self.danger_count = self.danger_count.saturating_add(1);
        self.last_danger = Some(now);
    }

    /// Register an attack at `now`, keeping at most `history` timestamps.
    pub fn record_attack(&mut self, now: f32, history: usize) {
        self.attack_count = self.attack_count.saturating_add(1);
        self.last_attack = Some(now);
        self.attack_times.push_back(now);
        while self.attack_times.len() > history {
            self.attack_times.pop_front();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryEntry
// ─────────────────────────────────────────────────────────────────────────────

/// Long-horizon record of one physical object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Assigned by [`SpatialIndex::insert`][crate::index::SpatialIndex::insert];
    /// zero until then.
    pub id: EntryId,
    pub position: Point3,
    pub first_seen: f32,
    pub last_seen: f32,
    /// Belief that the object is still there, in `[0, 1]`.
    pub confidence: f32,
    pub features: FeatureVector,
    pub bounds: Bounds,
    pub shape_complexity: f32,
    pub category: Category,
    pub shape_hash: u64,
    pub motion_hash: u64,
    /// Authoritative "is this data valid" flag. Set only through the index.
    pub tombstoned: bool,
    pub stats: SemanticStats,
}

impl MemoryEntry {
    /// Build a fresh candidate entry seen at `now` with full confidence.
    pub fn new(
        position: Point3,
        features: FeatureVector,
        bounds: Bounds,
        shape_complexity: f32,
        category: Category,
        now: f32,
    ) -> Self {
        Self {
            id: 0,
            position,
            first_seen: now,
            last_seen: now,
            confidence: 1.0,
            shape_hash: features.shape_hash(),
            motion_hash: features.motion_hash(),
            features,
            bounds,
            shape_complexity,
            category,
            tombstoned: false,
            stats: SemanticStats::default(),
        }
    }

    /// Seconds since the entry was last confirmed.
    pub fn age(&self, now: f32) -> f32 {
        now - self.last_seen
    }

    pub fn is_live(&self) -> bool {
        !self.tombstoned
    }

    /// Refresh `last_seen` and raise confidence by `boost`, capped at 1.0.
    pub fn reinforce(&mut self, boost: f32, now: f32) {
        self.last_seen = self.last_seen.max(now);
        self.confidence = (self.confidence + boost).min(1.0);
    }

    /// Take over the geometry and classification of `other`, keeping
    /// identity, position of record and danger history.
    pub fn adopt_shape(&mut self, other: &MemoryEntry) {
        self.features = other.features;
        self.bounds = other.bounds;
        self.shape_complexity = other.shape_complexity;
        self.category = other.category;
        self.shape_hash = other.shape_hash;
        self.motion_hash = other.motion_hash;
    }
}
