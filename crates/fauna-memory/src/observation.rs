//! Observation assembly.
//!
//! Read-only projections of the two memories into plain numeric arrays for
//! a downstream policy. Everything returned here is an owned copy; nothing
//! borrows into the index across ticks.
//!
//! | Output | Shape | Source |
//! |--------|-------|--------|
//! | [`ObservationTable`] | `live × 17` | spatial index |
//! | recency summary | `k × 5` | short-horizon memory, insertion order |
//! | focus summary | `slots × 3` | short-horizon memory, forward cone |
//! | closest summary | `3` | short-horizon memory, one category |
//!
//! Table row layout:
//!
//! | cols | meaning |
//! |------|---------|
//! | 0, 1 | position x, z |
//! | 2–11 | feature vector |
//! | 12 | confidence |
//! | 13 | shape complexity |
//! | 14 | attack count |
//! | 15 | danger count |
//! | 16 | safe-experience time |

use fauna_types::{Category, FEATURE_DIM, Pose};
use serde::{Deserialize, Serialize};

use crate::entry::MemoryEntry;
use crate::index::SpatialIndex;
use crate::short_horizon::ShortHorizonMemory;

/// Columns per [`ObservationTable`] row.
pub const TABLE_WIDTH: usize = 2 + FEATURE_DIM + 5;
/// Values per recency slot.
pub const RECENCY_FIELDS: usize = 5;
/// Values per focus slot.
pub const FOCUS_FIELDS: usize = 3;

/// One row per live index entry, in arena order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationTable {
    pub rows: Vec<[f32; TABLE_WIDTH]>,
}

impl ObservationTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-major copy of the whole table.
    pub fn flatten(&self) -> Vec<f32> {
        self.rows.iter().flatten().copied().collect()
    }

    fn row(entry: &MemoryEntry) -> [f32; TABLE_WIDTH] {
        let mut row = [0.0; TABLE_WIDTH];
        row[0] = entry.position.x;
        row[1] = entry.position.z;
        row[2..2 + FEATURE_DIM].copy_from_slice(entry.features.as_slice());
        let tail = 2 + FEATURE_DIM;
        row[tail] = entry.confidence;
        row[tail + 1] = entry.shape_complexity;
        row[tail + 2] = entry.stats.attack_count as f32;
        row[tail + 3] = entry.stats.danger_count as f32;
        row[tail + 4] = entry.stats.safe_time;
        row
    }
}

/// Tuning for [`ObservationAssembler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    pub recency_slots: usize,
    /// Age at which normalised recency reaches zero (seconds).
    pub recency_horizon: f32,
    /// Half-angle of the forward focus cone (radians).
    pub focus_half_angle: f32,
    /// Maximum distance for the focus summary.
    pub periphery: f32,
    pub focus_slots: usize,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            recency_slots: 4,
            recency_horizon: 60.0,
            focus_half_angle: 20f32.to_radians(),
            periphery: 10.0,
            focus_slots: 8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservationAssembler {
    config: ObservationConfig,
    cached: Option<(u64, ObservationTable)>,
}

impl ObservationAssembler {
    pub fn new(config: ObservationConfig) -> Self {
        Self { config, cached: None }
    }

    pub fn config(&self) -> &ObservationConfig {
        &self.config
    }

    /// The table for the current contents of `index`. Rebuilt only when
    /// the index revision changed since the last call.
    pub fn table(&mut self, index: &SpatialIndex) -> &ObservationTable {
        let revision = index.revision();
        if self.cached.as_ref().is_some_and(|(rev, _)| *rev != revision) {
            self.cached = None;
        }
        let (_, table) = self.cached.get_or_insert_with(|| {
            let rows = index.live_entries().map(ObservationTable::row).collect();
            (revision, ObservationTable { rows })
        });
        table
    }

    /// First `k` short-horizon items as `(x, z, category, confidence,
    /// recency)`, zero-padded to `k * 5`.
    pub fn recency_summary(&self, memory: &ShortHorizonMemory, k: usize, now: f32) -> Vec<f32> {
        let mut out = vec![0.0; k * RECENCY_FIELDS];
        let horizon = self.config.recency_horizon;
        for (slot, item) in out.chunks_exact_mut(RECENCY_FIELDS).zip(memory.items()) {
            let recency = if horizon > 0.0 {
                (1.0 - item.age(now) / horizon).clamp(0.0, 1.0)
            } else {
                0.0
            };
            slot.copy_from_slice(&[
                item.position.x,
                item.position.z,
                item.category.code(),
                item.confidence,
                recency,
            ]);
        }
        out
    }

    /// Items inside the forward cone of `pose` and closer than `periphery`,
    /// nearest first, as `(category, distance / periphery, angle /
    /// half_angle)`, zero-padded to `focus_slots * 3`.
    pub fn focus_summary(
        &self,
        memory: &ShortHorizonMemory,
        pose: &Pose,
        half_angle: f32,
        periphery: f32,
    ) -> Vec<f32> {
        let slots = self.config.focus_slots;
        let mut out = vec![0.0; slots * FOCUS_FIELDS];
        if half_angle <= 0.0 || periphery <= 0.0 {
            return out;
        }

        let mut visible: Vec<(f32, f32, Category)> = memory
            .items()
            .iter()
            .filter_map(|item| {
                let distance = item.position.ground_distance(&pose.position);
                let angle = pose.bearing_to(&item.position);
                (distance < periphery && angle.abs() <= half_angle).then_some((
                    distance,
                    angle,
                    item.category,
                ))
            })
            .collect();
        visible.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (slot, (distance, angle, category)) in out.chunks_exact_mut(FOCUS_FIELDS).zip(visible) {
            slot.copy_from_slice(&[category.code(), distance / periphery, angle / half_angle]);
        }
        out
    }

    /// `[found, distance, bearing / π]` for the closest short-horizon item
    /// of `category`; all zeros when there is none.
    pub fn closest_summary(&self, memory: &ShortHorizonMemory, category: Category, pose: &Pose) -> [f32; 3] {
        match memory.closest_of_category(category, &pose.position) {
            Some(item) => [
                1.0,
                item.position.ground_distance(&pose.position),
                pose.bearing_to(&item.position) / std::f32::consts::PI,
            ],
            None => [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::short_horizon::Sighting;
    use fauna_types::{Bounds, FeatureVector, Point3};

    fn sighting(x: f32, z: f32, category: Category) -> Sighting {
        Sighting {
            position: Point3::new(x, 0.0, z),
            category,
        }
    }

    fn memory_with(sightings: &[Sighting], now: f32) -> ShortHorizonMemory {
        let mut mem = ShortHorizonMemory::default();
        mem.update(&Pose::default(), sightings, now);
        mem
    }

    // ── table ───────────────────────────────────────────────────────────────

    #[test]
    fn table_row_layout() {
        let mut index = SpatialIndex::new();
        let p = Point3::new(1.0, 0.5, 2.0);
        let features = FeatureVector::from_slice(&[0.3, 0.3, 0.3]);
        index.insert(MemoryEntry::new(
            p,
            features,
            Bounds::new(p, Point3::new(0.3, 0.3, 0.3)),
            1.25,
            Category::Food,
            0.0,
        ));
        index.modify(0, |e| {
            e.confidence = 0.8;
            e.stats.record_danger(1.0);
            e.stats.safe_time = 4.0;
        });

        let mut assembler = ObservationAssembler::default();
        let table = assembler.table(&index);
        assert_eq!(table.len(), 1);
        let row = table.rows[0];
        assert_eq!(row[0], 1.0);
        assert_eq!(row[1], 2.0);
        assert_eq!(&row[2..5], &[0.3, 0.3, 0.3]);
        assert_eq!(row[12], 0.8);
        assert_eq!(row[13], 1.25);
        assert_eq!(row[14], 0.0);
        assert_eq!(row[15], 1.0);
        assert_eq!(row[16], 4.0);
        assert_eq!(table.flatten().len(), TABLE_WIDTH);
    }

    #[test]
    fn table_follows_index_revision() {
        let mut index = SpatialIndex::new();
        let mut assembler = ObservationAssembler::default();
        assert!(assembler.table(&index).is_empty());

        let p = Point3::origin();
        index.insert(MemoryEntry::new(
            p,
            FeatureVector::default(),
            Bounds::new(p, Point3::new(1.0, 1.0, 1.0)),
            1.0,
            Category::Obstacle,
            0.0,
        ));
        assert_eq!(assembler.table(&index).len(), 1);

        index.tombstone(0);
        assert!(assembler.table(&index).is_empty());
    }

    // ── recency ─────────────────────────────────────────────────────────────

    #[test]
    fn recency_summary_packs_and_pads() {
        let mem = memory_with(&[sighting(1.0, 2.0, Category::Food)], 0.0);
        let assembler = ObservationAssembler::default();
        let out = assembler.recency_summary(&mem, 4, 30.0);
        assert_eq!(out.len(), 20);
        assert_eq!(&out[..4], &[1.0, 2.0, 2.0, 0.6]);
        assert!((out[4] - 0.5).abs() < 1e-5);
        assert!(out[5..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn recency_summary_keeps_only_first_k() {
        let mem = memory_with(
            &[
                sighting(0.0, 1.0, Category::Food),
                sighting(0.0, 3.0, Category::Food),
                sighting(0.0, 5.0, Category::Threat),
            ],
            0.0,
        );
        let out = ObservationAssembler::default().recency_summary(&mem, 2, 0.0);
        assert_eq!(out.len(), 10);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[6], 3.0);
    }

    // ── focus ───────────────────────────────────────────────────────────────

    #[test]
    fn focus_summary_filters_cone_and_sorts_by_distance() {
        let mem = memory_with(
            &[
                sighting(0.0, 6.0, Category::Food),
                sighting(0.0, 2.0, Category::Threat),
                sighting(5.0, 1.0, Category::Food),
                sighting(0.0, 20.0, Category::Food),
            ],
            0.0,
        );
        let assembler = ObservationAssembler::default();
        let out = assembler.focus_summary(&mem, &Pose::default(), 0.35, 10.0);
        assert_eq!(out.len(), 24);
        assert_eq!(&out[..3], &[3.0, 0.2, 0.0]);
        assert_eq!(out[3], 2.0);
        assert!((out[4] - 0.6).abs() < 1e-5);
        assert!(out[6..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn focus_angle_is_normalised_and_signed() {
        let mem = memory_with(&[sighting(1.0, 5.0, Category::Food)], 0.0);
        let out = ObservationAssembler::default().focus_summary(&mem, &Pose::default(), 0.35, 10.0);
        let expected = 1f32.atan2(5.0) / 0.35;
        assert!((out[2] - expected).abs() < 1e-5);
        assert!(out[2] > 0.0);
    }

    #[test]
    fn degenerate_cone_yields_zeros() {
        let mem = memory_with(&[sighting(0.0, 2.0, Category::Food)], 0.0);
        let out = ObservationAssembler::default().focus_summary(&mem, &Pose::default(), 0.0, 10.0);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    // ── closest ─────────────────────────────────────────────────────────────

    #[test]
    fn closest_summary_reports_distance_and_bearing() {
        let mem = memory_with(&[sighting(3.0, 0.0, Category::Food)], 0.0);
        let assembler = ObservationAssembler::default();
        let out = assembler.closest_summary(&mem, Category::Food, &Pose::default());
        assert_eq!(out[0], 1.0);
        assert!((out[1] - 3.0).abs() < 1e-5);
        assert!((out[2] - 0.5).abs() < 1e-5);
        assert_eq!(assembler.closest_summary(&mem, Category::Threat, &Pose::default()), [0.0; 3]);
    }
}
