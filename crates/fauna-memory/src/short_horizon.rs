//! Short-horizon memory.
//!
//! A small list of recently confirmed sightings, kept apart from the
//! [`SpatialIndex`][crate::index::SpatialIndex] and with its own lifetime
//! rules. It answers "where is the closest food I saw recently?" and notices
//! when something that should be in view has stopped showing up.
//!
//! Each [`ShortHorizonMemory::update`] runs three steps in order:
//!
//! 1. **Prune** – drop items older than `max_age` or below `min_confidence`.
//! 2. **Observe** – each sighting reinforces the nearest same-category item
//!    within `merge_radius`, or is appended as a new item.
//! 3. **Vanish check** – items inside the vanish cone that were not seen
//!    this scan fade by `vanish_decay`. An item is discarded only once it
//!    is both older than `vanish_grace` and fainter than `vanish_floor`, so
//!    a single missed scan never drops it.
//!
//! The memory is bounded by time, not by count.

use fauna_types::{Category, Point3, Pose};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Tuning for [`ShortHorizonMemory`]. Times in seconds, angles in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortHorizonConfig {
    pub max_age: f32,
    pub min_confidence: f32,
    /// Same-category sightings closer than this are one item.
    pub merge_radius: f32,
    pub reinforce: f32,
    pub initial_confidence: f32,
    pub vanish_radius: f32,
    pub vanish_half_angle: f32,
    /// Per-scan multiplier for items expected in view but not seen.
    pub vanish_decay: f32,
    pub vanish_grace: f32,
    pub vanish_floor: f32,
}

impl Default for ShortHorizonConfig {
    fn default() -> Self {
        Self {
            max_age: 60.0,
            min_confidence: 0.01,
            merge_radius: 0.7,
            reinforce: 0.2,
            initial_confidence: 0.6,
            vanish_radius: 8.0,
            vanish_half_angle: 50f32.to_radians(),
            vanish_decay: 0.98,
            vanish_grace: 3.0,
            vanish_floor: 0.05,
        }
    }
}

/// A classified sighting handed to the short-horizon memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub position: Point3,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortHorizonItem {
    pub position: Point3,
    pub category: Category,
    pub confidence: f32,
    pub first_seen: f32,
    pub last_seen: f32,
}

impl ShortHorizonItem {
    pub fn age(&self, now: f32) -> f32 {
        now - self.last_seen
    }
}

/// Counts from one [`ShortHorizonMemory::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub pruned: usize,
    pub reinforced: usize,
    pub added: usize,
    pub faded: usize,
    pub vanished: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ShortHorizonMemory {
    config: ShortHorizonConfig,
    items: Vec<ShortHorizonItem>,
}

impl ShortHorizonMemory {
    pub fn new(config: ShortHorizonConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
        }
    }

    pub fn config(&self) -> &ShortHorizonConfig {
        &self.config
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[ShortHorizonItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Fold one scan's sightings into the memory.
    pub fn update(&mut self, pose: &Pose, sightings: &[Sighting], now: f32) -> ScanReport {
        let c = &self.config;
        let mut report = ScanReport::default();

        let before = self.items.len();
        self.items
            .retain(|item| item.age(now) <= c.max_age && item.confidence >= c.min_confidence);
        report.pruned = before - self.items.len();

        let mut seen = vec![false; self.items.len()];
        let merge_sq = c.merge_radius * c.merge_radius;
        for sighting in sightings {
            let nearest = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.category == sighting.category)
                .map(|(i, item)| (i, item.position.ground_distance_sq(&sighting.position)))
                .filter(|&(_, d)| d < merge_sq)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match nearest {
                Some((i, _)) => {
                    let item = &mut self.items[i];
                    item.confidence = (item.confidence + c.reinforce).min(1.0);
                    item.last_seen = item.last_seen.max(now);
                    item.position = sighting.position;
                    seen[i] = true;
                    report.reinforced += 1;
                }
                None => {
                    self.items.push(ShortHorizonItem {
                        position: sighting.position,
                        category: sighting.category,
                        confidence: c.initial_confidence,
                        first_seen: now,
                        last_seen: now,
                    });
                    seen.push(true);
                    report.added += 1;
                }
            }
        }

        let vanish_sq = c.vanish_radius * c.vanish_radius;
        let mut keep = Vec::with_capacity(self.items.len());
        for (item, was_seen) in self.items.iter_mut().zip(&seen) {
            let expected = item.position.ground_distance_sq(&pose.position) < vanish_sq
                && pose.bearing_to(&item.position).abs() < c.vanish_half_angle;
            if !was_seen && expected {
                item.confidence *= c.vanish_decay;
                report.faded += 1;
                if item.age(now) > c.vanish_grace && item.confidence < c.vanish_floor {
                    keep.push(false);
                    report.vanished += 1;
                    continue;
                }
            }
            keep.push(true);
        }
        let mut flags = keep.into_iter();
        self.items.retain(|_| flags.next().unwrap_or(true));

        if report.added > 0 || report.vanished > 0 || report.pruned > 0 {
            trace!(?report, items = self.items.len(), "short-horizon update");
        }
        report
    }

    /// Nearest item of `category` to `from` on the ground plane.
    pub fn closest_of_category(&self, category: Category, from: &Point3) -> Option<&ShortHorizonItem> {
        self.items
            .iter()
            .filter(|item| item.category == category)
            .min_by(|a, b| {
                a.position
                    .ground_distance_sq(from)
                    .total_cmp(&b.position.ground_distance_sq(from))
            })
    }
}
