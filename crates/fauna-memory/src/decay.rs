//! Temporal decay and forgiveness.
//!
//! Each tick the [`DecayEngine`] runs two passes over the index:
//!
//! 1. **Tombstone pass** – any entry whose age has reached `max_age`, or
//!    whose confidence is below `min_confidence`, is tombstoned.
//! 2. **Forgiveness pass** – over the remaining live entries:
//!    - outstanding attacks whose last attack is older than
//!      `danger_cooldown`: one attack is forgiven and confidence rises by
//!      `forgiveness_rate`;
//!    - otherwise the elapsed time is credited as safe experience. Entries
//!      with a danger history also win back confidence asymptotically,
//!      `c += forgiveness_rate · (1 − c)`.
//!
//! Attack counts only go down once the cooldown has passed. An entry that
//! was never near danger is never raised by forgiveness, so without sightings
//! or danger events its confidence is non-increasing until it expires.
//!
//! Danger enters through [`DecayEngine::register_danger_event`], the only
//! mutation path into the memory besides sightings. Attacks collapse
//! confidence multiplicatively, never below the floor.
//!
//! # Example
//!
//! ```rust
//! use fauna_memory::decay::{DecayConfig, DecayEngine};
//! use fauna_memory::entry::MemoryEntry;
//! use fauna_memory::index::SpatialIndex;
//! use fauna_types::{Bounds, Category, FeatureVector, Point3};
//!
//! let mut index = SpatialIndex::new();
//! let p = Point3::origin();
//! index.insert(MemoryEntry::new(p, FeatureVector::default(),
//!     Bounds::new(p, Point3::new(1.0, 1.0, 1.0)), 1.0, Category::Unknown, 0.0));
//!
//! let mut decay = DecayEngine::new(DecayConfig::default());
//! decay.register_danger_event(&mut index, &p, true, 1.0);
//! let c = index.live_entries().next().unwrap().confidence;
//! assert!((c - 0.57).abs() < 1e-5);
//!
//! decay.tick(&mut index, 300.0);
//! assert!(index.is_empty());
//! ```

use fauna_types::Point3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::SpatialIndex;

/// Tuning for [`DecayEngine`]. Times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub max_age: f32,
    pub min_confidence: f32,
    pub forgiveness_rate: f32,
    pub danger_cooldown: f32,
    /// Radius around a danger event within which entries are affected.
    pub danger_radius: f32,
    /// Multiplier applied to confidence by an attack.
    pub attack_collapse: f32,
    /// Attack timestamps kept per entry.
    pub max_attack_history: usize,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            max_age: 240.0,
            min_confidence: 0.05,
            forgiveness_rate: 0.01,
            danger_cooldown: 24.0,
            danger_radius: 3.0,
            attack_collapse: 0.57,
            max_attack_history: 8,
        }
    }
}

/// Summary of one [`DecayEngine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub tombstoned: usize,
    pub forgiven: usize,
}

#[derive(Debug, Clone)]
pub struct DecayEngine {
    config: DecayConfig,
    last_tick: Option<f32>,
}

impl DecayEngine {
    pub fn new(config: DecayConfig) -> Self {
        Self {
            config,
            last_tick: None,
        }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Run the tombstone and forgiveness passes for time `now`.
    pub fn tick(&mut self, index: &mut SpatialIndex, now: f32) -> DecayReport {
        let c = &self.config;
        let elapsed = self.last_tick.map_or(0.0, |t| (now - t).max(0.0));
        self.last_tick = Some(now);

        let tombstoned = index.age_and_tombstone(now, c.max_age, c.min_confidence);

        let mut forgiven = 0;
        index.modify_live(|entry| {
            let stats = &mut entry.stats;
            let cooled = stats
                .last_attack
                .is_none_or(|t| now - t > c.danger_cooldown);
            if stats.attack_count > 0 && cooled {
                stats.attack_count -= 1;
                entry.confidence = (entry.confidence + c.forgiveness_rate).min(1.0);
                forgiven += 1;
                true
            } else {
                stats.safe_time += elapsed;
                let before = entry.confidence;
                if stats.danger_count > 0 {
                    entry.confidence += c.forgiveness_rate * (1.0 - entry.confidence);
                }
                elapsed > 0.0 || entry.confidence != before
            }
        });

        if tombstoned > 0 || forgiven > 0 {
            debug!(tombstoned, forgiven, live = index.live_len(), "decay tick");
        }
        DecayReport {
            tombstoned,
            forgiven,
        }
    }

    /// Register a danger event at `position`. Every live entry within the
    /// danger radius gets its danger statistics updated; attacks also
    /// collapse its confidence. Returns the number of entries affected.
    pub fn register_danger_event(
        &self,
        index: &mut SpatialIndex,
        position: &Point3,
        is_attack: bool,
        now: f32,
    ) -> usize {
        let c = &self.config;
        let nodes = index.range_query(position, c.danger_radius);
        for &node in &nodes {
            index.modify(node, |entry| {
                entry.stats.record_danger(now);
                if is_attack {
                    entry.stats.record_attack(now, c.max_attack_history);
                    entry.confidence = (entry.confidence * c.attack_collapse).max(c.min_confidence);
                }
            });
        }
        debug!(affected = nodes.len(), is_attack, "danger event registered");
        nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MemoryEntry;
    use fauna_types::{Bounds, Category, FeatureVector};

    fn index_with(points: &[(f32, f32)]) -> SpatialIndex {
        let mut index = SpatialIndex::new();
        for &(x, z) in points {
            let p = Point3::new(x, 0.0, z);
            index.insert(MemoryEntry::new(
                p,
                FeatureVector::default(),
                Bounds::new(p, Point3::new(1.0, 1.0, 1.0)),
                1.0,
                Category::Unknown,
                0.0,
            ));
        }
        index
    }

    fn first(index: &SpatialIndex) -> &MemoryEntry {
        index.live_entries().next().unwrap()
    }

    // ── tombstone pass ──────────────────────────────────────────────────────

    #[test]
    fn unreinforced_entry_never_gains_and_dies_at_max_age() {
        let mut index = index_with(&[(0.0, 0.0)]);
        index.modify(0, |e| e.confidence = 0.5);
        let mut decay = DecayEngine::new(DecayConfig::default());
        let mut previous = 0.5;
        let mut t = 0.0;
        while t < 240.0 {
            decay.tick(&mut index, t);
            let c = first(&index).confidence;
            assert!(c <= previous, "confidence rose at t={t}: {previous} -> {c}");
            previous = c;
            t += 10.0;
        }
        assert_eq!(index.live_len(), 1);
        let report = decay.tick(&mut index, 240.0);
        assert_eq!(report.tombstoned, 1);
        assert!(index.is_empty());
    }

    #[test]
    fn collapsed_entry_is_tombstoned_below_floor() {
        let mut index = index_with(&[(0.0, 0.0)]);
        let config = DecayConfig {
            min_confidence: 0.2,
            ..DecayConfig::default()
        };
        let mut decay = DecayEngine::new(config);
        for i in 0..3 {
            decay.register_danger_event(&mut index, &Point3::origin(), true, i as f32);
        }
        // Floor holds the value at min_confidence, which is not below it.
        assert!((first(&index).confidence - 0.2).abs() < 1e-6);
        index.modify(0, |e| e.confidence = 0.1);
        assert_eq!(decay.tick(&mut index, 3.0).tombstoned, 1);
    }

    // ── danger events ───────────────────────────────────────────────────────

    #[test]
    fn danger_event_only_touches_nearby_entries() {
        let mut index = index_with(&[(0.0, 0.0), (10.0, 0.0)]);
        let decay = DecayEngine::new(DecayConfig::default());
        let affected = decay.register_danger_event(&mut index, &Point3::new(1.0, 0.0, 0.0), false, 5.0);
        assert_eq!(affected, 1);
        let near = index.entry(0).unwrap();
        assert_eq!(near.stats.danger_count, 1);
        assert_eq!(near.stats.attack_count, 0);
        assert_eq!(near.stats.last_danger, Some(5.0));
        assert_eq!(near.confidence, 1.0);
        assert_eq!(index.entry(1).unwrap().stats.danger_count, 0);
    }

    #[test]
    fn attack_collapses_confidence_and_records_time() {
        let mut index = index_with(&[(0.0, 0.0)]);
        let decay = DecayEngine::new(DecayConfig::default());
        decay.register_danger_event(&mut index, &Point3::origin(), true, 2.0);
        decay.register_danger_event(&mut index, &Point3::origin(), true, 3.0);
        let e = first(&index);
        assert!((e.confidence - 0.57 * 0.57).abs() < 1e-5);
        assert_eq!(e.stats.attack_count, 2);
        assert_eq!(e.stats.danger_count, 2);
        assert_eq!(e.stats.attack_times, [2.0, 3.0]);
    }

    #[test]
    fn attack_history_ring_drops_oldest() {
        let mut index = index_with(&[(0.0, 0.0)]);
        let decay = DecayEngine::new(DecayConfig {
            min_confidence: 0.0,
            max_attack_history: 3,
            ..DecayConfig::default()
        });
        for t in 0..5 {
            decay.register_danger_event(&mut index, &Point3::origin(), true, t as f32);
        }
        assert_eq!(first(&index).stats.attack_times, [2.0, 3.0, 4.0]);
    }

    // ── forgiveness ─────────────────────────────────────────────────────────

    #[test]
    fn attacks_are_not_forgiven_inside_cooldown() {
        let mut index = index_with(&[(0.0, 0.0)]);
        let mut decay = DecayEngine::new(DecayConfig::default());
        decay.register_danger_event(&mut index, &Point3::origin(), true, 0.0);
        decay.tick(&mut index, 5.0);
        let report = decay.tick(&mut index, 10.0);
        assert_eq!(report.forgiven, 0);
        let e = first(&index);
        assert_eq!(e.stats.attack_count, 1);
        // Only the asymptotic nudge applies: 0.57 → two steps of 1%.
        let expected = 1.0 - 0.43 * 0.99f32.powi(2);
        assert!((e.confidence - expected).abs() < 1e-5);
        assert!((e.stats.safe_time - 5.0).abs() < 1e-5);
    }

    #[test]
    fn attack_is_forgiven_after_cooldown() {
        let mut index = index_with(&[(0.0, 0.0)]);
        let mut decay = DecayEngine::new(DecayConfig::default());
        decay.register_danger_event(&mut index, &Point3::origin(), true, 0.0);
        let report = decay.tick(&mut index, 25.0);
        assert_eq!(report.forgiven, 1);
        let e = first(&index);
        assert_eq!(e.stats.attack_count, 0);
        assert!((e.confidence - 0.58).abs() < 1e-5);
        // History of when attacks happened is kept.
        assert_eq!(e.stats.attack_times.len(), 1);
    }

    #[test]
    fn safe_experience_accumulates_and_confidence_approaches_one() {
        let mut index = index_with(&[(0.0, 0.0)]);
        index.modify(0, |e| e.confidence = 0.5);
        let mut decay = DecayEngine::new(DecayConfig::default());
        // A near miss: danger history, but no attack.
        decay.register_danger_event(&mut index, &Point3::origin(), false, 0.0);
        decay.tick(&mut index, 0.0);
        decay.tick(&mut index, 1.0);
        decay.tick(&mut index, 3.0);
        let e = first(&index);
        assert!((e.stats.safe_time - 3.0).abs() < 1e-5);
        // 0.5 → three asymptotic steps of 1%.
        let expected = 1.0 - 0.5 * 0.99f32.powi(3);
        assert!((e.confidence - expected).abs() < 1e-5);
        assert!(e.confidence < 1.0);
    }

    #[test]
    fn safe_time_without_danger_history_leaves_confidence_alone() {
        let mut index = index_with(&[(0.0, 0.0)]);
        index.modify(0, |e| e.confidence = 0.5);
        let mut decay = DecayEngine::new(DecayConfig::default());
        decay.tick(&mut index, 0.0);
        decay.tick(&mut index, 30.0);
        let e = first(&index);
        assert!((e.stats.safe_time - 30.0).abs() < 1e-5);
        assert_eq!(e.confidence, 0.5);
    }

    // ── config ──────────────────────────────────────────────────────────────

    #[test]
    fn partial_config_takes_defaults() {
        let config: DecayConfig = serde_json::from_str(r#"{"max_age": 120.0}"#).unwrap();
        assert_eq!(config.max_age, 120.0);
        assert_eq!(config.danger_cooldown, 24.0);
        assert_eq!(config.max_attack_history, 8);
    }
}
