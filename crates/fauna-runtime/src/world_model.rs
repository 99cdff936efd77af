//! [`WorldModel`] – the per-tick memory pipeline.
//!
//! Owns every stage of the world model and runs them in a fixed order:
//!
//! 1. **Scan** ([`WorldModel::ingest_scan`]) – each detection goes through
//!    [`FeatureExtractor`] → [`Classifier`] → [`IdentityMatcher`], which
//!    writes the [`SpatialIndex`]. The classified sightings then update the
//!    [`ShortHorizonMemory`].
//! 2. **Maintain** ([`WorldModel::tick`]) – [`DecayEngine`] ageing and
//!    forgiveness, followed by an index rebuild when one is due. Runs every
//!    tick whether or not a scan happened.
//! 3. **Observe** – read-only projections through the
//!    [`ObservationAssembler`], on demand.
//!
//! Danger enters from outside through
//! [`WorldModel::register_danger_event`].
//!
//! # Example
//!
//! ```rust
//! use fauna_runtime::world_model::{WorldModel, WorldModelConfig};
//! use fauna_types::{Bounds, Category, Detection, Point3, Pose, SourceId};
//!
//! let mut world = WorldModel::new(WorldModelConfig::default()).unwrap();
//! let p = Point3::new(0.0, 0.0, 2.0);
//! let berry = Detection {
//!     position: p,
//!     bounds: Bounds::new(p, Point3::new(0.3, 0.3, 0.3)),
//!     source: SourceId(7),
//!     timestamp: 0.0,
//!     tag: Some(Category::Food),
//! };
//!
//! world.ingest_scan(&Pose::default(), &[berry], 0.0);
//! world.tick(0.0);
//!
//! assert_eq!(world.observation_table().len(), 1);
//! assert!(world.closest_of_category(Category::Food).is_some());
//! ```

use fauna_memory::{
    DecayConfig, DecayEngine, DecayReport, EntryId, IdentityMatcher, IndexConfig, MatchConfig,
    MatchOutcome, MemoryEntry, ObservationAssembler, ObservationConfig, ObservationTable,
    RebuildReason, ShortHorizonConfig, ShortHorizonItem, ShortHorizonMemory, Sighting,
    SpatialIndex,
};
use fauna_perception::{Classifier, ClassifierConfig, FeatureConfig, FeatureExtractor};
use fauna_types::{Category, Detection, FEATURE_DIM, FaunaError, Point3, Pose};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::frame::ObservationFrame;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Every tunable of the world model, one section per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldModelConfig {
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub index: IndexConfig,
    pub matcher: MatchConfig,
    pub decay: DecayConfig,
    pub short_horizon: ShortHorizonConfig,
    pub observation: ObservationConfig,
}

impl WorldModelConfig {
    /// Check shapes and ranges.
    ///
    /// # Errors
    ///
    /// - [`FaunaError::InvalidShape`] when the feature weights do not hold
    ///   exactly [`FEATURE_DIM`] values.
    /// - [`FaunaError::Config`] for non-positive capacities, radii or
    ///   windows, and for confidence thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), FaunaError> {
        if self.matcher.weights.len() != FEATURE_DIM {
            return Err(FaunaError::InvalidShape {
                what: "matcher.weights".to_string(),
                expected: FEATURE_DIM,
                got: self.matcher.weights.len(),
            });
        }

        let positive = [
            ("features.history_window", self.features.history_window),
            ("matcher.query_radius", self.matcher.query_radius),
            ("decay.max_age", self.decay.max_age),
            ("decay.danger_radius", self.decay.danger_radius),
            ("short_horizon.max_age", self.short_horizon.max_age),
            ("short_horizon.merge_radius", self.short_horizon.merge_radius),
            ("observation.recency_horizon", self.observation.recency_horizon),
            ("observation.periphery", self.observation.periphery),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FaunaError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        let unit = [
            ("index.low_confidence", self.index.low_confidence),
            ("decay.min_confidence", self.decay.min_confidence),
            ("decay.attack_collapse", self.decay.attack_collapse),
            ("short_horizon.initial_confidence", self.short_horizon.initial_confidence),
            ("short_horizon.vanish_decay", self.short_horizon.vanish_decay),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(FaunaError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        if self.index.max_memory_items == 0 {
            return Err(FaunaError::Config("index.max_memory_items must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

/// What one [`WorldModel::ingest_scan`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Entry ids touched by the scan, in detection order, without repeats.
    pub touched: Vec<EntryId>,
    pub inserted: usize,
    pub reinforced: usize,
    pub replaced: usize,
}

/// What one [`WorldModel::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub decay: DecayReport,
    pub rebuild: Option<RebuildReason>,
}

// ─────────────────────────────────────────────────────────────────────────────
// WorldModel
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct WorldModel {
    config: WorldModelConfig,
    extractor: FeatureExtractor,
    classifier: Classifier,
    matcher: IdentityMatcher,
    index: SpatialIndex,
    decay: DecayEngine,
    short_horizon: ShortHorizonMemory,
    assembler: ObservationAssembler,
    pose: Pose,
    now: f32,
}

impl WorldModel {
    /// Build a world model from a validated configuration.
    ///
    /// # Errors
    ///
    /// Whatever [`WorldModelConfig::validate`] reports.
    pub fn new(config: WorldModelConfig) -> Result<Self, FaunaError> {
        config.validate()?;
        let matcher = IdentityMatcher::new(config.matcher.clone())?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            classifier: Classifier::new(config.classifier.clone()),
            matcher,
            index: SpatialIndex::new(),
            decay: DecayEngine::new(config.decay.clone()),
            short_horizon: ShortHorizonMemory::new(config.short_horizon.clone()),
            assembler: ObservationAssembler::new(config.observation.clone()),
            pose: Pose::default(),
            now: 0.0,
            config,
        })
    }

    pub fn config(&self) -> &WorldModelConfig {
        &self.config
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn short_horizon(&self) -> &ShortHorizonMemory {
        &self.short_horizon
    }

    /// Pose of the most recent scan.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Simulation time of the most recent scan or tick.
    pub fn now(&self) -> f32 {
        self.now
    }

    // ── pipeline ────────────────────────────────────────────────────────────

    /// Fold one scan's detections into both memories.
    #[instrument(skip_all, fields(detections = detections.len(), now = now))]
    pub fn ingest_scan(&mut self, pose: &Pose, detections: &[Detection], now: f32) -> ScanOutcome {
        self.pose = *pose;
        self.now = now;

        let mut outcome = ScanOutcome::default();
        let mut sightings = Vec::with_capacity(detections.len());
        for det in detections {
            let features = self.extractor.extract(det);
            let category = self.classifier.classify(det, &features.vector);
            let candidate = MemoryEntry::new(
                det.position,
                features.vector,
                det.bounds,
                features.shape_complexity,
                category,
                now,
            );

            let id = match self.matcher.ingest(&mut self.index, candidate, &self.config.index) {
                MatchOutcome::Inserted(id) => {
                    outcome.inserted += 1;
                    id
                }
                MatchOutcome::Reinforced(id) => {
                    outcome.reinforced += 1;
                    id
                }
                MatchOutcome::Replaced(id) => {
                    outcome.replaced += 1;
                    id
                }
            };
            if !outcome.touched.contains(&id) {
                outcome.touched.push(id);
            }
            sightings.push(Sighting {
                position: det.position,
                category,
            });
        }

        self.short_horizon.update(pose, &sightings, now);
        self.extractor.forget_stale(now);

        debug!(
            inserted = outcome.inserted,
            reinforced = outcome.reinforced,
            replaced = outcome.replaced,
            live = self.index.live_len(),
            "scan ingested"
        );
        outcome
    }

    /// Per-tick maintenance: decay, then rebuild if due.
    #[instrument(skip_all, fields(now = now))]
    pub fn tick(&mut self, now: f32) -> TickReport {
        self.now = now;
        let decay = self.decay.tick(&mut self.index, now);
        let rebuild = self.index.maintain(&self.config.index);
        TickReport { decay, rebuild }
    }

    /// Register a danger event (attack or not) at `position`, stamped `at`
    /// or, when `None`, the time of the latest scan or tick. Returns the
    /// number of entries affected.
    pub fn register_danger_event(&mut self, position: &Point3, is_attack: bool, at: Option<f32>) -> usize {
        let now = at.unwrap_or(self.now);
        self.decay
            .register_danger_event(&mut self.index, position, is_attack, now)
    }

    // ── queries ─────────────────────────────────────────────────────────────

    /// Copies of the live entries strictly within `radius` of `center`.
    pub fn entries_within(&self, center: &Point3, radius: f32) -> Vec<MemoryEntry> {
        self.index
            .entries_within(center, radius)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Live entry with `id`, if any.
    pub fn entry(&self, id: EntryId) -> Option<&MemoryEntry> {
        self.index.find(id).and_then(|node| self.index.entry(node))
    }

    pub fn observation_table(&mut self) -> &ObservationTable {
        self.assembler.table(&self.index)
    }

    pub fn recency_summary(&self, k: usize) -> Vec<f32> {
        self.assembler
            .recency_summary(&self.short_horizon, k, self.now)
    }

    pub fn focus_summary(&self, half_angle: f32, periphery: f32) -> Vec<f32> {
        self.assembler
            .focus_summary(&self.short_horizon, &self.pose, half_angle, periphery)
    }

    pub fn closest_of_category(&self, category: Category) -> Option<&ShortHorizonItem> {
        self.short_horizon
            .closest_of_category(category, &self.pose.position)
    }

    pub fn closest_summary(&self, category: Category) -> [f32; 3] {
        self.assembler
            .closest_summary(&self.short_horizon, category, &self.pose)
    }

    /// Every observation output in one serialisable snapshot, using the
    /// configured slot counts and focus cone.
    pub fn frame(&mut self) -> ObservationFrame {
        let obs = self.config.observation.clone();
        let table = self
            .observation_table()
            .rows
            .iter()
            .map(|row| row.to_vec())
            .collect();
        ObservationFrame {
            timestamp: self.now,
            position: self.pose.position,
            yaw: self.pose.yaw,
            live_entries: self.index.live_len(),
            table,
            recency: self.recency_summary(obs.recency_slots),
            focus: self.focus_summary(obs.focus_half_angle, obs.periphery),
            closest_food: self.closest_summary(Category::Food),
            closest_threat: self.closest_summary(Category::Threat),
        }
    }
}
