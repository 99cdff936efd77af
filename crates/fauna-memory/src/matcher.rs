//! Identity matching.
//!
//! Decides whether a freshly classified sighting is an object the index
//! already holds. Candidates come from a ground-plane range query around
//! the sighting; a node qualifies when
//!
//! 1. its weighted feature distance to the sighting is below
//!    `feature_threshold`,
//! 2. its shape signature equals the sighting's, and
//! 3. it is the nearest qualifying node so far.
//!
//! A qualifying node is either *reinforced* (same shape and category: only
//! `last_seen` and confidence change) or *replaced* (category drifted: the
//! sighting's geometry and classification overwrite the entry, while its
//! identity, position of record and danger history survive). Without a
//! match the sighting is inserted under the index capacity policy.

use fauna_types::{FEATURE_DIM, FaunaError};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entry::{EntryId, MemoryEntry};
use crate::index::{IndexConfig, NodeId, SpatialIndex};

/// Tuning for [`IdentityMatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Ground-plane radius searched for candidates.
    pub query_radius: f32,
    /// Weighted feature distance a candidate must stay below.
    pub feature_threshold: f32,
    /// Per-dimension feature weights; must have exactly
    /// [`FEATURE_DIM`] entries.
    pub weights: Vec<f32>,
    /// Confidence gained by a stable match.
    pub stable_boost: f32,
    /// Confidence gained by a drifted match.
    pub drift_boost: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            query_radius: 1.5,
            feature_threshold: 0.5,
            weights: vec![1.0, 1.0, 1.0, 0.5, 0.8, 0.8, 0.3, 0.4, 0.2, 0.2],
            stable_boost: 0.12,
            drift_boost: 0.26,
        }
    }
}

/// What [`IdentityMatcher::ingest`] did with a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Same object, same shape and category.
    Reinforced(EntryId),
    /// Same object whose category drifted; fields were replaced.
    Replaced(EntryId),
    /// No match; a new entry was created.
    Inserted(EntryId),
}

impl MatchOutcome {
    pub fn entry_id(&self) -> EntryId {
        match *self {
            MatchOutcome::Reinforced(id) | MatchOutcome::Replaced(id) | MatchOutcome::Inserted(id) => id,
        }
    }
}

/// Merges sightings into the [`SpatialIndex`].
#[derive(Debug, Clone)]
pub struct IdentityMatcher {
    config: MatchConfig,
    weights: [f32; FEATURE_DIM],
}

impl IdentityMatcher {
    /// Build a matcher.
    ///
    /// # Errors
    ///
    /// [`FaunaError::InvalidShape`] when `config.weights` does not hold
    /// exactly [`FEATURE_DIM`] values.
    pub fn new(config: MatchConfig) -> Result<Self, FaunaError> {
        let weights: [f32; FEATURE_DIM] =
            config
                .weights
                .as_slice()
                .try_into()
                .map_err(|_| FaunaError::InvalidShape {
                    what: "feature weights".to_string(),
                    expected: FEATURE_DIM,
                    got: config.weights.len(),
                })?;
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Weighted RMS feature distance between two entries.
    pub fn feature_distance(&self, a: &MemoryEntry, b: &MemoryEntry) -> f32 {
        a.features.weighted_distance(&b.features, &self.weights)
    }

    /// Find the node `candidate` should merge into, if any.
    pub fn find_match(&self, index: &SpatialIndex, candidate: &MemoryEntry) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        let mut best_dist_sq = f32::INFINITY;

        for node in index.range_query(&candidate.position, self.config.query_radius) {
            let Some(existing) = index.entry(node) else {
                continue;
            };
            let feature_dist = self.feature_distance(existing, candidate);
            let dist_sq = existing.position.ground_distance_sq(&candidate.position);
            if feature_dist < self.config.feature_threshold
                && dist_sq < best_dist_sq
                && existing.shape_hash == candidate.shape_hash
            {
                best = Some(node);
                best_dist_sq = dist_sq;
            }
        }
        best
    }

    /// Merge `candidate` into `index`, inserting it under `capacity` when
    /// nothing matches.
    pub fn ingest(
        &self,
        index: &mut SpatialIndex,
        candidate: MemoryEntry,
        capacity: &IndexConfig,
    ) -> MatchOutcome {
        let now = candidate.last_seen;
        let Some(node) = self.find_match(index, &candidate) else {
            let id = index.insert_bounded(candidate, capacity);
            trace!(entry = id, "inserted new entry");
            return MatchOutcome::Inserted(id);
        };

        let mut outcome = None;
        index.modify(node, |existing| {
            if existing.shape_hash == candidate.shape_hash && existing.category == candidate.category {
                existing.reinforce(self.config.stable_boost, now);
                outcome = Some(MatchOutcome::Reinforced(existing.id));
            } else {
                existing.adopt_shape(&candidate);
                existing.reinforce(self.config.drift_boost, now);
                outcome = Some(MatchOutcome::Replaced(existing.id));
            }
        });

        let outcome = outcome.unwrap_or_else(|| {
            // Unreachable while `find_match` only returns live nodes.
            MatchOutcome::Inserted(index.insert_bounded(candidate, capacity))
        });
        trace!(?outcome, "merged sighting");
        outcome
    }
}
