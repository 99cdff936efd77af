//! Feature Extraction.
//!
//! Converts a single [`Detection`] into a [`FeatureVector`] by combining the
//! geometry of its bounding volume with the motion of the same source object
//! over a short sliding window of past positions.
//!
//! Geometry terms:
//!
//! ```text
//! compactness      = volume / max_dim³                 ∈ (0, 1]
//! shape_complexity = surface_area / (6 · volume^(2/3)) ≥ 1   (cube = 1)
//! ```
//!
//! Motion terms are computed over the samples still inside the window:
//! mean speed is path length divided by elapsed time, heading is the unit
//! ground-plane displacement between the oldest and newest sample.
//!
//! # Example
//!
//! ```rust
//! use fauna_perception::features::{FeatureConfig, FeatureExtractor};
//! use fauna_types::{Bounds, Detection, FeatureVector, Point3, SourceId};
//!
//! let mut fx = FeatureExtractor::new(FeatureConfig::default());
//! let det = Detection {
//!     position: Point3::origin(),
//!     bounds: Bounds::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)),
//!     source: SourceId(7),
//!     timestamp: 0.0,
//!     tag: None,
//! };
//! let features = fx.extract(&det);
//! assert!((features.shape_complexity - 1.0).abs() < 1e-5);
//! assert_eq!(features.vector.get(FeatureVector::MOVING), 0.0);
//! ```

use std::collections::{HashMap, VecDeque};

use fauna_types::{Bounds, Detection, FEATURE_DIM, FeatureVector, Point3, SourceId};
use serde::{Deserialize, Serialize};
use tracing::trace;

const MIN_ELAPSED: f32 = 1e-4;
const MIN_DISPLACEMENT: f32 = 1e-5;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for [`FeatureExtractor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Length of the positional history window (seconds).
    pub history_window: f32,
    /// Mean speed above which the moving flag is raised (units/s).
    pub moving_speed: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            history_window: 1.7,
            moving_speed: 0.1,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// Result of [`FeatureExtractor::extract`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub vector: FeatureVector,
    pub shape_complexity: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// FeatureExtractor
// ─────────────────────────────────────────────────────────────────────────────

/// Stateful feature extractor.
///
/// Holds a per-source ring of `(timestamp, position)` samples so that motion
/// can be estimated from repeated sightings of the same object.
#[derive(Debug)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    history: HashMap<SourceId, VecDeque<(f32, Point3)>>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    /// Record `det` in the source's history and compute its features.
    pub fn extract(&mut self, det: &Detection) -> Features {
        let window = self.config.history_window.max(0.0);
        let samples = self.history.entry(det.source).or_default();

        match samples.back() {
            // Time went backwards (e.g. simulation reset): start over.
            Some(&(t, _)) if det.timestamp < t => samples.clear(),
            Some(&(t, _)) if det.timestamp == t => {
                samples.pop_back();
            }
            _ => {}
        }
        samples.push_back((det.timestamp, det.position));
        while let Some(&(t, _)) = samples.front() {
            if det.timestamp - t > window {
                samples.pop_front();
            } else {
                break;
            }
        }

        let (speed, dir_x, dir_z) = motion(samples);
        let (compactness, shape_complexity) = shape_terms(&det.bounds);
        let moving = if speed > self.config.moving_speed { 1.0 } else { 0.0 };

        let mut values = [0.0f32; FEATURE_DIM];
        values[FeatureVector::SIZE_X] = det.bounds.size.x;
        values[FeatureVector::SIZE_Y] = det.bounds.size.y;
        values[FeatureVector::SIZE_Z] = det.bounds.size.z;
        values[FeatureVector::VOLUME] = det.bounds.volume();
        values[FeatureVector::COMPACTNESS] = compactness;
        values[FeatureVector::SHAPE_COMPLEXITY] = shape_complexity;
        values[FeatureVector::MOVING] = moving;
        values[FeatureVector::SPEED] = speed;
        values[FeatureVector::DIR_X] = dir_x;
        values[FeatureVector::DIR_Z] = dir_z;

        trace!(source = det.source.0, speed, shape_complexity, "features extracted");

        Features {
            vector: FeatureVector(values),
            shape_complexity,
        }
    }

    /// Drop the history of every source not seen within the window of
    /// `now`. Returns the number of sources forgotten.
    pub fn forget_stale(&mut self, now: f32) -> usize {
        let window = self.config.history_window.max(0.0);
        let before = self.history.len();
        self.history
            .retain(|_, samples| matches!(samples.back(), Some(&(t, _)) if now - t <= window));
        before - self.history.len()
    }

    /// Number of sources with a live history.
    pub fn tracked_sources(&self) -> usize {
        self.history.len()
    }
}

fn motion(samples: &VecDeque<(f32, Point3)>) -> (f32, f32, f32) {
    let (Some(&(t0, first)), Some(&(t1, last))) = (samples.front(), samples.back()) else {
        return (0.0, 0.0, 0.0);
    };
    let elapsed = t1 - t0;
    if elapsed < MIN_ELAPSED {
        return (0.0, 0.0, 0.0);
    }

    let path: f32 = samples
        .iter()
        .zip(samples.iter().skip(1))
        .map(|((_, a), (_, b))| a.ground_distance(b))
        .sum();
    let speed = path / elapsed;

    let dx = last.x - first.x;
    let dz = last.z - first.z;
    let norm = (dx * dx + dz * dz).sqrt();
    if norm < MIN_DISPLACEMENT {
        (speed, 0.0, 0.0)
    } else {
        (speed, dx / norm, dz / norm)
    }
}

/// `(compactness, shape_complexity)` of a bounding volume. Degenerate boxes
/// (zero volume) report zero for both.
fn shape_terms(bounds: &Bounds) -> (f32, f32) {
    let volume = bounds.volume();
    let max_dim = bounds.max_dimension();
    if volume <= f32::EPSILON || max_dim <= 0.0 {
        return (0.0, 0.0);
    }
    let compactness = volume / (max_dim * max_dim * max_dim);
    let complexity = bounds.surface_area() / (6.0 * volume.powf(2.0 / 3.0));
    (compactness, complexity)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
