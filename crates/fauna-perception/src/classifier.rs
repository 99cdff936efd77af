//! Coarse object classification.
//!
//! A sensor-supplied tag is authoritative. Otherwise the rules below are
//! evaluated in order and the first hit wins:
//!
//! | # | condition                                   | category   |
//! |---|---------------------------------------------|------------|
//! | 1 | tall and thin                               | `Obstacle` |
//! | 2 | large and static, or large and not small    | `Obstacle` |
//! | 3 | small, complex shape, moving                | `Threat`   |
//! | 4 | small, not fast, not large                  | `Food`     |
//! | – | anything else                               | `Unknown`  |
//!
//! "Small", "large", "tall", "fast" and friends are thresholds from
//! [`ClassifierConfig`] applied to the bounding volume and to the motion
//! dimensions of the [`FeatureVector`].

use fauna_types::{Category, Detection, FeatureVector};
use serde::{Deserialize, Serialize};

/// Thresholds used by [`Classifier`]. All sizes are in world units, all
/// speeds in units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Largest dimension below which an object counts as small.
    pub small_size: f32,
    /// Largest dimension above which an object counts as large.
    pub large_size: f32,
    /// Volume above which an object counts as large regardless of shape.
    pub large_volume: f32,
    /// Height above which an object counts as tall.
    pub tall_height: f32,
    /// Minimum height-to-footprint ratio for "thin".
    pub thin_ratio: f32,
    /// Speed below which an object counts as static.
    pub static_speed: f32,
    /// Speed above which an object counts as fast.
    pub fast_speed: f32,
    /// Shape complexity above which an object counts as complex.
    pub complex_shape: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            small_size: 0.6,
            large_size: 2.0,
            large_volume: 4.0,
            tall_height: 1.8,
            thin_ratio: 3.0,
            static_speed: 0.05,
            fast_speed: 3.0,
            complex_shape: 1.2,
        }
    }
}

/// Rule-based classifier over bounding geometry and motion features.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Assign a [`Category`] to `det` given its extracted `features`.
    pub fn classify(&self, det: &Detection, features: &FeatureVector) -> Category {
        if let Some(tag) = det.tag {
            return tag;
        }

        let c = &self.config;
        let bounds = &det.bounds;
        let max_dim = bounds.max_dimension();
        let height = bounds.size.y;
        let speed = features.get(FeatureVector::SPEED);

        let small = max_dim < c.small_size;
        let large = max_dim > c.large_size || bounds.volume() > c.large_volume;
        let tall = height > c.tall_height;
        let thin = height >= c.thin_ratio * bounds.footprint();
        let is_static = speed < c.static_speed;
        let moving = features.get(FeatureVector::MOVING) > 0.5;
        let fast = speed > c.fast_speed;
        let complex = features.get(FeatureVector::SHAPE_COMPLEXITY) > c.complex_shape;

        if (tall && thin) || (large && is_static) || (large && !small) {
            Category::Obstacle
        } else if small && complex && moving {
            Category::Threat
        } else if small && !fast && !large {
            Category::Food
        } else {
            Category::Unknown
        }
    }
}
