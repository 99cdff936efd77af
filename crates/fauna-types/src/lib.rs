//! `fauna-types` – shared data model for the Fauna world-model stack.
//!
//! Everything that crosses a crate boundary lives here: geometry
//! ([`Point3`], [`Bounds`], [`Pose`]), the sensor input ([`Detection`]),
//! the coarse object [`Category`], the fixed-length [`FeatureVector`] with
//! its signature hashes, and the single [`FaunaError`] type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of scalars in a [`FeatureVector`].
pub const FEATURE_DIM: usize = 10;

/// Feature dimensions folded into the shape signature (size, volume,
/// compactness, shape complexity).
pub const SHAPE_DIMS: usize = 6;

const SIGNATURE_SEED: u64 = 5381;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A point in 3-D world space. `y` is up; the ground plane is `x`/`z`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    /// Create a new point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The world origin.
    pub fn origin() -> Self {
        Self::default()
    }

    /// Squared distance on the ground plane, ignoring height.
    pub fn ground_distance_sq(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Distance on the ground plane, ignoring height.
    pub fn ground_distance(&self, other: &Point3) -> f32 {
        self.ground_distance_sq(other).sqrt()
    }
}

/// An axis-aligned bounding volume described by its centre and full size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Point3,
    pub size: Point3,
}

impl Bounds {
    /// Create a bounding volume. Negative sizes are folded to their
    /// absolute value.
    pub fn new(center: Point3, size: Point3) -> Self {
        Self {
            center,
            size: Point3::new(size.x.abs(), size.y.abs(), size.z.abs()),
        }
    }

    /// Enclosed volume.
    pub fn volume(&self) -> f32 {
        self.size.x * self.size.y * self.size.z
    }

    /// Total surface area of the box.
    pub fn surface_area(&self) -> f32 {
        let s = self.size;
        2.0 * (s.x * s.y + s.y * s.z + s.x * s.z)
    }

    /// Largest extent along any axis.
    pub fn max_dimension(&self) -> f32 {
        self.size.x.max(self.size.y).max(self.size.z)
    }

    /// Largest horizontal extent (x or z).
    pub fn footprint(&self) -> f32 {
        self.size.x.max(self.size.z)
    }
}

/// Agent pose on the ground plane.
///
/// `yaw` is measured from `+z` towards `+x`, so a yaw of zero looks down
/// the positive z axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    pub yaw: f32,
}

impl Pose {
    pub fn new(position: Point3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    /// Unit forward vector on the ground plane as `(x, z)`.
    pub fn forward(&self) -> (f32, f32) {
        (self.yaw.sin(), self.yaw.cos())
    }

    /// Signed angle in `(-π, π]` between the forward direction and the
    /// direction to `target`. Positive values are to the right (`+x` side
    /// when facing `+z`). Returns `0.0` when `target` coincides with the
    /// pose.
    pub fn bearing_to(&self, target: &Point3) -> f32 {
        let dx = target.x - self.position.x;
        let dz = target.z - self.position.z;
        if dx == 0.0 && dz == 0.0 {
            return 0.0;
        }
        let (fx, fz) = self.forward();
        let cross = fz * dx - fx * dz;
        let dot = fx * dx + fz * dz;
        cross.atan2(dot)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor input
// ────────────────────────────────────────────────────────────────────────────

/// Opaque identity of the physical object a detection was cast against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

/// Coarse object category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Unknown,
    Obstacle,
    Food,
    Threat,
}

impl Category {
    /// Numeric code used in observation vectors.
    pub fn code(self) -> f32 {
        match self {
            Category::Unknown => 0.0,
            Category::Obstacle => 1.0,
            Category::Food => 2.0,
            Category::Threat => 3.0,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Unknown => write!(f, "unknown"),
            Category::Obstacle => write!(f, "obstacle"),
            Category::Food => write!(f, "food"),
            Category::Threat => write!(f, "threat"),
        }
    }
}

/// One raw sensed hit against a candidate object in a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub position: Point3,
    pub bounds: Bounds,
    pub source: SourceId,
    /// Simulation time of the scan (seconds).
    pub timestamp: f32,
    /// Category asserted by the sensor itself (e.g. an "edible" marker).
    /// When present it overrides the geometric heuristics.
    pub tag: Option<Category>,
}

// ────────────────────────────────────────────────────────────────────────────
// FeatureVector
// ────────────────────────────────────────────────────────────────────────────

/// Fixed-length feature description of a detected object.
///
/// | idx | meaning |
/// |-----|---------|
/// | 0–2 | bounding size x, y, z |
/// | 3   | volume |
/// | 4   | compactness |
/// | 5   | shape complexity |
/// | 6   | moving flag |
/// | 7   | mean speed |
/// | 8–9 | mean heading x, z |
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; FEATURE_DIM]);

impl FeatureVector {
    pub const SIZE_X: usize = 0;
    pub const SIZE_Y: usize = 1;
    pub const SIZE_Z: usize = 2;
    pub const VOLUME: usize = 3;
    pub const COMPACTNESS: usize = 4;
    pub const SHAPE_COMPLEXITY: usize = 5;
    pub const MOVING: usize = 6;
    pub const SPEED: usize = 7;
    pub const DIR_X: usize = 8;
    pub const DIR_Z: usize = 9;

    /// Copy `values` into a new vector, zero-padding or truncating to
    /// [`FEATURE_DIM`].
    pub fn from_slice(values: &[f32]) -> Self {
        let mut out = [0.0; FEATURE_DIM];
        for (dst, src) in out.iter_mut().zip(values) {
            *dst = *src;
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> f32 {
        self.0.get(idx).copied().unwrap_or(0.0)
    }

    /// Hash of the geometric dimensions quantised to three decimals.
    ///
    /// Two vectors whose first [`SHAPE_DIMS`] entries agree after rounding
    /// to three decimals always produce the same hash.
    pub fn shape_hash(&self) -> u64 {
        fold_signature(&self.0[..SHAPE_DIMS])
    }

    /// Hash of the motion dimensions quantised to three decimals.
    pub fn motion_hash(&self) -> u64 {
        fold_signature(&self.0[SHAPE_DIMS..])
    }

    /// Root-mean-square of the per-dimension differences, each scaled by
    /// the matching weight.
    pub fn weighted_distance(&self, other: &FeatureVector, weights: &[f32; FEATURE_DIM]) -> f32 {
        let sum: f32 = self
            .0
            .iter()
            .zip(&other.0)
            .zip(weights)
            .map(|((a, b), w)| {
                let d = (a - b) * w;
                d * d
            })
            .sum();
        (sum / FEATURE_DIM as f32).sqrt()
    }
}

fn fold_signature(dims: &[f32]) -> u64 {
    dims.iter().fold(SIGNATURE_SEED, |hash, v| {
        let quantised = (v * 1000.0).round() as i64;
        hash.wrapping_mul(33).wrapping_add(quantised as u64)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors surfaced to callers of the world-model stack.
///
/// Everything inside the memory engine is total; only externally supplied
/// shapes and configuration can fail.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FaunaError {
    #[error("Invalid Shape for {what}: expected {expected} values, got {got}")]
    InvalidShape {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_distance_ignores_height() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 100.0, 4.0);
        assert!((a.ground_distance(&b) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn bounds_fold_negative_sizes() {
        let b = Bounds::new(Point3::origin(), Point3::new(-1.0, 2.0, -3.0));
        assert_eq!(b.size, Point3::new(1.0, 2.0, 3.0));
        assert!((b.volume() - 6.0).abs() < 1e-5);
        assert!((b.surface_area() - 22.0).abs() < 1e-5);
        assert!((b.max_dimension() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn bearing_is_signed() {
        let pose = Pose::new(Point3::origin(), 0.0);
        assert!(pose.bearing_to(&Point3::new(0.0, 0.0, 5.0)).abs() < 1e-5);
        let right = pose.bearing_to(&Point3::new(5.0, 0.0, 0.0));
        assert!((right - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        let left = pose.bearing_to(&Point3::new(-5.0, 0.0, 0.0));
        assert!((left + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn bearing_follows_yaw() {
        let pose = Pose::new(Point3::origin(), std::f32::consts::FRAC_PI_2);
        assert!(pose.bearing_to(&Point3::new(5.0, 0.0, 0.0)).abs() < 1e-5);
    }

    #[test]
    fn category_codes_are_distinct() {
        let codes = [
            Category::Unknown.code(),
            Category::Obstacle.code(),
            Category::Food.code(),
            Category::Threat.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Food).unwrap();
        assert_eq!(json, "\"food\"");
        let back: Category = serde_json::from_str("\"threat\"").unwrap();
        assert_eq!(back, Category::Threat);
    }

    // ── FeatureVector ───────────────────────────────────────────────────────

    #[test]
    fn from_slice_pads_short_input() {
        let v = FeatureVector::from_slice(&[1.0, 2.0]);
        assert_eq!(v.get(0), 1.0);
        assert_eq!(v.get(1), 2.0);
        assert_eq!(v.get(9), 0.0);
    }

    #[test]
    fn from_slice_truncates_long_input() {
        let long: Vec<f32> = (0..15).map(|i| i as f32).collect();
        let v = FeatureVector::from_slice(&long);
        assert_eq!(v.as_slice().len(), FEATURE_DIM);
        assert_eq!(v.get(9), 9.0);
    }

    #[test]
    fn shape_hash_stable_under_sub_millesimal_noise() {
        let a = FeatureVector::from_slice(&[0.5, 0.5, 0.5, 0.125, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let b = FeatureVector::from_slice(&[
            0.50004, 0.49998, 0.5, 0.12501, 1.0, 1.00002, 1.0, 2.5, 0.3, -0.9,
        ]);
        assert_eq!(a.shape_hash(), b.shape_hash());
        // Motion dimensions differ, so the motion hash does too.
        assert_ne!(a.motion_hash(), b.motion_hash());
    }

    #[test]
    fn shape_hash_changes_with_geometry() {
        let a = FeatureVector::from_slice(&[0.5, 0.5, 0.5, 0.125, 1.0, 1.0]);
        let b = FeatureVector::from_slice(&[0.6, 0.5, 0.5, 0.125, 1.0, 1.0]);
        assert_ne!(a.shape_hash(), b.shape_hash());
    }

    #[test]
    fn weighted_distance_zero_for_identical() {
        let v = FeatureVector::from_slice(&[1.0; FEATURE_DIM]);
        assert_eq!(v.weighted_distance(&v, &[1.0; FEATURE_DIM]), 0.0);
    }

    #[test]
    fn weighted_distance_is_rms() {
        let a = FeatureVector::default();
        let b = FeatureVector::from_slice(&[1.0; FEATURE_DIM]);
        let mut weights = [0.0; FEATURE_DIM];
        weights[0] = 2.0;
        // Only dim 0 contributes: sqrt((2*1)^2 / 10)
        let expected = (4.0f32 / 10.0).sqrt();
        assert!((a.weighted_distance(&b, &weights) - expected).abs() < 1e-6);
    }

    #[test]
    fn error_display_names_shape() {
        let err = FaunaError::InvalidShape {
            what: "feature weights".to_string(),
            expected: 10,
            got: 3,
        };
        let text = err.to_string();
        assert!(text.contains("feature weights"));
        assert!(text.contains("10"));
    }
}
