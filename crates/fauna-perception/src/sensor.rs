//! Sensor seam and an in-process scripted sensor.
//!
//! The real sensing front end (probe casting against a scene) lives outside
//! this workspace; the world model only sees it through the [`Sensor`]
//! trait. [`ScriptedSensor`] replays a fixed set of simulated objects with
//! constant-velocity motion so the full stack can run in tests and CI
//! without a simulator attached.
//!
//! # Example
//!
//! ```rust
//! use fauna_perception::sensor::{ScriptedSensor, Sensor, SimObject};
//! use fauna_types::{Category, Point3, Pose};
//!
//! let mut sensor = ScriptedSensor::new(10.0, std::f32::consts::PI)
//!     .with_object(SimObject::fixed(1, Point3::new(0.0, 0.0, 3.0), Point3::new(0.3, 0.3, 0.3))
//!         .tagged(Category::Food));
//!
//! let hits = sensor.scan(&Pose::default(), 0.0);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].tag, Some(Category::Food));
//! ```

use fauna_types::{Bounds, Category, Detection, Point3, Pose, SourceId};

/// Anything that can produce a batch of detections for the current pose.
pub trait Sensor {
    /// Return every detection visible from `pose` at simulation time `now`.
    fn scan(&mut self, pose: &Pose, now: f32) -> Vec<Detection>;
}

// ────────────────────────────────────────────────────────────────────────────
// SimObject
// ────────────────────────────────────────────────────────────────────────────

/// A simulated object with constant-velocity motion and an optional
/// lifetime window.
#[derive(Debug, Clone, PartialEq)]
pub struct SimObject {
    pub id: SourceId,
    pub start: Point3,
    pub velocity: Point3,
    pub size: Point3,
    pub tag: Option<Category>,
    /// Time the object appears.
    pub spawn: f32,
    /// Time the object disappears, if ever.
    pub despawn: Option<f32>,
}

impl SimObject {
    /// A static object present from `t = 0` onwards.
    pub fn fixed(id: u64, position: Point3, size: Point3) -> Self {
        Self {
            id: SourceId(id),
            start: position,
            velocity: Point3::origin(),
            size,
            tag: None,
            spawn: 0.0,
            despawn: None,
        }
    }

    /// Give the object a constant ground velocity.
    pub fn moving(mut self, velocity: Point3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Attach an authoritative category tag.
    pub fn tagged(mut self, category: Category) -> Self {
        self.tag = Some(category);
        self
    }

    /// Restrict the object to `[spawn, despawn)`.
    pub fn alive_between(mut self, spawn: f32, despawn: Option<f32>) -> Self {
        self.spawn = spawn;
        self.despawn = despawn;
        self
    }

    /// Position at simulation time `t`.
    pub fn position_at(&self, t: f32) -> Point3 {
        let dt = (t - self.spawn).max(0.0);
        Point3::new(
            self.start.x + self.velocity.x * dt,
            self.start.y + self.velocity.y * dt,
            self.start.z + self.velocity.z * dt,
        )
    }

    fn alive_at(&self, t: f32) -> bool {
        t >= self.spawn && self.despawn.is_none_or(|end| t < end)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedSensor
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic sensor double: reports every live object inside a range
/// and a horizontal field of view.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    range: f32,
    half_fov: f32,
    objects: Vec<SimObject>,
}

impl ScriptedSensor {
    /// `range` in world units, `half_fov` in radians either side of forward.
    pub fn new(range: f32, half_fov: f32) -> Self {
        Self {
            range: range.max(0.0),
            half_fov: half_fov.abs(),
            objects: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: SimObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn add_object(&mut self, object: SimObject) {
        self.objects.push(object);
    }

    /// Remove the object with `id`. Returns `true` if it existed.
    pub fn remove_object(&mut self, id: SourceId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        before != self.objects.len()
    }

    pub fn objects(&self) -> &[SimObject] {
        &self.objects
    }
}

impl Sensor for ScriptedSensor {
    fn scan(&mut self, pose: &Pose, now: f32) -> Vec<Detection> {
        self.objects
            .iter()
            .filter(|o| o.alive_at(now))
            .filter_map(|o| {
                let position = o.position_at(now);
                if position.ground_distance(&pose.position) > self.range {
                    return None;
                }
                if pose.bearing_to(&position).abs() > self.half_fov {
                    return None;
                }
                Some(Detection {
                    position,
                    bounds: Bounds::new(position, o.size),
                    source: o.id,
                    timestamp: now,
                    tag: o.tag,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berry(id: u64, x: f32, z: f32) -> SimObject {
        SimObject::fixed(id, Point3::new(x, 0.0, z), Point3::new(0.3, 0.3, 0.3))
    }

    #[test]
    fn reports_objects_in_range_and_view() {
        let mut sensor = ScriptedSensor::new(10.0, 0.5)
            .with_object(berry(1, 0.0, 5.0))
            .with_object(berry(2, 0.0, 50.0))
            .with_object(berry(3, 0.0, -5.0));
        let hits = sensor.scan(&Pose::default(), 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, SourceId(1));
    }

    #[test]
    fn moving_object_advances_with_time() {
        let mut sensor = ScriptedSensor::new(100.0, std::f32::consts::PI)
            .with_object(berry(1, 0.0, 1.0).moving(Point3::new(1.0, 0.0, 0.0)));
        let hits = sensor.scan(&Pose::default(), 2.0);
        assert!((hits[0].position.x - 2.0).abs() < 1e-5);
        assert_eq!(hits[0].timestamp, 2.0);
    }

    #[test]
    fn lifetime_window_is_respected() {
        let mut sensor = ScriptedSensor::new(100.0, std::f32::consts::PI)
            .with_object(berry(1, 0.0, 1.0).alive_between(1.0, Some(2.0)));
        assert!(sensor.scan(&Pose::default(), 0.5).is_empty());
        assert_eq!(sensor.scan(&Pose::default(), 1.5).len(), 1);
        assert!(sensor.scan(&Pose::default(), 2.0).is_empty());
    }

    #[test]
    fn remove_object_hides_it() {
        let mut sensor = ScriptedSensor::new(100.0, std::f32::consts::PI).with_object(berry(1, 0.0, 1.0));
        assert!(sensor.remove_object(SourceId(1)));
        assert!(!sensor.remove_object(SourceId(1)));
        assert!(sensor.scan(&Pose::default(), 0.0).is_empty());
    }
}
