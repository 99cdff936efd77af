//! Built-in headless scenario for `fauna run`.
//!
//! A small clearing around the origin: a few berries (one gets eaten
//! half-way through), a boulder, a tree and a critter wandering
//! past. The agent stands still and turns slowly on the spot, so objects
//! drift in and out of view.

use fauna_perception::{ScriptedSensor, SimObject};
use fauna_types::{Category, Point3, Pose};

/// Sensor range in world units.
pub const SENSOR_RANGE: f32 = 12.0;
/// Half field of view in radians (60°).
pub const HALF_FOV: f32 = std::f32::consts::FRAC_PI_3;
/// Turning rate of the agent in radians per second.
pub const TURN_RATE: f32 = 0.2;
/// When the critter bites, in simulation seconds.
pub const ATTACK_AT: f32 = 20.0;
/// When the last berry disappears.
pub const BERRY_EATEN_AT: f32 = 30.0;

pub fn sensor() -> ScriptedSensor {
    let berry = Point3::new(0.3, 0.3, 0.3);
    ScriptedSensor::new(SENSOR_RANGE, HALF_FOV)
        .with_object(SimObject::fixed(1, Point3::new(0.5, 0.0, 3.0), berry).tagged(Category::Food))
        .with_object(SimObject::fixed(2, Point3::new(-2.0, 0.0, 4.0), berry).tagged(Category::Food))
        .with_object(
            SimObject::fixed(3, Point3::new(3.0, 0.0, -1.0), berry)
                .tagged(Category::Food)
                .alive_between(0.0, Some(BERRY_EATEN_AT)),
        )
        // Boulder: large and static.
        .with_object(SimObject::fixed(4, Point3::new(-5.0, 0.0, -3.0), Point3::new(2.5, 1.2, 2.5)))
        // Tree: tall and thin.
        .with_object(SimObject::fixed(5, Point3::new(6.0, 0.0, 6.0), Point3::new(0.4, 3.0, 0.4)))
        // Critter: small, flat and moving.
        .with_object(
            SimObject::fixed(6, Point3::new(-6.0, 0.0, 2.0), Point3::new(0.5, 0.1, 0.5))
                .moving(Point3::new(0.4, 0.0, 0.0)),
        )
}

/// Agent pose at simulation time `t`.
pub fn pose_at(t: f32) -> Pose {
    Pose::new(Point3::origin(), t * TURN_RATE)
}

/// Where the critter is at time `t`.
pub fn critter_at(t: f32) -> Point3 {
    Point3::new(-6.0 + 0.4 * t, 0.0, 2.0)
}
