//! [`AgentLoop`] – the simulation-tick driver.
//!
//! Each call to [`AgentLoop::step`] advances simulation time by `dt` and:
//!
//! 1. **Scan** – if the [`ScanThrottle`] allows it, asks the [`Sensor`] for
//!    detections at the current pose and folds them into the
//!    [`WorldModel`].
//! 2. **Share** – pushes a [`MapBatch`] of every entry the scan touched to
//!    the injected [`MapAggregator`], if any.
//! 3. **Maintain** – runs [`WorldModel::tick`] (decay and rebuild). This
//!    happens on every step, scan or not.
//!
//! Movement is somebody else's job: callers move the agent with
//! [`AgentLoop::set_pose`].
//!
//! # Example
//!
//! ```rust
//! use fauna_perception::{ScriptedSensor, SimObject};
//! use fauna_runtime::agent_loop::{AgentLoop, AgentLoopConfig};
//! use fauna_runtime::aggregator::MapRecorder;
//! use fauna_types::{Category, Point3};
//!
//! let sensor = ScriptedSensor::new(10.0, std::f32::consts::PI)
//!     .with_object(SimObject::fixed(1, Point3::new(0.0, 0.0, 2.0), Point3::new(0.3, 0.3, 0.3))
//!         .tagged(Category::Food));
//! let recorder = MapRecorder::new();
//!
//! let mut agent = AgentLoop::new(AgentLoopConfig::default(), Box::new(sensor))
//!     .unwrap()
//!     .with_aggregator(Box::new(recorder.clone()));
//!
//! for _ in 0..10 {
//!     agent.step(0.1);
//! }
//! assert_eq!(agent.world().index().live_len(), 1);
//! assert!(!recorder.is_empty());
//! ```

use fauna_perception::Sensor;
use fauna_types::{FaunaError, Pose};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::aggregator::{MapAggregator, MapBatch, MapSample};
use crate::throttle::ScanThrottle;
use crate::world_model::{ScanOutcome, TickReport, WorldModel, WorldModelConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Minimum simulation time between sensor scans (seconds).
    pub scan_interval: f32,
    pub world: WorldModelConfig,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            scan_interval: 0.25,
            world: WorldModelConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a scan performed during a step.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub detections: usize,
    pub outcome: ScanOutcome,
}

/// What one [`AgentLoop::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub now: f32,
    /// `None` when the throttle skipped the scan.
    pub scan: Option<ScanSummary>,
    pub tick: TickReport,
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct AgentLoop {
    agent_id: Uuid,
    world: WorldModel,
    sensor: Box<dyn Sensor>,
    aggregator: Option<Box<dyn MapAggregator>>,
    throttle: ScanThrottle,
    pose: Pose,
    now: f32,
}

impl AgentLoop {
    /// Build a loop around `sensor` with a fresh random agent id.
    ///
    /// # Errors
    ///
    /// Whatever [`WorldModel::new`] reports for `config.world`, or
    /// [`FaunaError::Config`] for a non-finite scan interval.
    pub fn new(config: AgentLoopConfig, sensor: Box<dyn Sensor>) -> Result<Self, FaunaError> {
        if !config.scan_interval.is_finite() {
            return Err(FaunaError::Config(format!(
                "scan_interval must be finite, got {}",
                config.scan_interval
            )));
        }
        let world = WorldModel::new(config.world)?;
        let agent_id = Uuid::new_v4();
        info!(%agent_id, scan_interval = config.scan_interval, "agent loop ready");
        Ok(Self {
            agent_id,
            world,
            sensor,
            aggregator: None,
            throttle: ScanThrottle::new(config.scan_interval),
            pose: Pose::default(),
            now: 0.0,
        })
    }

    /// Attach a shared-map aggregator.
    pub fn with_aggregator(mut self, aggregator: Box<dyn MapAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    /// Mutable access for danger events and observation queries.
    pub fn world_mut(&mut self) -> &mut WorldModel {
        &mut self.world
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Current simulation time (seconds).
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Advance simulation time by `dt` seconds (negative values count as
    /// zero) and run one tick.
    #[instrument(skip_all, fields(dt = dt))]
    pub fn step(&mut self, dt: f32) -> StepReport {
        let now = self.now + dt.max(0.0);
        self.now = now;

        let scan = if self.throttle.ready(now) {
            let detections = self.sensor.scan(&self.pose, now);
            let outcome = self.world.ingest_scan(&self.pose, &detections, now);
            self.share(&outcome, now);
            Some(ScanSummary {
                detections: detections.len(),
                outcome,
            })
        } else {
            None
        };

        let tick = self.world.tick(now);
        if let Some(reason) = tick.rebuild {
            debug!(?reason, now, "index rebuilt during step");
        }
        StepReport { now, scan, tick }
    }

    fn share(&mut self, outcome: &ScanOutcome, now: f32) {
        let Some(aggregator) = self.aggregator.as_mut() else {
            return;
        };
        let samples: Vec<MapSample> = outcome
            .touched
            .iter()
            .filter_map(|id| self.world.entry(*id))
            .map(MapSample::from)
            .collect();
        aggregator.push(MapBatch::new(self.agent_id, now, samples));
    }
}
