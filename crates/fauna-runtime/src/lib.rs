//! `fauna-runtime` – runs the world model inside a simulation loop.
//!
//! # Modules
//!
//! - [`world_model`] – [`WorldModel`][world_model::WorldModel]: wires feature
//!   extraction, classification, identity matching, decay, the short-horizon
//!   memory and observation assembly into one per-tick pipeline, configured
//!   by a single [`WorldModelConfig`][world_model::WorldModelConfig].
//! - [`agent_loop`] – [`AgentLoop`][agent_loop::AgentLoop]: advances
//!   simulation time, throttles sensor scans, runs maintenance every tick and
//!   shares what each scan learned with a map aggregator.
//! - [`aggregator`] – the [`MapAggregator`][aggregator::MapAggregator] seam
//!   and the in-memory [`MapRecorder`][aggregator::MapRecorder].
//! - [`throttle`] – [`ScanThrottle`][throttle::ScanThrottle]: simulation-time
//!   rate limiting for scans.
//! - [`frame`] – [`ObservationFrame`][frame::ObservationFrame]: every
//!   observation output in one JSON-serialisable snapshot with a generated
//!   schema.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod agent_loop;
pub mod aggregator;
pub mod frame;
pub mod telemetry;
pub mod throttle;
pub mod world_model;

pub use agent_loop::{AgentLoop, AgentLoopConfig, ScanSummary, StepReport};
pub use aggregator::{MapAggregator, MapBatch, MapRecorder, MapSample};
pub use frame::ObservationFrame;
pub use telemetry::{LogFormat, TelemetryConfig, TracerProviderGuard, init_tracing};
pub use throttle::ScanThrottle;
pub use world_model::{ScanOutcome, TickReport, WorldModel, WorldModelConfig};
