//! `fauna-perception` – turns raw sensor hits into typed observations.
//!
//! # Modules
//!
//! - [`features`] – [`FeatureExtractor`][features::FeatureExtractor]: keeps a
//!   short positional history per source object and derives the fixed-length
//!   [`FeatureVector`][fauna_types::FeatureVector] plus a shape-complexity
//!   scalar from each detection.
//! - [`classifier`] – [`Classifier`][classifier::Classifier]: assigns a coarse
//!   [`Category`][fauna_types::Category] from bounding-volume geometry and
//!   motion, unless the sensor supplied an authoritative tag.
//! - [`sensor`] – the [`Sensor`][sensor::Sensor] seam plus
//!   [`ScriptedSensor`][sensor::ScriptedSensor], an in-process simulation
//!   double that lets the whole stack run headless.

pub mod classifier;
pub mod features;
pub mod sensor;

pub use classifier::{Classifier, ClassifierConfig};
pub use features::{FeatureConfig, FeatureExtractor, Features};
pub use sensor::{ScriptedSensor, Sensor, SimObject};
