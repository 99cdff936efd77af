//! Shared-map aggregation seam.
//!
//! Several agents may contribute to one shared map of the world. After each
//! scan the [`AgentLoop`][crate::agent_loop::AgentLoop] pushes a
//! [`MapBatch`] describing every index entry the scan touched. What the
//! aggregator does with it (merging, persistence, transport) is its own
//! concern.
//!
//! [`MapRecorder`] is an in-memory aggregator. Clone it cheaply – all clones
//! share the same batch list, so a test can keep one handle while the loop
//! owns another.

use std::sync::{Arc, Mutex};

use fauna_memory::MemoryEntry;
use fauna_types::{FeatureVector, Point3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry as seen by the shared map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSample {
    pub position: Point3,
    pub features: FeatureVector,
    pub confidence: f32,
}

impl From<&MemoryEntry> for MapSample {
    fn from(entry: &MemoryEntry) -> Self {
        Self {
            position: entry.position,
            features: entry.features,
            confidence: entry.confidence,
        }
    }
}

/// Everything one agent learned from one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBatch {
    pub agent_id: Uuid,
    pub timestamp: f32,
    pub samples: Vec<MapSample>,
    pub mean_confidence: f32,
}

impl MapBatch {
    /// Build a batch, computing the mean confidence of `samples` (zero when
    /// empty).
    pub fn new(agent_id: Uuid, timestamp: f32, samples: Vec<MapSample>) -> Self {
        let mean_confidence = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s.confidence).sum::<f32>() / samples.len() as f32
        };
        Self {
            agent_id,
            timestamp,
            samples,
            mean_confidence,
        }
    }
}

/// Receives one [`MapBatch`] per scan.
pub trait MapAggregator {
    fn push(&mut self, batch: MapBatch);
}

/// In-memory [`MapAggregator`] that keeps every batch it receives.
#[derive(Debug, Clone, Default)]
pub struct MapRecorder {
    batches: Arc<Mutex<Vec<MapBatch>>>,
}

impl MapRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every batch received so far, oldest first.
    pub fn batches(&self) -> Vec<MapBatch> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MapAggregator for MapRecorder {
    fn push(&mut self, batch: MapBatch) {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch);
    }
}
