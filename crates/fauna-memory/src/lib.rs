//! `fauna-memory` – the agent's perceptual world-model.
//!
//! Ingests repeated, noisy sightings and keeps a compact, decaying,
//! identity-resolved record of what is out there.
//!
//! # Modules
//!
//! - [`entry`] – [`MemoryEntry`][entry::MemoryEntry] and its danger history
//!   [`SemanticStats`][entry::SemanticStats].
//! - [`index`] – [`SpatialIndex`][index::SpatialIndex]: a ground-plane KD
//!   tree with lazy (tombstone) deletion, capacity eviction and full
//!   rebuilds.
//! - [`matcher`] – [`IdentityMatcher`][matcher::IdentityMatcher]: decides
//!   whether a new sighting is an object already in the index and merges or
//!   inserts accordingly.
//! - [`decay`] – [`DecayEngine`][decay::DecayEngine]: per-tick ageing,
//!   tombstoning, forgiveness, and the danger-event entry point.
//! - [`short_horizon`] – [`ShortHorizonMemory`][short_horizon::ShortHorizonMemory]:
//!   a small list of recent sightings with its own lifetime rules, used for
//!   "closest object of type T" and disappearance tracking.
//! - [`observation`] – [`ObservationAssembler`][observation::ObservationAssembler]:
//!   read-only projections of both memories into numeric arrays.

pub mod decay;
pub mod entry;
pub mod index;
pub mod matcher;
pub mod observation;
pub mod short_horizon;

pub use decay::{DecayConfig, DecayEngine, DecayReport};
pub use entry::{EntryId, MemoryEntry, SemanticStats};
pub use index::{IndexConfig, NodeId, RebuildReason, SpatialIndex};
pub use matcher::{IdentityMatcher, MatchConfig, MatchOutcome};
pub use observation::{ObservationAssembler, ObservationConfig, ObservationTable};
pub use short_horizon::{ScanReport, ShortHorizonConfig, ShortHorizonItem, ShortHorizonMemory, Sighting};
