/// Board layout
///
/// - Rectangle overlap primitives (geometry.rs)
/// - Persisted placement and anchor ids (placement.rs)
/// - Rows, columns and anchor occupancy (anchor.rs)
/// - The per-render layout session (engine.rs)
/// - Reaction-driven growth (growth.rs)
/// - Keyed placement persistence (store.rs)
/// - Alternate column packer (legacy.rs)

pub mod anchor;
pub mod engine;
pub mod geometry;
pub mod growth;
pub mod legacy;
pub mod placement;
pub mod store;

pub use anchor::{AnchorGrid, RowReference};
pub use engine::{LayoutSession, ReactionOutcome};
pub use growth::{GrowthOutcome, ReactionGrowth};
pub use placement::{AnchorId, AnchorMapping, Placement};
pub use store::{MemoryPlacementStore, PlacementStore};
