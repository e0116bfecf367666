/// Keyed persistence for board layout
///
/// The layout engine reads and writes placements and anchor mappings through
/// this trait. The catalog implements it on SQLite; `MemoryPlacementStore`
/// backs tests and one-off renders.
use std::collections::HashMap;

use super::placement::{AnchorMapping, Placement};
use crate::error::Result;
use crate::state::data::ImageId;

pub trait PlacementStore {
    fn load_placement(&self, image_id: ImageId) -> Result<Option<Placement>>;
    fn save_placement(&mut self, image_id: ImageId, placement: &Placement) -> Result<()>;
    fn load_anchor_mapping(&self, image_id: ImageId) -> Result<Option<AnchorMapping>>;
    fn save_anchor_mapping(&mut self, image_id: ImageId, mapping: AnchorMapping) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPlacementStore {
    placements: HashMap<ImageId, Placement>,
    mappings: HashMap<ImageId, AnchorMapping>,
}

impl MemoryPlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

impl PlacementStore for MemoryPlacementStore {
    fn load_placement(&self, image_id: ImageId) -> Result<Option<Placement>> {
        Ok(self.placements.get(&image_id).cloned())
    }

    fn save_placement(&mut self, image_id: ImageId, placement: &Placement) -> Result<()> {
        self.placements.insert(image_id, placement.clone());
        Ok(())
    }

    fn load_anchor_mapping(&self, image_id: ImageId) -> Result<Option<AnchorMapping>> {
        Ok(self.mappings.get(&image_id).copied())
    }

    fn save_anchor_mapping(&mut self, image_id: ImageId, mapping: AnchorMapping) -> Result<()> {
        self.mappings.insert(image_id, mapping);
        Ok(())
    }
}
