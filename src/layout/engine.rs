/// Layout session: one board render
///
/// A session owns a freshly jittered anchor grid, the placements computed so
/// far and the per-photo reaction counters. It is built for one render and
/// thrown away afterwards; nothing leaks between renders except what goes
/// through the `PlacementStore`.
///
/// `place_all` runs in two phases. First every photo with a usable saved
/// placement reserves its anchors and is restored verbatim. Then the rest are
/// placed in input order: the first photo of the list on the origin anchor,
/// photos with a saved anchor mapping on that mapping, everything else by the
/// orientation search. A fresh placement must clear every photo already on
/// the board by `COLLISION_MARGIN`.
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use super::anchor::{define_rows, AnchorGrid, RowReference};
use super::geometry::{collides_with_any, Rect, COLLISION_MARGIN};
use super::growth::{GrowthOutcome, ReactionGrowth};
use super::placement::{AnchorMapping, Placement};
use super::store::PlacementStore;
use crate::error::{BoardError, Result};
use crate::reaction::button::ButtonStyle;
use crate::state::data::{ImageId, ImageRecord, ReactionDraft, ReactionRecord, UserId};
use crate::state::source::ReactionSource;

pub const LANDSCAPE_WIDTH: RangeInclusive<f64> = 250.0..=300.0;
pub const SMALL_PORTRAIT_WIDTH: RangeInclusive<f64> = 120.0..=150.0;
pub const LARGE_PORTRAIT_WIDTH: RangeInclusive<f64> = 250.0..=300.0;
/// Frame behind the photo, relative to the photo
pub const BACKGROUND_RATIO: f64 = 1.1;
/// Extra wrapper margin, relative to the photo's longer side
pub const WRAPPER_SLACK: f64 = 0.2;
pub const ROTATION_CHANCE: f64 = 0.65;
/// Full rotation span in degrees (±10°)
pub const ROTATION_SPAN: f64 = 20.0;
/// Full positional jitter span in px (±10px)
pub const POSITION_JITTER: f64 = 20.0;
pub const LARGE_PORTRAIT_CHANCE: f64 = 0.5;
/// Geometry draws per slot before the slot is given up for this photo
pub const ATTEMPTS_PER_SLOT: usize = 6;
/// Columns one photo may add to the board before it is skipped
pub const MAX_NEW_COLUMNS: usize = 64;

/// Result of a reaction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ReactionOutcome {
    /// The user already had a button on this photo; nothing changed
    Duplicate(ReactionRecord),
    Added {
        reaction: ReactionRecord,
        growth: GrowthOutcome,
    },
}

pub struct LayoutSession<R: Rng> {
    grid: AnchorGrid,
    placements: HashMap<ImageId, Placement>,
    /// Placed photos in input order
    order: Vec<ImageId>,
    growth: ReactionGrowth,
    rng: R,
}

impl<R: Rng> LayoutSession<R> {
    /// Fresh session with rows for a `container_height` tall board
    pub fn new(container_height: f64, reference: RowReference, mut rng: R) -> Self {
        let rows = define_rows(container_height, reference, &mut rng);
        Self {
            grid: AnchorGrid::new(rows),
            placements: HashMap::new(),
            order: Vec::new(),
            growth: ReactionGrowth::new(),
            rng,
        }
    }

    pub fn grid(&self) -> &AnchorGrid {
        &self.grid
    }

    pub fn placements(&self) -> &HashMap<ImageId, Placement> {
        &self.placements
    }

    pub fn placement(&self, image_id: ImageId) -> Option<&Placement> {
        self.placements.get(&image_id)
    }

    /// Placed photos in the order they were handed to `place_all`
    pub fn ordered(&self) -> Vec<(ImageId, &Placement)> {
        self.order
            .iter()
            .filter_map(|id| self.placements.get(id).map(|p| (*id, p)))
            .collect()
    }

    pub fn growth(&self) -> &ReactionGrowth {
        &self.growth
    }

    /// Start a photo's reaction counter from the catalog
    pub fn seed_reactions(&mut self, image_id: ImageId, count: u32) {
        self.growth.seed(image_id, count);
    }

    pub fn board_width(&self, frame_width: f64) -> f64 {
        self.grid.board_width(frame_width)
    }

    /// Place every image of `images` that this session has not placed yet.
    ///
    /// Images that cannot be placed anywhere are skipped with a warning. New
    /// placements and their anchor mappings are written to `store`.
    pub fn place_all<S>(
        &mut self,
        images: &[ImageRecord],
        store: &mut S,
    ) -> Result<HashMap<ImageId, Placement>>
    where
        S: PlacementStore + ?Sized,
    {
        let mut seen = HashSet::new();
        let pending: Vec<&ImageRecord> = images
            .iter()
            .filter(|image| !self.placements.contains_key(&image.id) && seen.insert(image.id))
            .collect();
        let first_id = images.first().map(|image| image.id);

        let restored = self.restore_saved(&pending, store)?;

        let mut fresh = 0;
        let mut skipped = 0;
        for image in &pending {
            if restored.contains(&image.id) {
                continue;
            }
            match self.place_fresh(image, first_id == Some(image.id), store)? {
                Some(placement) => {
                    store.save_placement(image.id, &placement)?;
                    store.save_anchor_mapping(image.id, placement.anchor)?;
                    self.grid.occupy(&placement.anchor, image.id);
                    self.placements.insert(image.id, placement);
                    fresh += 1;
                }
                None => {
                    warn!(image_id = image.id, "no anchor left for photo, skipping it");
                    skipped += 1;
                }
            }
        }

        for image in &pending {
            if self.placements.contains_key(&image.id) {
                self.order.push(image.id);
            }
        }

        info!(
            restored = restored.len(),
            fresh,
            skipped,
            columns = self.grid.columns().len(),
            "board laid out"
        );
        Ok(self.placements.clone())
    }

    /// Record a reaction of `user_id` on a placed photo and grow the photo
    /// when the reaction crosses a growth threshold.
    pub fn react<C>(
        &mut self,
        user_id: UserId,
        image_id: ImageId,
        now: DateTime<Utc>,
        catalog: &mut C,
    ) -> Result<ReactionOutcome>
    where
        C: ReactionSource + PlacementStore + ?Sized,
    {
        let placement = self
            .placements
            .get(&image_id)
            .ok_or(BoardError::NotPlaced(image_id))?;

        if let Some(existing) = catalog.reaction_for(user_id, image_id)? {
            debug!(user_id, image_id, "user already has a button on this photo");
            return Ok(ReactionOutcome::Duplicate(existing));
        }

        let (photo_width, photo_height) = placement.photo_size();
        let padding = placement.padding();
        let button = ButtonStyle::random(&mut self.rng, photo_width, photo_height, padding);

        let reaction = catalog.add_or_update_reaction(
            user_id,
            image_id,
            ReactionDraft {
                button,
                added_at: Some(now),
            },
        )?;

        let growth = self.growth.register(image_id, &mut self.placements)?;
        if let GrowthOutcome::Grew { .. } = growth {
            if let Some(grown) = self.placements.get(&image_id) {
                catalog.save_placement(image_id, grown)?;
            }
        }

        Ok(ReactionOutcome::Added { reaction, growth })
    }

    /// Phase one: put back every saved placement whose anchors are still
    /// available, in input order. Later photos lose anchor conflicts.
    fn restore_saved<S>(&mut self, images: &[&ImageRecord], store: &S) -> Result<HashSet<ImageId>>
    where
        S: PlacementStore + ?Sized,
    {
        let mut restored = HashSet::new();
        for image in images {
            let saved = match store.load_placement(image.id)? {
                Some(saved) => saved,
                None => match &image.layout {
                    Some(saved) => saved.clone(),
                    None => continue,
                },
            };

            if !self.materialise(&saved.anchor) {
                warn!(image_id = image.id, anchor = %saved.anchor, "saved anchor is not on the grid");
                continue;
            }
            if !self.grid.is_slot_free(&saved.anchor) {
                debug!(image_id = image.id, anchor = %saved.anchor, "saved anchor taken by another photo");
                continue;
            }
            if !self.is_clear(&saved.bounds()) {
                debug!(image_id = image.id, "saved placement overlaps a restored photo");
                continue;
            }

            self.grid.occupy(&saved.anchor, image.id);
            self.placements.insert(image.id, saved);
            restored.insert(image.id);
        }
        Ok(restored)
    }

    fn place_fresh<S>(
        &mut self,
        image: &ImageRecord,
        is_first: bool,
        store: &S,
    ) -> Result<Option<Placement>>
    where
        S: PlacementStore + ?Sized,
    {
        if is_first {
            if self.grid.columns().is_empty() {
                self.grid.push_column();
            }
            let origin = self
                .grid
                .columns()
                .first()
                .and_then(|column| column.anchors.first())
                .map(|anchor| anchor.id);
            if let Some(origin) = origin {
                if let Some(placement) = self.try_slot(image, AnchorMapping::Single(origin)) {
                    debug!(image_id = image.id, "first photo placed on the origin anchor");
                    return Ok(Some(placement));
                }
            }
        }

        if let Some(mapping) = store.load_anchor_mapping(image.id)? {
            if let Some(placement) = self.try_saved_mapping(image, mapping) {
                debug!(image_id = image.id, anchor = %placement.anchor, "photo placed on its saved anchor");
                return Ok(Some(placement));
            }
        }

        let portrait = image.is_portrait();
        let prefer_large = portrait && self.rng.gen_bool(LARGE_PORTRAIT_CHANCE);

        for slot in self.grid.candidate_slots(portrait, prefer_large) {
            if let Some(placement) = self.try_slot(image, slot) {
                return Ok(Some(placement));
            }
        }

        for _ in 0..MAX_NEW_COLUMNS {
            let column = self.grid.push_column();
            for slot in self.grid.column_slots(column, portrait, prefer_large) {
                if let Some(placement) = self.try_slot(image, slot) {
                    return Ok(Some(placement));
                }
            }
        }

        Ok(None)
    }

    fn try_saved_mapping(&mut self, image: &ImageRecord, mapping: AnchorMapping) -> Option<Placement> {
        if !self.materialise(&mapping) {
            return None;
        }
        let slot = match mapping {
            AnchorMapping::Single(id) if image.is_portrait() && id.row == 1 => {
                self.grid.stacked_pair_for(id)?
            }
            other => other,
        };
        self.try_slot(image, slot)
    }

    /// Create the columns `mapping` refers to. False when it names an anchor
    /// this grid can never have.
    fn materialise(&mut self, mapping: &AnchorMapping) -> bool {
        mapping.anchors().into_iter().all(|id| {
            id.row < self.grid.rows().len() && self.grid.ensure_column(id.column_x).is_some()
        })
    }

    /// Draw geometry for `slot` until one clears the board
    fn try_slot(&mut self, image: &ImageRecord, slot: AnchorMapping) -> Option<Placement> {
        if !self.grid.is_slot_free(&slot) {
            return None;
        }
        for _ in 0..ATTEMPTS_PER_SLOT {
            let candidate = self.compose(image, slot)?;
            if self.is_clear(&candidate.bounds()) {
                return Some(candidate);
            }
        }
        None
    }

    fn is_clear(&self, bounds: &Rect) -> bool {
        let others: Vec<Rect> = self.placements.values().map(Placement::bounds).collect();
        !collides_with_any(bounds, others.iter(), COLLISION_MARGIN)
    }

    /// Random geometry for `image` on `slot`
    fn compose(&mut self, image: &ImageRecord, slot: AnchorMapping) -> Option<Placement> {
        let (anchor_x, row_index, width_range, vertical_jitter) = match slot {
            AnchorMapping::Single(id) => {
                let anchor = self.grid.anchor(id)?;
                let widths = if image.is_portrait() {
                    SMALL_PORTRAIT_WIDTH
                } else {
                    LANDSCAPE_WIDTH
                };
                (anchor.x, id.row, widths, true)
            }
            AnchorMapping::Pair(upper, lower) => {
                let upper_x = self.grid.anchor(upper)?.x;
                let lower_x = self.grid.anchor(lower)?.x;
                ((upper_x + lower_x) / 2.0, upper.row, LARGE_PORTRAIT_WIDTH, false)
            }
        };
        let row_y = self.grid.row(row_index)?.y;

        let (original_width, _) = image.dimensions();
        let photo_width = self.rng.gen_range(width_range);
        let photo_height = photo_width / image.aspect_ratio();
        let background_width = photo_width * BACKGROUND_RATIO;
        let background_height = photo_height * BACKGROUND_RATIO;
        let slack = photo_width.max(photo_height) * WRAPPER_SLACK;

        let jitter_x = (self.rng.gen::<f64>() - 0.5) * POSITION_JITTER;
        let jitter_y = if vertical_jitter {
            (self.rng.gen::<f64>() - 0.5) * POSITION_JITTER
        } else {
            0.0
        };
        let rotation = if self.rng.gen_bool(ROTATION_CHANCE) {
            (self.rng.gen::<f64>() - 0.5) * ROTATION_SPAN
        } else {
            0.0
        };

        Some(Placement {
            x: anchor_x + jitter_x,
            y: row_y + jitter_y,
            photo_width,
            photo_height,
            background_width,
            background_height,
            wrapper_width: background_width + slack,
            wrapper_height: background_height + slack,
            scale: photo_width / original_width,
            anchor: slot,
            row_index,
            rotation,
            growth_level: 0,
        })
    }
}
