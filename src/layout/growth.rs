/// Reaction-driven photo growth
///
/// Every fifth button on a photo raises its growth level by one (5% larger),
/// up to ten levels. The size only changes on the reaction that crosses a
/// threshold, and only if the grown photo still clears every other photo on
/// the board. A vetoed crossing is taken back out of the counter so the next
/// reaction gets another try at the same threshold.
use std::collections::HashMap;

use tracing::{debug, info};

use super::geometry::{collides_with_any, COLLISION_MARGIN};
use super::placement::Placement;
use crate::error::{BoardError, Result};
use crate::state::data::ImageId;

pub const REACTIONS_PER_LEVEL: u32 = 5;
pub const MAX_GROWTH_LEVEL: u32 = 10;
pub const GROWTH_STEP: f64 = 0.05;

/// Growth level reached after `count` reactions
pub fn level_for_count(count: u32) -> u32 {
    (count / REACTIONS_PER_LEVEL).min(MAX_GROWTH_LEVEL)
}

/// Size multiplier at `level` (1.0 to 1.5)
pub fn scale_for_level(level: u32) -> f64 {
    1.0 + GROWTH_STEP * level.min(MAX_GROWTH_LEVEL) as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthOutcome {
    /// No threshold crossed
    Unchanged { count: u32 },
    /// Photo grew to `level`
    Grew { level: u32, count: u32 },
    /// Growing to `level` would have hit another photo; the counter was rolled back
    Vetoed { level: u32, count: u32 },
}

/// Per-photo reaction counters for one board session
#[derive(Debug, Clone, Default)]
pub struct ReactionGrowth {
    counts: HashMap<ImageId, u32>,
}

impl ReactionGrowth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a photo's counter from the reactions already in the catalog
    pub fn seed(&mut self, image_id: ImageId, count: u32) {
        self.counts.insert(image_id, count);
    }

    pub fn count(&self, image_id: ImageId) -> u32 {
        self.counts.get(&image_id).copied().unwrap_or(0)
    }

    /// Count one new reaction on `image_id` and grow its placement when a
    /// threshold is crossed without colliding.
    pub fn register(
        &mut self,
        image_id: ImageId,
        placements: &mut HashMap<ImageId, Placement>,
    ) -> Result<GrowthOutcome> {
        let current = placements
            .get(&image_id)
            .ok_or(BoardError::NotPlaced(image_id))?;

        let count = self.count(image_id) + 1;
        let level = level_for_count(count);
        let previous = level_for_count(count - 1);

        if level <= previous || level <= current.growth_level {
            self.counts.insert(image_id, count);
            return Ok(GrowthOutcome::Unchanged { count });
        }

        let candidate = current.with_growth(level);
        let bounds = candidate.bounds();
        let others: Vec<_> = placements
            .iter()
            .filter(|(id, _)| **id != image_id)
            .map(|(_, placement)| placement.bounds())
            .collect();

        if collides_with_any(&bounds, others.iter(), COLLISION_MARGIN) {
            let rolled_back = count - 1;
            self.counts.insert(image_id, rolled_back);
            debug!(image_id, level, "growth vetoed by a neighbouring photo");
            return Ok(GrowthOutcome::Vetoed {
                level,
                count: rolled_back,
            });
        }

        self.counts.insert(image_id, count);
        placements.insert(image_id, candidate);
        info!(image_id, level, "photo grew");
        Ok(GrowthOutcome::Grew { level, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::placement::{AnchorId, AnchorMapping};

    fn placement_at(x: f64, y: f64, size: f64) -> Placement {
        Placement {
            x,
            y,
            photo_width: size * 0.8,
            photo_height: size * 0.8,
            background_width: size * 0.88,
            background_height: size * 0.88,
            wrapper_width: size,
            wrapper_height: size,
            scale: 1.0,
            anchor: AnchorMapping::Single(AnchorId::new(0, x as i64)),
            row_index: 0,
            rotation: 0.0,
            growth_level: 0,
        }
    }

    #[test]
    fn test_scale_is_quantized_and_capped() {
        assert_eq!(level_for_count(4), 0);
        assert_eq!(level_for_count(5), 1);
        assert_eq!(level_for_count(14), 2);
        assert_eq!(level_for_count(50), 10);
        assert_eq!(level_for_count(500), 10);
        assert_eq!(scale_for_level(0), 1.0);
        assert!((scale_for_level(10) - 1.5).abs() < 1e-12);
        assert!((scale_for_level(12) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_growth_only_at_multiples_of_five() {
        let mut placements = HashMap::new();
        placements.insert(1, placement_at(0.0, 0.0, 100.0));
        let mut growth = ReactionGrowth::new();

        for n in 1..=60u32 {
            let outcome = growth.register(1, &mut placements).unwrap();
            let crossed = n % 5 == 0 && n <= 50;
            match outcome {
                GrowthOutcome::Grew { level, count } => {
                    assert!(crossed, "grew at {}", n);
                    assert_eq!(level, n / 5);
                    assert_eq!(count, n);
                }
                GrowthOutcome::Unchanged { count } => {
                    assert!(!crossed, "did not grow at {}", n);
                    assert_eq!(count, n);
                }
                GrowthOutcome::Vetoed { .. } => panic!("nothing to collide with"),
            }
            let expected = 1.0 + 0.05 * (n / 5).min(10) as f64;
            assert!((placements[&1].growth_scale() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_vetoed_growth_rolls_back_counter() {
        let mut placements = HashMap::new();
        placements.insert(1, placement_at(0.0, 0.0, 100.0));
        // 5% growth reaches x=105; with the 10px margin on both boxes this
        // neighbour is hit, while the ungrown box still clears it
        placements.insert(2, placement_at(122.0, 0.0, 100.0));
        let mut growth = ReactionGrowth::new();
        growth.seed(1, 4);

        let outcome = growth.register(1, &mut placements).unwrap();
        assert_eq!(outcome, GrowthOutcome::Vetoed { level: 1, count: 4 });
        assert_eq!(placements[&1].growth_level, 0);
        assert_eq!(growth.count(1), 4);

        // the next reaction crosses the same threshold again
        let outcome = growth.register(1, &mut placements).unwrap();
        assert!(matches!(outcome, GrowthOutcome::Vetoed { level: 1, .. }));

        // once the neighbour is gone growth goes through
        placements.remove(&2);
        let outcome = growth.register(1, &mut placements).unwrap();
        assert_eq!(outcome, GrowthOutcome::Grew { level: 1, count: 5 });
        assert_eq!(placements[&1].x, 0.0);
    }

    #[test]
    fn test_unplaced_photo_is_an_error() {
        let mut placements = HashMap::new();
        let mut growth = ReactionGrowth::new();
        assert!(matches!(
            growth.register(9, &mut placements),
            Err(BoardError::NotPlaced(9))
        ));
        assert_eq!(growth.count(9), 0);
    }
}
