/// Anchor grid
///
/// The board is three fixed horizontal bands ("rows") and an open-ended run
/// of columns to the right. Each column holds one anchor per row, and every
/// photo sits on one anchor (or on two stacked anchors for a large portrait).
/// Rows are regenerated with fresh jitter on every render; columns sit at
/// fixed x positions so anchor ids stay meaningful across renders.
use rand::Rng;
use tracing::warn;

use super::placement::{AnchorId, AnchorMapping};
use crate::state::data::ImageId;

pub const ROW_COUNT: usize = 3;
/// Total vertical jitter span per row (±15px)
pub const ROW_JITTER: f64 = 30.0;
/// Gap between the reference element and the first row
pub const REFERENCE_MARGIN: f64 = 20.0;
/// Space kept free under the last row
pub const BOTTOM_RESERVE: f64 = 100.0;
/// Padding between neighbouring rows
pub const ROW_PADDING: f64 = 20.0;
pub const FIRST_COLUMN_X: f64 = 50.0;
pub const COLUMN_SPACING: f64 = 350.0;
/// Right-hand margin added to the last column when sizing the board
pub const BOARD_RIGHT_MARGIN: f64 = 50.0;
/// Upper bound on columns materialised while restoring a saved anchor id
pub const MAX_RESTORE_COLUMNS: usize = 4096;

/// Position of the UI element the first row hangs under.
///
/// Supplied by the presentation layer; a missing height counts as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowReference {
    pub top: f64,
    pub height: Option<f64>,
}

impl Default for RowReference {
    fn default() -> Self {
        Self {
            top: 10.0,
            height: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub index: usize,
    /// Nominal baseline before jitter
    pub base_y: f64,
    /// Baseline used for placement
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: AnchorId,
    pub x: f64,
    pub row_index: usize,
    pub occupant: Option<ImageId>,
}

impl Anchor {
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub x: f64,
    /// One anchor per row, ordered by row index
    pub anchors: Vec<Anchor>,
}

/// Compute the three row baselines for a board `container_height` tall
pub fn define_rows<R: Rng + ?Sized>(
    container_height: f64,
    reference: RowReference,
    rng: &mut R,
) -> Vec<Row> {
    let reference_height = match reference.height {
        Some(height) if height > 0.0 => height,
        _ => {
            warn!("reference element height unavailable, first row hangs at its top");
            0.0
        }
    };

    let first = reference.top + reference_height + REFERENCE_MARGIN;
    let bottom_limit = container_height - BOTTOM_RESERVE;
    let usable = (bottom_limit - first) - ROW_PADDING * 2.0;
    let gap = usable / 3.0;

    let baselines = [
        first,
        first + gap + ROW_PADDING,
        first + gap * 2.0 + ROW_PADDING * 2.0,
    ];

    baselines
        .iter()
        .enumerate()
        .map(|(index, &base_y)| {
            let jitter = (rng.gen::<f64>() - 0.5) * ROW_JITTER;
            Row {
                index,
                base_y,
                y: base_y + jitter,
            }
        })
        .collect()
}

/// Occupancy state for one render pass
#[derive(Debug, Clone)]
pub struct AnchorGrid {
    rows: Vec<Row>,
    columns: Vec<Column>,
}

impl AnchorGrid {
    /// Empty grid over `rows`; columns are created on demand
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// x of the column that would be created next
    pub fn next_column_x(&self) -> f64 {
        match self.columns.last() {
            Some(last) => last.x + COLUMN_SPACING,
            None => FIRST_COLUMN_X,
        }
    }

    /// Append a column with one free anchor per row at `x`; returns its index
    pub fn create_column(&mut self, x: f64) -> usize {
        let column_x = x.round() as i64;
        let anchors = self
            .rows
            .iter()
            .map(|row| Anchor {
                id: AnchorId::new(row.index, column_x),
                x,
                row_index: row.index,
                occupant: None,
            })
            .collect();
        self.columns.push(Column { x, anchors });
        self.columns.len() - 1
    }

    /// Append a column at the standard spacing
    pub fn push_column(&mut self) -> usize {
        let x = self.next_column_x();
        self.create_column(x)
    }

    /// Make sure the column named by `column_x` exists, growing the grid at
    /// the standard spacing if needed. None when no standard column has that
    /// x or it lies more than `MAX_RESTORE_COLUMNS` past the last column; the
    /// grid is left untouched then.
    pub fn ensure_column(&mut self, column_x: i64) -> Option<usize> {
        if let Some(index) = self.column_index(column_x) {
            return Some(index);
        }
        let spacing = COLUMN_SPACING as i64;
        let offset = column_x.checked_sub(FIRST_COLUMN_X as i64)?;
        if offset < 0 || offset % spacing != 0 {
            return None;
        }
        let next = self.next_column_x().round() as i64;
        if column_x < next {
            return None;
        }
        let needed = (column_x - next) / spacing + 1;
        if needed > MAX_RESTORE_COLUMNS as i64 {
            warn!(column_x, needed, "saved column is too far out, ignoring it");
            return None;
        }
        for _ in 0..needed {
            self.push_column();
        }
        self.column_index(column_x)
    }

    pub fn column_index(&self, column_x: i64) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.x.round() as i64 == column_x)
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        let column = self.column_index(id.column_x)?;
        self.columns[column].anchors.get(id.row)
    }

    fn anchor_mut(&mut self, id: AnchorId) -> Option<&mut Anchor> {
        let column = self.column_index(id.column_x)?;
        self.columns[column].anchors.get_mut(id.row)
    }

    /// Exists and nobody sits on it
    pub fn is_free(&self, id: AnchorId) -> bool {
        self.anchor(id).is_some_and(|anchor| !anchor.is_occupied())
    }

    pub fn occupant(&self, id: AnchorId) -> Option<ImageId> {
        self.anchor(id).and_then(|anchor| anchor.occupant)
    }

    /// All anchors of `mapping` exist and are free
    pub fn is_slot_free(&self, mapping: &AnchorMapping) -> bool {
        mapping.anchors().into_iter().all(|id| self.is_free(id))
    }

    /// All anchors of `mapping` exist and are free or already held by `image_id`
    pub fn is_slot_available_to(&self, mapping: &AnchorMapping, image_id: ImageId) -> bool {
        mapping.anchors().into_iter().all(|id| match self.anchor(id) {
            Some(anchor) => anchor.occupant.is_none() || anchor.occupant == Some(image_id),
            None => false,
        })
    }

    /// Mark every anchor of `mapping` as held by `image_id`.
    ///
    /// Occupancy is never released during a render pass.
    pub fn occupy(&mut self, mapping: &AnchorMapping, image_id: ImageId) {
        for id in mapping.anchors() {
            if let Some(anchor) = self.anchor_mut(id) {
                anchor.occupant = Some(image_id);
            }
        }
    }

    /// Free slots in existing columns, in the order the orientation policy tries them.
    ///
    /// Landscape and square photos take any single anchor, column by column
    /// and row by row. Portraits try the stacked row 0 + row 1 pair and the
    /// single row 0 / row 2 slots, large-first or small-first.
    pub fn candidate_slots(&self, portrait: bool, prefer_large: bool) -> Vec<AnchorMapping> {
        self.slots_in(0..self.columns.len(), portrait, prefer_large)
    }

    /// Free slots of a single column, same ordering as [`candidate_slots`](Self::candidate_slots)
    pub fn column_slots(&self, column: usize, portrait: bool, prefer_large: bool) -> Vec<AnchorMapping> {
        self.slots_in(column..column + 1, portrait, prefer_large)
    }

    fn slots_in(
        &self,
        columns: std::ops::Range<usize>,
        portrait: bool,
        prefer_large: bool,
    ) -> Vec<AnchorMapping> {
        let columns = &self.columns[columns.start.min(self.columns.len())..columns.end.min(self.columns.len())];

        if !portrait {
            return columns
                .iter()
                .flat_map(|column| column.anchors.iter())
                .filter(|anchor| !anchor.is_occupied())
                .map(|anchor| AnchorMapping::Single(anchor.id))
                .collect();
        }

        let large: Vec<AnchorMapping> = columns
            .iter()
            .filter_map(|column| {
                let upper = column.anchors.first()?;
                let lower = column.anchors.get(1)?;
                (!upper.is_occupied() && !lower.is_occupied())
                    .then_some(AnchorMapping::Pair(upper.id, lower.id))
            })
            .collect();

        let small: Vec<AnchorMapping> = columns
            .iter()
            .flat_map(|column| [column.anchors.first(), column.anchors.get(2)])
            .flatten()
            .filter(|anchor| !anchor.is_occupied())
            .map(|anchor| AnchorMapping::Single(anchor.id))
            .collect();

        if prefer_large {
            large.into_iter().chain(small).collect()
        } else {
            small.into_iter().chain(large).collect()
        }
    }

    /// A portrait saved on a single middle-row anchor is re-seated on that
    /// anchor plus the free one directly above it.
    pub fn stacked_pair_for(&self, saved: AnchorId) -> Option<AnchorMapping> {
        if saved.row != 1 || !self.is_free(saved) {
            return None;
        }
        let upper = AnchorId::new(0, saved.column_x);
        self.is_free(upper).then_some(AnchorMapping::Pair(upper, saved))
    }

    /// Horizontal extent needed to show every column
    pub fn board_width(&self, frame_width: f64) -> f64 {
        let last_right = self
            .columns
            .last()
            .map(|column| column.x + COLUMN_SPACING)
            .unwrap_or(0.0);
        frame_width.max(last_right + BOARD_RIGHT_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat_rows() -> Vec<Row> {
        (0..ROW_COUNT)
            .map(|index| Row {
                index,
                base_y: 100.0 + 200.0 * index as f64,
                y: 100.0 + 200.0 * index as f64,
            })
            .collect()
    }

    #[test]
    fn test_rows_divide_remaining_height() {
        let mut rng = StdRng::seed_from_u64(7);
        let reference = RowReference {
            top: 10.0,
            height: Some(50.0),
        };
        let rows = define_rows(900.0, reference, &mut rng);
        assert_eq!(rows.len(), 3);
        // first = 10 + 50 + 20 = 80; usable = (800 - 80) - 40 = 680; gap = 226.67
        assert_eq!(rows[0].base_y, 80.0);
        assert!((rows[1].base_y - (80.0 + 680.0 / 3.0 + 20.0)).abs() < 1e-9);
        assert!((rows[2].base_y - (80.0 + 680.0 * 2.0 / 3.0 + 40.0)).abs() < 1e-9);
        for row in &rows {
            assert!((row.y - row.base_y).abs() <= 15.0);
        }
    }

    #[test]
    fn test_missing_reference_height_counts_as_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let rows = define_rows(600.0, RowReference::default(), &mut rng);
        assert_eq!(rows[0].base_y, 30.0);
    }

    #[test]
    fn test_columns_use_fixed_spacing() {
        let mut grid = AnchorGrid::new(flat_rows());
        assert_eq!(grid.next_column_x(), 50.0);
        grid.push_column();
        grid.push_column();
        assert_eq!(grid.columns()[1].x, 400.0);
        assert_eq!(grid.columns()[1].anchors.len(), 3);
        assert_eq!(grid.columns()[1].anchors[2].id, AnchorId::new(2, 400));
        assert_eq!(grid.board_width(390.0), 400.0 + 350.0 + 50.0);
    }

    #[test]
    fn test_ensure_column_extends_to_saved_x() {
        let mut grid = AnchorGrid::new(flat_rows());
        assert_eq!(grid.ensure_column(1100), Some(3));
        assert_eq!(grid.columns().len(), 4);
        // 1000 is not on the 50 + 350k lattice
        assert_eq!(grid.ensure_column(1000), None);
        assert_eq!(grid.columns().len(), 4);
        assert_eq!(grid.ensure_column(-300), None);
        assert_eq!(grid.ensure_column(i64::MIN), None);
        assert_eq!(grid.columns().len(), 4);
    }

    #[test]
    fn test_far_off_column_leaves_grid_alone() {
        let mut grid = AnchorGrid::new(flat_rows());
        grid.push_column();
        let width = grid.board_width(390.0);

        assert_eq!(grid.ensure_column(35_000_050), None);
        assert_eq!(grid.columns().len(), 1);
        assert_eq!(grid.board_width(390.0), width);

        // exactly at the limit still materialises
        let limit = 50 + 350 * MAX_RESTORE_COLUMNS as i64;
        assert_eq!(grid.ensure_column(limit), Some(MAX_RESTORE_COLUMNS));
    }

    #[test]
    fn test_landscape_candidates_are_column_then_row() {
        let mut grid = AnchorGrid::new(flat_rows());
        grid.push_column();
        grid.push_column();
        grid.occupy(&AnchorMapping::Single(AnchorId::new(0, 50)), 1);
        let slots = grid.candidate_slots(false, false);
        assert_eq!(slots.len(), 5);
        assert_eq!(slots[0], AnchorMapping::Single(AnchorId::new(1, 50)));
        assert_eq!(slots[2], AnchorMapping::Single(AnchorId::new(0, 400)));
    }

    #[test]
    fn test_portrait_candidate_order() {
        let mut grid = AnchorGrid::new(flat_rows());
        grid.push_column();
        let large_first = grid.candidate_slots(true, true);
        assert_eq!(
            large_first,
            vec![
                AnchorMapping::Pair(AnchorId::new(0, 50), AnchorId::new(1, 50)),
                AnchorMapping::Single(AnchorId::new(0, 50)),
                AnchorMapping::Single(AnchorId::new(2, 50)),
            ]
        );
        let small_first = grid.candidate_slots(true, false);
        assert_eq!(small_first[0], AnchorMapping::Single(AnchorId::new(0, 50)));
        assert!(small_first[2].is_pair());

        grid.occupy(&AnchorMapping::Single(AnchorId::new(1, 50)), 3);
        // the middle row is never a small-portrait slot
        assert_eq!(grid.candidate_slots(true, true).len(), 2);
    }

    #[test]
    fn test_occupancy_and_stacked_pair() {
        let mut grid = AnchorGrid::new(flat_rows());
        grid.push_column();
        let middle = AnchorId::new(1, 50);
        assert_eq!(
            grid.stacked_pair_for(middle),
            Some(AnchorMapping::Pair(AnchorId::new(0, 50), middle))
        );
        grid.occupy(&AnchorMapping::Single(AnchorId::new(0, 50)), 4);
        assert_eq!(grid.occupant(AnchorId::new(0, 50)), Some(4));
        assert_eq!(grid.stacked_pair_for(middle), None);
        assert!(grid.is_slot_available_to(&AnchorMapping::Single(AnchorId::new(0, 50)), 4));
        assert!(!grid.is_slot_free(&AnchorMapping::Single(AnchorId::new(0, 50))));
        assert!(!grid.is_free(AnchorId::new(0, 750)));
    }
}
