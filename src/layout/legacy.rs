/// Column packer with random heights
///
/// Alternate layout strategy: photos are stacked into variable-width columns
/// at random heights, and a spot is accepted as long as no intersection
/// exceeds a quarter of either photo's area. Nothing in the board pipeline
/// uses it; `LayoutSession` is the layout the board renders.
use rand::Rng;
use tracing::debug;

use super::geometry::{within_overlap_limit, Rect};
use crate::state::data::{ImageId, ImageRecord};

/// Photo width relative to the frame width
pub const MIN_WIDTH_RATIO: f64 = 0.7;
pub const MAX_WIDTH_RATIO: f64 = 0.8;
/// Frame added around the photo (25px per side)
pub const FRAME_EXTRA: f64 = 50.0;
pub const COLUMN_GAP: f64 = 50.0;
pub const MAX_LANDSCAPE_ONLY: usize = 3;
pub const MAX_MIXED: usize = 2;
pub const MAX_Y_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PackColumn {
    pub x: f64,
    pub width: f64,
    pub landscapes: usize,
    pub portraits: usize,
}

impl PackColumn {
    fn len(&self) -> usize {
        self.landscapes + self.portraits
    }

    fn is_mixed(&self) -> bool {
        self.portraits > 0
    }

    /// Landscape-only columns take three landscapes; a column with any
    /// portrait takes two photos of either kind.
    fn accepts(&self, portrait: bool) -> bool {
        if self.is_mixed() {
            self.len() < MAX_MIXED
        } else {
            !portrait && self.len() < MAX_LANDSCAPE_ONLY
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackedPhoto {
    pub image_id: ImageId,
    /// Framed photo box
    pub rect: Rect,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct ColumnPacker {
    frame_width: f64,
    container_height: f64,
    start_x: f64,
    start_y: f64,
    columns: Vec<PackColumn>,
    placed: Vec<Rect>,
}

impl ColumnPacker {
    pub fn new(frame_width: f64, container_height: f64, start_x: f64, start_y: f64) -> Self {
        Self {
            frame_width,
            container_height,
            start_x,
            start_y,
            columns: Vec::new(),
            placed: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[PackColumn] {
        &self.columns
    }

    pub fn pack_all<R: Rng + ?Sized>(&mut self, images: &[ImageRecord], rng: &mut R) -> Vec<PackedPhoto> {
        images.iter().map(|image| self.place(image, rng)).collect()
    }

    /// Place one photo. Always succeeds: when no random height works, the
    /// photo goes to the top of a new column.
    pub fn place<R: Rng + ?Sized>(&mut self, image: &ImageRecord, rng: &mut R) -> PackedPhoto {
        let portrait = image.is_portrait();
        let target = self.frame_width
            * (MIN_WIDTH_RATIO + rng.gen::<f64>() * (MAX_WIDTH_RATIO - MIN_WIDTH_RATIO));
        let width = target + FRAME_EXTRA;
        let height = target / image.aspect_ratio() + FRAME_EXTRA;

        for index in 0..self.columns.len() {
            if !self.columns[index].accepts(portrait) {
                continue;
            }
            if width > self.columns[index].width {
                self.columns[index].width = width;
            }
            let x = self.columns[index].x;
            if let Some(rect) = self.random_spot(x, width, height, rng) {
                return self.commit(image, rect, index);
            }
        }

        let x = match self
            .columns
            .iter()
            .max_by(|a, b| (a.x + a.width).total_cmp(&(b.x + b.width)))
        {
            Some(rightmost) => rightmost.x + rightmost.width + COLUMN_GAP,
            None => self.start_x,
        };
        self.columns.push(PackColumn {
            x,
            width,
            landscapes: 0,
            portraits: 0,
        });
        let index = self.columns.len() - 1;
        let rect = self
            .random_spot(x, width, height, rng)
            .unwrap_or_else(|| Rect::new(x, self.start_y, width, height));
        self.commit(image, rect, index)
    }

    fn random_spot<R: Rng + ?Sized>(&self, x: f64, width: f64, height: f64, rng: &mut R) -> Option<Rect> {
        let max_y = self.container_height - height;
        if max_y < self.start_y {
            return None;
        }
        (0..MAX_Y_ATTEMPTS).find_map(|_| {
            let y = self.start_y + rng.gen::<f64>() * (max_y - self.start_y);
            let rect = Rect::new(x, y, width, height);
            within_overlap_limit(&rect, &self.placed).then_some(rect)
        })
    }

    fn commit(&mut self, image: &ImageRecord, rect: Rect, column: usize) -> PackedPhoto {
        if let Some(target) = self.columns.get_mut(column) {
            if image.is_portrait() {
                target.portraits += 1;
            } else {
                target.landscapes += 1;
            }
        }
        self.placed.push(rect);
        debug!(image_id = image.id, column, "photo packed");
        PackedPhoto {
            image_id: image.id,
            rect,
            column,
        }
    }
}
