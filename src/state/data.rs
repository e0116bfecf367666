/// Shared data structures for the board state
///
/// These structs represent the data model that flows between
/// the catalog layer and the layout layer.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::placement::Placement;
use crate::reaction::button::ButtonStyle;

/// Catalog id of an uploaded photo
pub type ImageId = i64;

/// Catalog id of a board user
pub type UserId = i64;

/// Represents a single photo on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Unique database ID
    pub id: ImageId,
    /// Uploader
    pub owner_id: UserId,
    /// Stored filename inside the uploads directory
    pub filename: String,
    /// Original pixel width
    pub width: u32,
    /// Original pixel height
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
    /// Start of the display window (inclusive). None when the stored value is missing or unreadable.
    pub display_start_at: Option<DateTime<Utc>>,
    /// End of the display window (exclusive)
    pub display_end_at: Option<DateTime<Utc>>,
    /// Placement saved by an earlier board pass, if any
    pub layout: Option<Placement>,
}

impl ImageRecord {
    /// Portrait means strictly taller than wide; squares lay out like landscapes.
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Width over height, with degenerate dimensions treated as 100px like the upload form does.
    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.dimensions();
        w / h
    }

    pub fn dimensions(&self) -> (f64, f64) {
        let w = if self.width == 0 { 100 } else { self.width };
        let h = if self.height == 0 { 100 } else { self.height };
        (w as f64, h as f64)
    }
}

/// A photo that has been received but not yet written to the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub owner_id: UserId,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// One user's button on one photo. At most one exists per (user, image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub id: i64,
    pub user_id: UserId,
    pub image_id: ImageId,
    pub button: ButtonStyle,
    pub added_at: DateTime<Utc>,
}

/// Payload for an add-or-update of a reaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionDraft {
    pub button: ButtonStyle,
    /// When None, inserts use the catalog clock and updates keep the stored timestamp.
    pub added_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image(width: u32, height: u32) -> ImageRecord {
        ImageRecord {
            id: 1,
            owner_id: 1,
            filename: "a.jpg".to_string(),
            width,
            height,
            uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            display_start_at: None,
            display_end_at: None,
            layout: None,
        }
    }

    #[test]
    fn test_square_is_not_portrait() {
        assert!(!image(100, 100).is_portrait());
        assert!(image(99, 100).is_portrait());
        assert!(!image(400, 300).is_portrait());
    }

    #[test]
    fn test_zero_dimensions_fall_back() {
        assert_eq!(image(0, 0).aspect_ratio(), 1.0);
        assert_eq!(image(200, 0).aspect_ratio(), 2.0);
    }
}
