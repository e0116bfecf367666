/// Board visibility
///
/// A photo is on the board only while `now` sits inside its stored display
/// window. Photos with a missing window bound are never visible.
use chrono::{DateTime, Utc};
use tracing::debug;

use super::window::is_within;
use crate::state::data::ImageRecord;

/// Keep the images whose display window contains `now`, in input order
pub fn filter_visible(images: &[ImageRecord], now: DateTime<Utc>) -> Vec<ImageRecord> {
    images
        .iter()
        .filter(|image| is_visible(image, now))
        .cloned()
        .collect()
}

pub fn is_visible(image: &ImageRecord, now: DateTime<Utc>) -> bool {
    match (image.display_start_at, image.display_end_at) {
        (Some(start), Some(end)) => is_within(now, start, end),
        _ => {
            debug!(image_id = image.id, "image has no display window, hidden");
            false
        }
    }
}

/// Newest upload first, which is how the board feeds the layout engine
pub fn sort_newest_first(images: &mut [ImageRecord]) {
    images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(id: i64, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> ImageRecord {
        ImageRecord {
            id,
            owner_id: 7,
            filename: format!("{}.jpg", id),
            width: 400,
            height: 300,
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 12, 3, 0, 0).unwrap() + Duration::minutes(id),
            display_start_at: start,
            display_end_at: end,
            layout: None,
        }
    }

    #[test]
    fn test_start_inclusive_end_exclusive() {
        let start = Utc.with_ymd_and_hms(2024, 5, 12, 21, 0, 0).unwrap();
        let end = start + Duration::hours(6);
        let images = vec![record(1, Some(start), Some(end))];

        assert_eq!(filter_visible(&images, start).len(), 1);
        assert_eq!(filter_visible(&images, end - Duration::milliseconds(1)).len(), 1);
        assert!(filter_visible(&images, end).is_empty());
        assert!(filter_visible(&images, start - Duration::seconds(1)).is_empty());
    }

    #[test]
    fn test_missing_bounds_are_never_visible() {
        let start = Utc.with_ymd_and_hms(2024, 5, 12, 21, 0, 0).unwrap();
        let images = vec![
            record(1, None, Some(start + Duration::hours(6))),
            record(2, Some(start), None),
            record(3, None, None),
        ];
        assert!(filter_visible(&images, start + Duration::hours(1)).is_empty());
    }

    #[test]
    fn test_input_order_is_kept() {
        let start = Utc.with_ymd_and_hms(2024, 5, 12, 21, 0, 0).unwrap();
        let end = start + Duration::hours(6);
        let images = vec![
            record(3, Some(start), Some(end)),
            record(1, Some(start), Some(end)),
            record(2, None, None),
            record(5, Some(start), Some(end)),
        ];
        let ids: Vec<i64> = filter_visible(&images, start).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 5]);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut images = vec![record(1, None, None), record(3, None, None), record(2, None, None)];
        sort_newest_first(&mut images);
        let ids: Vec<i64> = images.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
