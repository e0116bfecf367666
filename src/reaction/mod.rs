/// Reactions ("buttons") on photos
///
/// - Random button visuals (button.rs)
/// - A user's button history by day (history.rs)

pub mod button;
pub mod history;

pub use button::ButtonStyle;
pub use history::{group_by_day, DayGroup};
