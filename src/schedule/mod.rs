/// Time-window scheduling
///
/// - Display and upload window arithmetic (window.rs)
/// - Which photos are on the board right now (visibility.rs)

pub mod visibility;
pub mod window;

pub use visibility::{filter_visible, is_visible};
pub use window::{is_within, TimeWindow, WindowCalculator};
