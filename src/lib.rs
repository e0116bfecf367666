//! Morning photo board.
//!
//! Photos uploaded during a day are shown the next morning between 06:00 and
//! 12:00 on the board's calendar. Everyone can pin one decorative button on
//! each photo, and photos grow a little with every fifth button. The board
//! lays photos out on a three-row anchor grid without overlaps and keeps
//! every photo where it was on later visits.

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod layout;
pub mod reaction;
pub mod schedule;
pub mod state;
pub mod upload;

pub use board::{load_board, BoardView};
pub use clock::Clock;
pub use config::BoardConfig;
pub use error::{BoardError, Result};
