/// Error type shared by the catalog, layout and upload layers.
use thiserror::Error;

use crate::state::data::{ImageId, UserId};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("image {0} not found")]
    ImageNotFound(ImageId),

    #[error("user {user} does not own image {image}")]
    NotOwner { image: ImageId, user: UserId },

    #[error("image {0} has no placement on the board")]
    NotPlaced(ImageId),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;
