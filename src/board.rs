/// Board loading
///
/// Pulls the catalog, keeps the photos whose display window is open, fetches
/// every visible photo's buttons concurrently and then runs one layout pass.
/// Catalog work runs on blocking threads, each with its own connection.
use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::task::{spawn_blocking, JoinSet};
use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::layout::engine::LayoutSession;
use crate::layout::placement::Placement;
use crate::schedule::visibility::{filter_visible, sort_newest_first};
use crate::state::data::{ImageId, ImageRecord, ReactionRecord, UserId};
use crate::state::library::Library;
use crate::state::source::{ImageSource, ReactionSource};

/// One placed photo with its buttons
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardPhoto {
    pub id: ImageId,
    pub owner_id: UserId,
    pub filename: String,
    pub placement: Placement,
    pub buttons: Vec<ReactionRecord>,
}

/// What the board shows at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub generated_at: DateTime<Utc>,
    pub board_width: f64,
    /// Newest upload first
    pub photos: Vec<BoardPhoto>,
    /// Visible photos that found no room
    pub skipped: Vec<ImageId>,
}

impl BoardView {
    /// No visible photos is a normal state, not an error
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photo(&self, image_id: ImageId) -> Option<&BoardPhoto> {
        self.photos.iter().find(|photo| photo.id == image_id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A rendered board and the session that rendered it, for follow-up reactions
pub struct LoadedBoard {
    pub view: BoardView,
    pub session: LayoutSession<StdRng>,
}

/// Open the catalog at `db_path` on the configured calendar
pub fn open_catalog(db_path: &Path, config: &BoardConfig) -> Result<Library> {
    Ok(Library::open(db_path)?.with_calendar(config.calendar()?))
}

/// Layout RNG: the configured seed when there is one
pub fn layout_rng(config: &BoardConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Load and lay out the board as of `now`
pub async fn load_board(config: &BoardConfig, now: DateTime<Utc>) -> Result<LoadedBoard> {
    let db_path = config.database_path()?;

    let images = {
        let db_path = db_path.clone();
        let config = config.clone();
        spawn_blocking(move || open_catalog(&db_path, &config)?.list_images())
            .await
            .map_err(|e| BoardError::Task(e.to_string()))??
    };

    let mut visible = filter_visible(&images, now);
    sort_newest_first(&mut visible);
    debug!(total = images.len(), visible = visible.len(), "visibility filtered");

    let buttons = fetch_buttons(&db_path, config, &visible).await?;

    let mut session = LayoutSession::new(
        config.container_height,
        config.row_reference(),
        layout_rng(config),
    );
    for image in &visible {
        let count = buttons.get(&image.id).map_or(0, Vec::len);
        session.seed_reactions(image.id, count as u32);
    }

    let (session, placements) = {
        let db_path = db_path.clone();
        let config = config.clone();
        let visible = visible.clone();
        spawn_blocking(move || -> Result<_> {
            let mut library = open_catalog(&db_path, &config)?;
            let placements = session.place_all(&visible, &mut library)?;
            Ok((session, placements))
        })
        .await
        .map_err(|e| BoardError::Task(e.to_string()))??
    };

    let view = build_view(&visible, placements, buttons, session.board_width(config.frame_width), now);
    info!(
        photos = view.photos.len(),
        skipped = view.skipped.len(),
        width = view.board_width,
        "board ready"
    );
    Ok(LoadedBoard { view, session })
}

/// Buttons of every image, fetched concurrently and joined before returning
async fn fetch_buttons(
    db_path: &Path,
    config: &BoardConfig,
    images: &[ImageRecord],
) -> Result<HashMap<ImageId, Vec<ReactionRecord>>> {
    let mut tasks = JoinSet::new();
    for image in images {
        let db_path = db_path.to_path_buf();
        let config = config.clone();
        let image_id = image.id;
        tasks.spawn_blocking(move || -> Result<(ImageId, Vec<ReactionRecord>)> {
            let library = open_catalog(&db_path, &config)?;
            Ok((image_id, library.list_reactions_for_image(image_id)?))
        });
    }

    let mut buttons = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (image_id, reactions) = joined.map_err(|e| BoardError::Task(e.to_string()))??;
        buttons.insert(image_id, reactions);
    }
    Ok(buttons)
}

fn build_view(
    visible: &[ImageRecord],
    mut placements: HashMap<ImageId, Placement>,
    mut buttons: HashMap<ImageId, Vec<ReactionRecord>>,
    board_width: f64,
    now: DateTime<Utc>,
) -> BoardView {
    let mut photos = Vec::new();
    let mut skipped = Vec::new();
    for image in visible {
        match placements.remove(&image.id) {
            Some(placement) => photos.push(BoardPhoto {
                id: image.id,
                owner_id: image.owner_id,
                filename: image.filename.clone(),
                placement,
                buttons: buttons.remove(&image.id).unwrap_or_default(),
            }),
            None => skipped.push(image.id),
        }
    }
    BoardView {
        generated_at: now,
        board_width,
        photos,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::button::ButtonStyle;
    use crate::state::data::{NewImage, ReactionDraft};
    use chrono::TimeZone;

    fn config(dir: &Path) -> BoardConfig {
        BoardConfig {
            database_path: Some(dir.join("board.db")),
            seed: Some(17),
            ..BoardConfig::default()
        }
    }

    fn upload(library: &Library, name: &str, at: DateTime<Utc>, width: u32, height: u32) -> ImageRecord {
        library
            .insert_image(NewImage {
                owner_id: 1,
                filename: name.to_string(),
                width,
                height,
                uploaded_at: at,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_board_shows_only_open_windows() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut library = open_catalog(&config.database_path().unwrap(), &config).unwrap();

        // 2024-06-01 13:00 and 15:00 local (+09:00): both shown 06-02 06:00..12:00
        let older = upload(&library, "a.jpg", Utc.with_ymd_and_hms(2024, 6, 1, 4, 0, 0).unwrap(), 1200, 800);
        let newer = upload(&library, "b.jpg", Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap(), 600, 900);
        // 2024-06-02 13:00 local: shown the day after
        upload(&library, "c.jpg", Utc.with_ymd_and_hms(2024, 6, 2, 4, 0, 0).unwrap(), 800, 800);

        library
            .add_or_update_reaction(
                2,
                older.id,
                ReactionDraft {
                    button: ButtonStyle {
                        variant: 4,
                        size: 30.0,
                        left: 1.0,
                        top: 1.0,
                        rotation: 0.0,
                    },
                    added_at: None,
                },
            )
            .unwrap();

        // 2024-06-02 08:00 local
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let loaded = load_board(&config, now).await.unwrap();
        let view = &loaded.view;

        let ids: Vec<ImageId> = view.photos.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert!(view.skipped.is_empty());
        assert_eq!(view.photo(older.id).unwrap().buttons.len(), 1);
        assert!(view.photo(newer.id).unwrap().buttons.is_empty());
        assert_eq!(loaded.session.growth().count(older.id), 1);
        assert!(view.board_width >= config.frame_width);

        // newest photo sits on the origin anchor
        assert_eq!(
            view.photos[0].placement.anchor.to_string(),
            "anchor_0_col_50"
        );

        // placements were saved, so a second load is identical
        let again = load_board(&config, now).await.unwrap();
        assert_eq!(again.view.photos, view.photos);
    }

    #[tokio::test]
    async fn test_empty_board_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let view = load_board(&config, Utc::now()).await.unwrap().view;
        assert!(view.is_empty());
        assert_eq!(view.board_width, config.frame_width);
        assert!(view.to_json().unwrap().contains("\"photos\": []"));
    }
}
