use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::data::{ImageId, ImageRecord, NewImage, ReactionDraft, ReactionRecord, UserId};
use super::source::{ImageSource, ReactionSource};
use crate::config::DEFAULT_UTC_OFFSET_MINUTES;
use crate::error::{BoardError, Result};
use crate::layout::placement::{AnchorMapping, Placement};
use crate::layout::store::PlacementStore;
use crate::reaction::button::ButtonStyle;
use crate::schedule::WindowCalculator;

const IMAGE_COLUMNS: &str = "i.id, i.owner_id, i.filename, i.width, i.height, i.uploaded_at,
     i.display_start_at, i.display_end_at, p.placement_json";

const REACTION_COLUMNS: &str = "id, user_id, image_id, button_json, added_at";

/// The Library manages the SQLite board catalog.
/// It stores uploaded photos with their display windows, every user's
/// reaction button, and the saved board layout.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
    calendar: WindowCalculator<FixedOffset>,
}

impl Library {
    /// Open (or create) the catalog at `path`.
    ///
    /// Display windows are computed on the board's default calendar; use
    /// [`with_calendar`](Self::with_calendar) to change it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        info!(path = %db_path.display(), "catalog opened");
        Self::init(conn, db_path)
    }

    /// Throwaway catalog for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self> {
        let zone = FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix());
        let library = Library {
            conn,
            db_path,
            calendar: WindowCalculator::new(zone),
        };
        library.init_schema()?;
        Ok(library)
    }

    pub fn with_calendar(mut self, calendar: WindowCalculator<FixedOffset>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn calendar(&self) -> &WindowCalculator<FixedOffset> {
        &self.calendar
    }

    /// Create all tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Photos with their display window, timestamps in epoch millis
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id            INTEGER NOT NULL,
                filename            TEXT NOT NULL UNIQUE,
                width               INTEGER NOT NULL,
                height              INTEGER NOT NULL,
                uploaded_at         INTEGER NOT NULL,
                display_start_at    INTEGER,
                display_end_at      INTEGER
            )",
            [],
        )?;

        // One button per (user, image)
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reactions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL,
                image_id        INTEGER NOT NULL,
                button_json     TEXT NOT NULL,
                added_at        INTEGER NOT NULL,
                UNIQUE(user_id, image_id),
                FOREIGN KEY(image_id) REFERENCES images(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS placements (
                image_id        INTEGER PRIMARY KEY,
                placement_json  TEXT NOT NULL,
                FOREIGN KEY(image_id) REFERENCES images(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS anchor_mappings (
                image_id        INTEGER PRIMARY KEY,
                mapping         TEXT NOT NULL,
                FOREIGN KEY(image_id) REFERENCES images(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_uploaded_at
             ON images(uploaded_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reactions_image_id
             ON reactions(image_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reactions_user_id
             ON reactions(user_id, added_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn image_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Store a new photo. The display window is assigned here from the
    /// upload time and never changes afterwards.
    pub fn insert_image(&self, image: NewImage) -> Result<ImageRecord> {
        let window = self.calendar.compute_display_window(image.uploaded_at);

        self.conn.execute(
            "INSERT INTO images (owner_id, filename, width, height, uploaded_at, display_start_at, display_end_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image.owner_id,
                image.filename,
                image.width,
                image.height,
                image.uploaded_at.timestamp_millis(),
                window.start.timestamp_millis(),
                window.end.timestamp_millis(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(image_id = id, owner_id = image.owner_id, display_start = %window.start, "image stored");

        self.get_image(id)?.ok_or(BoardError::ImageNotFound(id))
    }

    pub fn get_image(&self, image_id: ImageId) -> Result<Option<ImageRecord>> {
        let sql = format!(
            "SELECT {} FROM images i LEFT JOIN placements p ON p.image_id = i.id WHERE i.id = ?1",
            IMAGE_COLUMNS
        );
        let image = self
            .conn
            .query_row(&sql, [image_id], image_from_row)
            .optional()?;
        Ok(image)
    }

    /// Photos uploaded in `[start, end)`, newest first
    pub fn images_uploaded_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ImageRecord>> {
        let sql = format!(
            "SELECT {} FROM images i LEFT JOIN placements p ON p.image_id = i.id
             WHERE i.uploaded_at >= ?1 AND i.uploaded_at < ?2
             ORDER BY i.uploaded_at DESC, i.id DESC",
            IMAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let image_iter = stmt.query_map(
            [start.timestamp_millis(), end.timestamp_millis()],
            image_from_row,
        )?;

        let mut images = Vec::new();
        for image in image_iter {
            images.push(image?);
        }
        Ok(images)
    }

    /// Photos uploaded in the noon-to-noon cycle containing `now`
    pub fn images_in_current_cycle(&self, now: DateTime<Utc>) -> Result<Vec<ImageRecord>> {
        let cycle = self.calendar.current_upload_cycle(now);
        self.images_uploaded_between(cycle.start, cycle.end)
    }

    /// Delete a photo together with its reactions and layout.
    ///
    /// Only the owner may delete. Returns the stored filename so the caller
    /// can remove the file.
    pub fn delete_image(&mut self, image_id: ImageId, user_id: UserId) -> Result<String> {
        let found: Option<(UserId, String)> = self
            .conn
            .query_row(
                "SELECT owner_id, filename FROM images WHERE id = ?1",
                [image_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (owner_id, filename) = found.ok_or(BoardError::ImageNotFound(image_id))?;
        if owner_id != user_id {
            return Err(BoardError::NotOwner {
                image: image_id,
                user: user_id,
            });
        }

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM reactions WHERE image_id = ?1", [image_id])?;
        tx.execute("DELETE FROM placements WHERE image_id = ?1", [image_id])?;
        tx.execute("DELETE FROM anchor_mappings WHERE image_id = ?1", [image_id])?;
        tx.execute("DELETE FROM images WHERE id = ?1", [image_id])?;
        tx.commit()?;

        info!(image_id, "image deleted");
        Ok(filename)
    }

    /// Wipe every photo, reaction and layout. Returns the stored filenames.
    pub fn reset_all(&mut self) -> Result<Vec<String>> {
        let filenames = {
            let mut stmt = self.conn.prepare("SELECT filename FROM images")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut filenames = Vec::new();
            for filename in rows {
                filenames.push(filename?);
            }
            filenames
        };

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM reactions", [])?;
        tx.execute("DELETE FROM placements", [])?;
        tx.execute("DELETE FROM anchor_mappings", [])?;
        tx.execute("DELETE FROM images", [])?;
        tx.commit()?;

        warn!(images = filenames.len(), "catalog reset");
        Ok(filenames)
    }

    /// Reaction counts per photo, for seeding growth counters
    pub fn reaction_counts(&self) -> Result<Vec<(ImageId, u32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT image_id, COUNT(*) FROM reactions GROUP BY image_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn query_reactions(&self, filter: &str, id: i64) -> Result<Vec<ReactionRecord>> {
        let sql = format!("SELECT {} FROM reactions WHERE {}", REACTION_COLUMNS, filter);
        let mut stmt = self.conn.prepare(&sql)?;
        let reaction_iter = stmt.query_map([id], reaction_from_row)?;

        let mut reactions = Vec::new();
        for reaction in reaction_iter {
            reactions.push(reaction?);
        }
        Ok(reactions)
    }
}

impl ImageSource for Library {
    fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let sql = format!(
            "SELECT {} FROM images i LEFT JOIN placements p ON p.image_id = i.id
             ORDER BY i.uploaded_at DESC, i.id DESC",
            IMAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let image_iter = stmt.query_map([], image_from_row)?;

        let mut images = Vec::new();
        for image in image_iter {
            images.push(image?);
        }
        Ok(images)
    }
}

impl ReactionSource for Library {
    fn list_reactions_for_image(&self, image_id: ImageId) -> Result<Vec<ReactionRecord>> {
        self.query_reactions("image_id = ?1 ORDER BY added_at ASC, id ASC", image_id)
    }

    fn list_reactions_for_user(&self, user_id: UserId) -> Result<Vec<ReactionRecord>> {
        self.query_reactions("user_id = ?1 ORDER BY added_at DESC, id DESC", user_id)
    }

    fn reaction_for(&self, user_id: UserId, image_id: ImageId) -> Result<Option<ReactionRecord>> {
        let sql = format!(
            "SELECT {} FROM reactions WHERE user_id = ?1 AND image_id = ?2",
            REACTION_COLUMNS
        );
        let reaction = self
            .conn
            .query_row(&sql, [user_id, image_id], reaction_from_row)
            .optional()?;
        Ok(reaction)
    }

    fn add_or_update_reaction(
        &mut self,
        user_id: UserId,
        image_id: ImageId,
        draft: ReactionDraft,
    ) -> Result<ReactionRecord> {
        if self.get_image(image_id)?.is_none() {
            return Err(BoardError::ImageNotFound(image_id));
        }

        let button_json = draft.button.to_json()?;
        let added_at = draft.added_at.map(|t| t.timestamp_millis());

        // A missing timestamp keeps the stored one on update
        self.conn.execute(
            "INSERT INTO reactions (user_id, image_id, button_json, added_at)
             VALUES (?1, ?2, ?3, COALESCE(?4, ?5))
             ON CONFLICT(user_id, image_id) DO UPDATE SET
                button_json = excluded.button_json,
                added_at = COALESCE(?4, reactions.added_at)",
            params![
                user_id,
                image_id,
                button_json,
                added_at,
                Utc::now().timestamp_millis()
            ],
        )?;

        self.reaction_for(user_id, image_id)?
            .ok_or(BoardError::ImageNotFound(image_id))
    }
}

impl PlacementStore for Library {
    fn load_placement(&self, image_id: ImageId) -> Result<Option<Placement>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT placement_json FROM placements WHERE image_id = ?1",
                [image_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(json.and_then(|json| parse_placement(image_id, &json)))
    }

    fn save_placement(&mut self, image_id: ImageId, placement: &Placement) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO placements (image_id, placement_json) VALUES (?1, ?2)",
            params![image_id, placement.to_json()?],
        )?;
        Ok(())
    }

    fn load_anchor_mapping(&self, image_id: ImageId) -> Result<Option<AnchorMapping>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT mapping FROM anchor_mappings WHERE image_id = ?1",
                [image_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(text.and_then(|text| match text.parse() {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                warn!(image_id, error = %e, "ignoring unreadable anchor mapping");
                None
            }
        }))
    }

    fn save_anchor_mapping(&mut self, image_id: ImageId, mapping: AnchorMapping) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO anchor_mappings (image_id, mapping) VALUES (?1, ?2)",
            params![image_id, mapping.to_string()],
        )?;
        Ok(())
    }
}

fn parse_placement(image_id: ImageId, json: &str) -> Option<Placement> {
    match Placement::from_json(json) {
        Ok(placement) => Some(placement),
        Err(e) => {
            warn!(image_id, error = %e, "ignoring unreadable saved placement");
            None
        }
    }
}

fn millis(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(DateTime::from_timestamp_millis)
}

fn image_from_row(row: &Row) -> rusqlite::Result<ImageRecord> {
    let id: ImageId = row.get(0)?;
    let placement_json: Option<String> = row.get(8)?;
    Ok(ImageRecord {
        id,
        owner_id: row.get(1)?,
        filename: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        uploaded_at: millis(row.get(5)?).unwrap_or_default(),
        display_start_at: millis(row.get(6)?),
        display_end_at: millis(row.get(7)?),
        layout: placement_json.and_then(|json| parse_placement(id, &json)),
    })
}

fn reaction_from_row(row: &Row) -> rusqlite::Result<ReactionRecord> {
    let button_json: String = row.get(3)?;
    let button = ButtonStyle::from_json(&button_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(ReactionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_id: row.get(2)?,
        button,
        added_at: millis(row.get(4)?).unwrap_or_default(),
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
