use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BoardError, Result};
use crate::schedule::WindowCalculator;
use crate::state::data::{ImageRecord, NewImage, UserId};
use crate::state::library::Library;

/// Extensions picked up by folder imports
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "gif", "bmp"];
/// Stored uploads are re-encoded as JPEG at this quality
pub const JPEG_QUALITY: u8 = 70;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub uploads_dir: PathBuf,
    /// Wider uploads are scaled down to this width
    pub max_width: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Store one photo: downscale, re-encode, write into the uploads directory
/// and add it to the catalog.
pub fn ingest_file(
    library: &Library,
    options: &UploadOptions,
    source: &Path,
    owner_id: UserId,
    uploaded_at: DateTime<Utc>,
) -> Result<ImageRecord> {
    let img = image::open(source)?;
    let img = fit_width(img, options.max_width);

    fs::create_dir_all(&options.uploads_dir)?;
    let filename = unique_filename(&options.uploads_dir, owner_id, uploaded_at);
    let target = options.uploads_dir.join(&filename);

    let writer = BufWriter::new(File::create(&target)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    encoder.encode_image(&img.to_rgb8())?;
    debug!(source = %source.display(), target = %target.display(), "upload encoded");

    let record = library.insert_image(NewImage {
        owner_id,
        filename,
        width: img.width(),
        height: img.height(),
        uploaded_at,
    });

    // Don't leave an orphaned file behind when the catalog refuses the row
    if record.is_err() {
        let _ = fs::remove_file(&target);
    }
    record
}

/// Import every image file below `folder`.
///
/// Files that fail to decode or store are skipped and logged; the import
/// carries on with the rest.
pub fn ingest_folder(
    library: &Library,
    options: &UploadOptions,
    folder: &Path,
    owner_id: UserId,
    uploaded_at: DateTime<Utc>,
) -> Result<ImportReport> {
    if !folder.is_dir() {
        return Err(BoardError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", folder.display()),
        )));
    }

    info!(folder = %folder.display(), "scanning folder");
    let mut report = ImportReport::default();

    // Walk the directory tree recursively
    for entry in WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !has_image_extension(path) {
            continue;
        }

        match ingest_file(library, options, path, owner_id, uploaded_at) {
            Ok(_) => {
                report.imported += 1;
                if report.imported % 100 == 0 {
                    info!(imported = report.imported, "import progress");
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping file");
                report.skipped += 1;
            }
        }
    }

    info!(
        imported = report.imported,
        skipped = report.skipped,
        "import complete"
    );
    Ok(report)
}

/// Background folder import on its own catalog connection.
pub async fn ingest_folder_async(
    db_path: PathBuf,
    calendar: WindowCalculator<FixedOffset>,
    options: UploadOptions,
    folder: PathBuf,
    owner_id: UserId,
    uploaded_at: DateTime<Utc>,
) -> Result<ImportReport> {
    tokio::task::spawn_blocking(move || {
        let library = Library::open(&db_path)?.with_calendar(calendar);
        ingest_folder(&library, &options, &folder, owner_id, uploaded_at)
    })
    .await
    .map_err(|e| BoardError::Task(e.to_string()))?
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn fit_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img;
    }
    let height = ((img.height() as f64) * (max_width as f64) / (img.width() as f64))
        .round()
        .max(1.0) as u32;
    img.resize_exact(max_width, height, FilterType::Lanczos3)
}

fn unique_filename(dir: &Path, owner_id: UserId, uploaded_at: DateTime<Utc>) -> String {
    let stem = format!("{}_{}", owner_id, uploaded_at.timestamp_millis());
    let mut candidate = format!("{}.jpg", stem);
    let mut n = 1;
    while dir.join(&candidate).exists() {
        candidate = format!("{}_{}.jpg", stem, n);
        n += 1;
    }
    candidate
}
