use std::collections::HashSet;
use std::path::{Path, PathBuf};

use button_board::board::{load_board, open_catalog};
use button_board::config::BoardConfig;
use button_board::error::{BoardError, Result};
use button_board::layout::{GrowthOutcome, ReactionOutcome};
use button_board::reaction::group_by_day;
use button_board::state::data::{ImageId, UserId};
use button_board::state::source::{ImageSource, ReactionSource};
use button_board::upload::{ingest_file, ingest_folder_async, UploadOptions};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "button-board", version, about = "Morning photo board with reaction buttons")]
struct Cli {
    /// Config file (default: <config_dir>/button-board/config.json)
    #[arg(long, global = true, env = "BUTTON_BOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more photos
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        user: UserId,
    },
    /// Upload every photo below a folder
    Import {
        folder: PathBuf,
        #[arg(long)]
        user: UserId,
    },
    /// Lay out and print the board as it looks right now
    Board {
        #[arg(long)]
        json: bool,
    },
    /// Pin a button on a photo
    React {
        image: ImageId,
        #[arg(long)]
        user: UserId,
    },
    /// A user's buttons, grouped by day
    Buttons {
        #[arg(long)]
        user: UserId,
    },
    /// Delete one of your photos
    Delete {
        image: ImageId,
        #[arg(long)]
        user: UserId,
    },
    /// Show the windows around an instant (default: now)
    Window {
        /// RFC 3339 instant, e.g. 2024-06-01T13:00:00+09:00
        #[arg(long)]
        at: Option<String>,
    },
    /// Inspect or move the debug clock offset
    Clock {
        #[command(subcommand)]
        command: ClockCommand,
    },
    /// Remove every photo, button and layout
    ResetAll,
}

#[derive(Subcommand)]
enum ClockCommand {
    Show,
    /// Add milliseconds to the offset (negative to go back)
    Shift {
        #[arg(allow_hyphen_values = true)]
        delta_ms: i64,
    },
    Reset,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => BoardConfig::default_path()?,
    };
    let mut config = BoardConfig::load_from(&config_path)?;
    let now = config.clock().now();

    match cli.command {
        Commands::Upload { paths, user } => {
            let library = open_catalog(&config.database_path()?, &config)?;
            let options = upload_options(&config)?;
            for path in paths {
                let record = ingest_file(&library, &options, &path, user, now)?;
                println!(
                    "📸 {} -> image {} ({}x{}), on the board from {}",
                    path.display(),
                    record.id,
                    record.width,
                    record.height,
                    local(&config, record.display_start_at)?
                );
            }
            let cycle = library.images_in_current_cycle(now)?;
            println!("📅 {} photo(s) uploaded in this cycle", cycle.len());
        }
        Commands::Import { folder, user } => {
            let report = ingest_folder_async(
                config.database_path()?,
                config.calendar()?,
                upload_options(&config)?,
                folder,
                user,
                now,
            )
            .await?;
            println!(
                "✅ Import complete: {} new, {} skipped",
                report.imported, report.skipped
            );
        }
        Commands::Board { json } => {
            let view = load_board(&config, now).await?.view;
            if json {
                println!("{}", view.to_json()?);
            } else if view.is_empty() {
                println!("No photos on the board right now.");
            } else {
                println!("Board width {:.0}px", view.board_width);
                for photo in &view.photos {
                    let p = &photo.placement;
                    let (w, h) = p.photo_size();
                    println!(
                        "  #{:<5} {:<28} at ({:>7.1}, {:>6.1}) {:>5.1}x{:<5.1} {:>5.1}°  {} button(s)",
                        photo.id,
                        p.anchor.to_string(),
                        p.x,
                        p.y,
                        w,
                        h,
                        p.rotation,
                        photo.buttons.len()
                    );
                }
                for id in &view.skipped {
                    println!("  #{:<5} did not fit", id);
                }
            }
        }
        Commands::React { image, user } => {
            let mut loaded = load_board(&config, now).await?;
            let shown = loaded
                .view
                .photo(image)
                .map(|photo| photo.buttons.len())
                .ok_or(BoardError::NotPlaced(image))?;
            let db_path = config.database_path()?;
            let task_config = config.clone();
            let outcome = tokio::task::spawn_blocking(move || -> Result<ReactionOutcome> {
                let mut library = open_catalog(&db_path, &task_config)?;
                loaded.session.react(user, image, now, &mut library)
            })
            .await
            .map_err(|e| BoardError::Task(e.to_string()))??;

            match outcome {
                ReactionOutcome::Duplicate(existing) => {
                    println!(
                        "You already pinned {} on image {}.",
                        existing.button.sprite_name(),
                        image
                    );
                }
                ReactionOutcome::Added { reaction, growth } => {
                    println!(
                        "🔘 Pinned {} on image {} ({} button(s) now)",
                        reaction.button.sprite_name(),
                        image,
                        shown + 1
                    );
                    match growth {
                        GrowthOutcome::Grew { level, .. } => {
                            println!("   The photo grew to level {}!", level)
                        }
                        GrowthOutcome::Vetoed { level, .. } => {
                            println!("   No room to grow to level {} yet.", level)
                        }
                        GrowthOutcome::Unchanged { .. } => {}
                    }
                }
            }
        }
        Commands::Buttons { user } => {
            let library = open_catalog(&config.database_path()?, &config)?;
            let existing: HashSet<ImageId> =
                library.list_images()?.into_iter().map(|i| i.id).collect();
            let reactions = library.list_reactions_for_user(user)?;
            let groups = group_by_day(&reactions, &existing, library.calendar());
            if groups.is_empty() {
                println!("No buttons yet.");
            }
            for group in groups {
                println!("{}", group.date.format("%Y-%m-%d (%a)"));
                for reaction in group.reactions {
                    println!("  image {:<5} {}", reaction.image_id, reaction.button.sprite_name());
                }
            }
        }
        Commands::Delete { image, user } => {
            let mut library = open_catalog(&config.database_path()?, &config)?;
            let filename = library.delete_image(image, user)?;
            remove_upload(&config.uploads_dir()?, &filename);
            println!("🗑️  Deleted image {}", image);
        }
        Commands::Window { at } => {
            let instant = match at {
                Some(text) => DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| BoardError::Config(format!("bad --at value {}: {}", text, e)))?
                    .with_timezone(&Utc),
                None => now,
            };
            let calendar = config.calendar()?;
            let display = calendar.compute_display_window(instant);
            let upload = calendar.compute_upload_window(instant);
            let remaining = calendar.remaining_upload_window(instant);
            let zone = config.local_zone()?;

            println!("At                 {}", instant.with_timezone(&zone));
            println!(
                "Upload now shows   {} .. {}",
                display.start.with_timezone(&zone),
                display.end.with_timezone(&zone)
            );
            println!(
                "Upload window      {} .. {} ({})",
                upload.start.with_timezone(&zone),
                upload.end.with_timezone(&zone),
                if remaining <= chrono::Duration::zero() {
                    "closed".to_string()
                } else {
                    format!("{}h {}m left", remaining.num_hours(), remaining.num_minutes() % 60)
                }
            );
            println!(
                "Next cycle starts  {}",
                calendar.next_upload_window_start(instant).with_timezone(&zone)
            );
            println!(
                "Board open         {}",
                if calendar.is_display_hour(instant) { "yes" } else { "no" }
            );
        }
        Commands::Clock { command } => {
            match command {
                ClockCommand::Show => {}
                ClockCommand::Shift { delta_ms } => {
                    let mut clock = config.clock();
                    clock.shift(delta_ms);
                    config.time_offset_ms = clock.offset_ms();
                    config.save_to(&config_path)?;
                }
                ClockCommand::Reset => {
                    let mut clock = config.clock();
                    clock.reset();
                    config.time_offset_ms = clock.offset_ms();
                    config.save_to(&config_path)?;
                }
            }
            let clock = config.clock();
            println!("Offset {}", clock.describe_offset());
            println!("Board time {}", clock.now().with_timezone(&config.local_zone()?));
        }
        Commands::ResetAll => {
            let mut library = open_catalog(&config.database_path()?, &config)?;
            let uploads = config.uploads_dir()?;
            let filenames = library.reset_all()?;
            for filename in &filenames {
                remove_upload(&uploads, filename);
            }
            println!("🧹 Removed {} photos", filenames.len());
        }
    }

    info!("done");
    Ok(())
}

fn upload_options(config: &BoardConfig) -> Result<UploadOptions> {
    Ok(UploadOptions {
        uploads_dir: config.uploads_dir()?,
        max_width: config.upload_max_width,
    })
}

fn local(config: &BoardConfig, instant: Option<DateTime<Utc>>) -> Result<String> {
    let zone = config.local_zone()?;
    Ok(instant
        .map(|t| t.with_timezone(&zone).to_string())
        .unwrap_or_else(|| "never".to_string()))
}

fn remove_upload(dir: &Path, filename: &str) {
    let path = dir.join(filename);
    if let Err(e) = std::fs::remove_file(&path) {
        eprintln!("⚠️  Could not remove {}: {}", path.display(), e);
    }
}
