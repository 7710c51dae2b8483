//! Import tool that mirrors a local directory into a new data room.
//!
//! Sub-directories become folders and accepted files are uploaded with
//! unique names:
//!   {source}/Legal/nda.pdf  ->  <room>/Legal/nda.pdf
//!
//! Usage:
//!   import_folder --source /path/to/dir [--name "Deal"] [--dry-run]
//!
//! Directories nested deeper than the folder depth limit are skipped along
//! with their contents.

use bytes::Bytes;
use clap::Parser;
use dataroom::config::{StoreLimits, UploadPolicy, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FOLDER_DEPTH};
use dataroom::store::{DataRoomStore, SqliteBackend};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "import_folder")]
#[command(about = "Import a local directory tree into a new data room")]
struct Args {
    /// Directory to import
    #[arg(long)]
    source: PathBuf,

    /// Data room name (defaults to the directory name)
    #[arg(long)]
    name: Option<String>,

    /// Path to the SQLite database file holding the persisted state
    #[arg(long, env = "DB_PATH", default_value = "dataroom.db")]
    db_path: String,

    /// Storage quota in bytes (0 disables the quota)
    #[arg(long, env = "STORAGE_QUOTA", default_value_t = 50 * 1024 * 1024)]
    storage_quota: usize,

    /// Maximum folder nesting depth below the data room root
    #[arg(long, env = "MAX_FOLDER_DEPTH", default_value_t = DEFAULT_MAX_FOLDER_DEPTH)]
    max_folder_depth: usize,

    /// Maximum accepted file size in bytes
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Dry run - show what would be imported without making changes
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

fn guess_mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !args.source.is_dir() {
        anyhow::bail!("{} is not a directory", args.source.display());
    }
    let room_name = args.name.clone().unwrap_or_else(|| {
        args.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Imported".to_string())
    });

    tracing::info!("Importing {} as data room '{}'", args.source.display(), room_name);
    if args.dry_run {
        tracing::info!("DRY RUN mode - no changes will be made");
    }

    let policy = UploadPolicy {
        max_file_size: args.max_file_size,
        ..UploadPolicy::default()
    };

    let store = if args.dry_run {
        None
    } else {
        let quota = (args.storage_quota > 0).then_some(args.storage_quota);
        let database_url = format!("sqlite:{}?mode=rwc", args.db_path);
        let backend = SqliteBackend::connect(&database_url, quota).await?;
        let limits = StoreLimits {
            max_folder_depth: args.max_folder_depth,
        };
        Some(DataRoomStore::open(Arc::new(backend), limits).await?)
    };

    // Directory path -> folder id (empty id in dry-run mode)
    let mut folder_ids: HashMap<PathBuf, String> = HashMap::new();
    if let Some(store) = &store {
        let room = store.create_data_room(&room_name).await?;
        folder_ids.insert(args.source.clone(), room.root_folder_id);
    } else {
        folder_ids.insert(args.source.clone(), String::new());
    }

    let mut folders_created = 0;
    let mut files_imported = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&args.source).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let Some(parent_id) = path.parent().and_then(|p| folder_ids.get(p)).cloned() else {
            // Parent directory was skipped.
            skipped += 1;
            continue;
        };

        if entry.file_type().is_dir() {
            if entry.depth() > args.max_folder_depth {
                tracing::warn!(
                    "Skipping {}: deeper than {} levels",
                    path.display(),
                    args.max_folder_depth
                );
                skipped += 1;
                continue;
            }

            let folder_id = match &store {
                Some(store) => store.create_folder(&parent_id, &name).await?.id,
                None => {
                    tracing::info!("Would create folder {}", path.display());
                    String::new()
                }
            };
            folder_ids.insert(path.to_path_buf(), folder_id);
            folders_created += 1;
        } else if entry.file_type().is_file() {
            let mime_type = guess_mime_type(path);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if let Err(e) = policy.check(&name, mime_type, size) {
                tracing::info!("Skipping {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }

            match &store {
                Some(store) => {
                    let data = tokio::fs::read(path).await?;
                    let unique_name = store.unique_file_name(&parent_id, &name);
                    store
                        .upload_file(&parent_id, &unique_name, Bytes::from(data), mime_type)
                        .await?;
                    tracing::debug!("Imported {} ({} bytes)", path.display(), size);
                }
                None => tracing::info!("Would import {} ({} bytes)", path.display(), size),
            }
            files_imported += 1;
        }
    }

    tracing::info!("Import complete!");
    tracing::info!("  Folders created: {}", folders_created);
    tracing::info!("  Files imported: {}", files_imported);
    tracing::info!("  Skipped: {}", skipped);

    Ok(())
}
