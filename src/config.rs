//! Configuration handling for the application.

use clap::Parser;

/// Default maximum nesting depth of folders below a data room root.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 5;

/// Default maximum upload size (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Data room file manager with name and PDF content search.
#[derive(Parser, Debug, Clone)]
#[command(name = "dataroom")]
#[command(about = "Data room file manager with name and PDF content search")]
pub struct Config {
    /// Server listen address (host or IP)
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1")]
    pub listen_addr: String,

    /// Server listen port
    #[arg(long, env = "LISTEN_PORT", default_value_t = 8000)]
    pub listen_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Path to the SQLite database file holding the persisted state
    #[arg(long, env = "DB_PATH", default_value = "dataroom.db")]
    pub db_path: String,

    /// Storage quota in bytes for the persisted state (0 disables the quota)
    #[arg(long, env = "STORAGE_QUOTA", default_value_t = 50 * 1024 * 1024)]
    pub storage_quota: usize,

    /// Maximum folder nesting depth below a data room root
    #[arg(long, env = "MAX_FOLDER_DEPTH", default_value_t = DEFAULT_MAX_FOLDER_DEPTH)]
    pub max_folder_depth: usize,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Accepted MIME types for uploads (comma separated)
    #[arg(
        long,
        env = "ALLOWED_FILE_TYPES",
        value_delimiter = ',',
        default_value = "application/pdf"
    )]
    pub allowed_file_types: Vec<String>,

    /// Accepted file extensions for uploads (comma separated)
    #[arg(
        long,
        env = "ALLOWED_FILE_EXTENSIONS",
        value_delimiter = ',',
        default_value = ".pdf"
    )]
    pub allowed_file_extensions: Vec<String>,
}

impl Config {
    /// Store limits derived from the command line.
    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_folder_depth: self.max_folder_depth,
        }
    }

    /// Upload policy derived from the command line.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_mime_types: self.allowed_file_types.clone(),
            allowed_extensions: self.allowed_file_extensions.clone(),
            max_file_size: self.max_file_size,
        }
    }

    /// Quota handed to the persistence backend, `None` when disabled.
    pub fn quota(&self) -> Option<usize> {
        (self.storage_quota > 0).then_some(self.storage_quota)
    }

    /// SQLite connection URL for the configured database path.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.db_path)
    }
}

/// Structural limits the store enforces on every create and move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum number of parent hops from any folder to its data room root.
    pub max_folder_depth: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

/// Which uploads the calling layer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub allowed_mime_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec!["application/pdf".to_string()],
            allowed_extensions: vec![".pdf".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadPolicy {
    /// Check if a file is of an accepted kind.
    ///
    /// A file passes on either its MIME type or its extension, since browsers
    /// and operating systems frequently misreport PDF MIME types.
    pub fn is_allowed(&self, file_name: &str, mime_type: &str) -> bool {
        let mime_type = mime_type.to_lowercase();
        let file_name = file_name.to_lowercase();

        let has_valid_type = self.allowed_mime_types.iter().any(|allowed| {
            let allowed = allowed.to_lowercase();
            mime_type == allowed || (allowed.ends_with("/pdf") && mime_type.contains("pdf"))
        });
        let has_valid_extension = self
            .allowed_extensions
            .iter()
            .any(|ext| file_name.ends_with(&ext.to_lowercase()));

        has_valid_type || has_valid_extension
    }

    /// Validate an upload, returning the reason it is rejected.
    pub fn check(&self, file_name: &str, mime_type: &str, size: u64) -> crate::error::Result<()> {
        if !self.is_allowed(file_name, mime_type) {
            return Err(crate::error::AppError::UnsupportedFile(format!(
                "{} ({})",
                file_name, mime_type
            )));
        }
        if size > self.max_file_size {
            return Err(crate::error::AppError::UnsupportedFile(format!(
                "{} is {} bytes, limit is {} bytes",
                file_name, size, self.max_file_size
            )));
        }
        Ok(())
    }
}
