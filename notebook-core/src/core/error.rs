//! Error types for the Notebook core library.

use thiserror::Error;

/// All errors that can occur within the Notebook core library.
#[derive(Debug, Error)]
pub enum NotebookError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or exchanged data could not be (de)serialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The WebDAV request could not be sent or its body could not be read.
    #[error("WebDAV transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The WebDAV server answered with a status the operation does not accept.
    #[error("WebDAV server returned HTTP {status} for {path}")]
    HttpStatus { status: u16, path: String },

    /// A cloud sync call was made before a WebDAV client was configured.
    #[error("WebDAV client not initialized")]
    SyncNotConfigured,

    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An import document could not be parsed or written.
    ///
    /// The underlying cause is logged and intentionally not carried.
    #[error("Import failed, please check the file format")]
    ImportFailed,
}

/// Convenience alias that pins the error type to [`NotebookError`].
pub type Result<T> = std::result::Result<T, NotebookError>;

impl NotebookError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Transport(_) => "Could not reach the sync server".to_string(),
            Self::HttpStatus { status, .. } => format!("Sync server rejected the request ({status})"),
            Self::SyncNotConfigured => "Cloud sync is not configured".to_string(),
            Self::InvalidConfig(msg) => msg.clone(),
            Self::ImportFailed => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_failed_message_is_generic() {
        let e = NotebookError::ImportFailed;
        assert_eq!(e.user_message(), "Import failed, please check the file format");
    }

    #[test]
    fn test_http_status_mentions_code_and_path() {
        let e = NotebookError::HttpStatus {
            status: 423,
            path: "/notebook/data.json".to_string(),
        };
        let text = e.to_string();
        assert!(text.contains("423"));
        assert!(text.contains("/notebook/data.json"));
        assert!(e.user_message().contains("423"));
    }

    #[test]
    fn test_sqlite_error_converts() {
        let e: NotebookError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(e, NotebookError::Database(_)));
    }
}
