//! Error types for taskpro
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad input, unknown task)
//! - 3: Blocked by a lock (expired task, locked resolutions)
//! - 4: Operation failed (storage, filesystem, config parse)

use thiserror::Error;

/// Exit codes for the taskpro CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const LOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Task {0} not found")]
    NotFound(i64),

    // Locks (exit code 3)
    #[error("Locked: {0}")]
    Locked(String),

    // Operation failures (exit code 4)
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::InvalidDate(_) | Error::NotFound(_) => {
                exit_codes::USER_ERROR
            }

            Error::Locked(_) => exit_codes::LOCKED,

            Error::Storage(_) | Error::Io(_) | Error::Json(_) | Error::TomlParse(_) => {
                exit_codes::OPERATION_FAILED
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
