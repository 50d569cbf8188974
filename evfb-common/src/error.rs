//! Error type shared by the evfb crates
//!
//! Store implementations return this type; the service crate wraps it in its
//! own engine and editor errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Query, pool or transaction failure from SQLite
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or config file could not be created or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `config.toml` exists but does not parse
    #[error("Configuration error: {0}")]
    Config(String),

    /// An update targeted a form, field or submission row that is gone
    #[error("Not found: {0}")]
    NotFound(String),

    /// Text from outside the process that does not parse: a submission key
    /// or a field kind name
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored row that cannot be decoded (bad timestamp, options JSON,
    /// status) or a duplicate submission key
    #[error("Internal error: {0}")]
    Internal(String),
}
