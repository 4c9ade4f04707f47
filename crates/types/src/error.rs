use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A read against the underlying file failed. The I/O error is carried unmodified.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
