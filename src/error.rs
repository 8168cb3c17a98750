//! Error types shared by the codec, the stream driver and the CLI job.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring or running a Hamming codec.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested block size cannot be handled by the codec.
    #[error("invalid block size {size}: must be between {min} and {max} bits")]
    InvalidBlockSize {
        /// Requested block size in bits
        size: usize,
        /// Smallest supported block size
        min: usize,
        /// Largest supported block size
        max: usize,
    },

    /// The input or output stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file could not be opened or created.
    #[error("cannot open {}: {source}", path.display())]
    File {
        /// Path that failed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Invalid argument outside the codec itself.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
