//! File-level runs of the codec.
//!
//! A [`Job`] decides the direction from the input file name, derives the output file name,
//! opens both files, runs [`ecc::encode`](crate::ecc::encode) or
//! [`ecc::decode`](crate::ecc::decode) and closes the files again, whatever the outcome.

use crate::ecc::{self, DecodeSummary, EncodeSummary, HammingCode};
use crate::error::{Error, Result};
use log::info;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Extension marking an encoded file.
pub const ENCODED_EXTENSION: &str = "hcode";

/// Extension given to decoded files.
pub const DECODED_EXTENSION: &str = "txt";

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encode,
    Decode,
}

impl Mode {
    /// Files ending in [`ENCODED_EXTENSION`] are decoded, everything else is encoded.
    pub fn for_path(path: &Path) -> Self {
        if path.extension() == Some(OsStr::new(ENCODED_EXTENSION)) {
            Mode::Decode
        } else {
            Mode::Encode
        }
    }

    /// Output path for `input`: its last extension replaced by the one this mode produces.
    pub fn output_path(self, input: &Path) -> Result<PathBuf> {
        if input.file_name().is_none() {
            return Err(Error::InvalidInput(format!(
                "{} does not name a file",
                input.display()
            )));
        }

        let extension = match self {
            Mode::Encode => ENCODED_EXTENSION,
            Mode::Decode => DECODED_EXTENSION,
        };
        Ok(input.with_extension(extension))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Encode => write!(f, "encode"),
            Mode::Decode => write!(f, "decode"),
        }
    }
}

/// Result of a finished [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    Encoded(EncodeSummary),
    Decoded(DecodeSummary),
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Encoded(s) => write!(
                f,
                "{} blocks encoded, {} tail bits",
                s.blocks, s.tail_bits
            ),
            Summary::Decoded(s) => write!(
                f,
                "{} blocks decoded, {} corrected, {} uncorrectable, {} tail bits",
                s.blocks, s.corrected, s.unlocatable, s.tail_bits
            ),
        }
    }
}

/// One encode or decode run from an input file to an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub mode: Mode,
    pub input: PathBuf,
    pub output: PathBuf,
    pub code: HammingCode,
}

impl Job {
    /// Validates the block size and fills in the mode and output path when not given.
    pub fn new(
        input: impl Into<PathBuf>,
        block_size: usize,
        mode: Option<Mode>,
        output: Option<PathBuf>,
    ) -> Result<Self> {
        let input = input.into();
        let code = HammingCode::new(block_size)?;
        let mode = mode.unwrap_or_else(|| Mode::for_path(&input));
        let output = match output {
            Some(path) => path,
            None => mode.output_path(&input)?,
        };

        if output == input {
            return Err(Error::InvalidInput(format!(
                "output would overwrite input {}",
                input.display()
            )));
        }

        Ok(Job {
            mode,
            input,
            output,
            code,
        })
    }

    /// Runs the job. Both files are closed when this returns.
    ///
    /// Refuses to start when the output path resolves to the input file, since creating
    /// the output would truncate the input before it is read.
    pub fn run(&self) -> Result<Summary> {
        let input = File::open(&self.input).map_err(|source| Error::File {
            path: self.input.clone(),
            source,
        })?;
        if same_file(&self.input, &self.output)? {
            return Err(Error::InvalidInput(format!(
                "output {} is the input file {}",
                self.output.display(),
                self.input.display()
            )));
        }
        let output = File::create(&self.output).map_err(|source| Error::File {
            path: self.output.clone(),
            source,
        })?;

        info!(
            "{} {} -> {} with {} bit blocks",
            self.mode,
            self.input.display(),
            self.output.display(),
            self.code.block_size()
        );

        let input = BufReader::new(input);
        let output = BufWriter::new(output);
        let summary = match self.mode {
            Mode::Encode => Summary::Encoded(ecc::encode(&self.code, input, output)?),
            Mode::Decode => Summary::Decoded(ecc::decode(&self.code, input, output)?),
        };

        info!("{}", summary);
        Ok(summary)
    }
}

/// Whether `output` resolves to the same file as the existing `input`.
///
/// Catches `..` segments, relative against absolute paths and symlinks. An output that
/// does not exist yet cannot be the input.
fn same_file(input: &Path, output: &Path) -> Result<bool> {
    let output = match fs::canonicalize(output) {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(Error::File {
                path: output.to_path_buf(),
                source,
            })
        }
    };
    let input = fs::canonicalize(input).map_err(|source| Error::File {
        path: input.to_path_buf(),
        source,
    })?;
    Ok(input == output)
}
