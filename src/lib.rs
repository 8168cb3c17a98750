//! Hamming-code forward error correction for byte streams.
//!
//! A stream is cut into blocks of a configurable number of bits; each block carries data bits
//! plus parity (control) bits at the power-of-two positions, which lets the decoder find and
//! flip back one corrupted bit per block.
//!
//! - [`bitio`]: MSB-first bit reader and writer over byte streams
//! - [`ecc`]: the Hamming block codec and the stream encode/decode loops
//! - [`job`]: file-level runs (mode detection, output naming, opening and closing files)

pub mod bitio;
pub mod ecc;
pub mod error;
pub mod job;

pub use ecc::{ErrorCorrection, HammingCode};
pub use error::{Error, Result};
