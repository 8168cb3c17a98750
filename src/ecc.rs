//! Error correction over byte streams.
//!
//! - [`hamming`]: the block codec (control/data layout, parity, single-bit correction)
//! - [`stream`]: the encode/decode loops that run the codec over a whole stream
//!
//! # Examples
//!
//! ```rust
//! use hamcode::ecc::{ErrorCorrection, HammingCode};
//!
//! let code = HammingCode::new(12).unwrap();
//! let mut encoded = code.encode(b"payload").unwrap();
//! encoded[2] ^= 0x04;
//! assert_eq!(code.decode(&encoded).unwrap(), b"payload");
//! ```

use crate::error::Result;

pub mod hamming;
pub mod stream;

pub use hamming::{Correction, HammingCode, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use stream::{decode, encode, DecodeSummary, EncodeSummary};

/// Trait for error correction code implementations
pub trait ErrorCorrection {
    /// Encode data with error correction symbols
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decode data and correct errors if possible
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

impl ErrorCorrection for HammingCode {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoded = Vec::with_capacity(self.encoded_len(data.len()));
        stream::encode(self, data, &mut encoded)?;
        Ok(encoded)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoded = Vec::with_capacity(data.len());
        stream::decode(self, data, &mut decoded)?;
        Ok(decoded)
    }
}

/// Creates a Hamming code with the given block size
pub fn create_hamming(block_size: usize) -> Result<HammingCode> {
    HammingCode::new(block_size)
}

/// Encodes data using the default 8 bit block
pub fn hamming_encode(data: &[u8]) -> Result<Vec<u8>> {
    HammingCode::default().encode(data)
}

/// Decodes data using the default 8 bit block
pub fn hamming_decode(encoded: &[u8]) -> Result<Vec<u8>> {
    HammingCode::default().decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_functions() {
        let data = b"Test";

        let encoded = hamming_encode(data).unwrap();
        assert_eq!(encoded.len(), 8);
        let decoded = hamming_decode(&encoded).unwrap();
        assert_eq!(decoded, data);

        let hamming = create_hamming(21).unwrap();
        let decoded = hamming.decode(&hamming.encode(data).unwrap()).unwrap();
        assert_eq!(decoded, data);

        assert!(create_hamming(2).is_err());
    }

    #[test]
    fn test_trait_object() {
        let codes: Vec<Box<dyn ErrorCorrection>> = vec![
            Box::new(HammingCode::new(7).unwrap()),
            Box::new(HammingCode::new(64).unwrap()),
        ];
        for code in &codes {
            let encoded = code.encode(b"dyn").unwrap();
            assert_eq!(code.decode(&encoded).unwrap(), b"dyn");
        }
    }
}
