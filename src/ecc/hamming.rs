//! Hamming block codec.
//!
//! Hamming codes are a family of linear error-correcting codes developed by Richard Hamming in 1950.
//! A block of `n` bits carries parity (control) bits at the power-of-two positions and payload
//! (data) bits everywhere else. Each control bit is the parity of every position whose 1-indexed
//! number has that power of two set, so a single flipped bit makes exactly the checks that cover
//! it fail, and the sum of the failing control positions is the position of the flipped bit.
//!
//! Layout used here, for a block size `n` between [`MIN_BLOCK_SIZE`] and [`MAX_BLOCK_SIZE`]:
//!
//! - positions `1, 2, 4, ...` strictly below `n` are control bits;
//! - positions `3..=n` that are not powers of two are data bits;
//! - when `n` is itself a power of two, position `n` is reserved: it is written as zero, no
//!   parity group covers it and it is never part of the decoded output.
//!
//! With `n = 8` the block carries 4 data bits (positions 3, 5, 6 and 7) and 3 control bits.
//!
//! Only one flipped bit per block can be corrected. Two or more flipped bits produce a syndrome
//! that points at the wrong position (or past the end of the block); this is not detected.

use crate::bitio::{empty_buffer, BitBuffer, BUFFER_BITS};
use crate::error::{Error, Result};
use std::iter::successors;

/// Smallest block size with at least one data bit.
pub const MIN_BLOCK_SIZE: usize = 3;

/// Largest block size the fixed working buffer can hold.
pub const MAX_BLOCK_SIZE: usize = BUFFER_BITS;

/// Block size used when the caller does not pick one.
pub const DEFAULT_BLOCK_SIZE: usize = 8;

/// Upper bound on the number of control bits in a block.
pub const MAX_CONTROL_BITS: usize = (usize::BITS - (MAX_BLOCK_SIZE - 1).leading_zeros()) as usize;

/// One codeword. Position `p` (1-indexed) lives at index `p - 1`.
pub type Block = BitBuffer;

/// Outcome of checking a received block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Every control bit matched.
    Clean,
    /// The bit at this position was flipped back.
    Corrected(usize),
    /// The syndrome points past the end of the block, so more than one bit is wrong.
    /// Nothing was flipped.
    Unlocatable(usize),
}

/// A Hamming code over blocks of a fixed number of bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HammingCode {
    /// Total bits per block, control bits included
    block_size: usize,
    /// Number of data positions per block
    data_bits: usize,
}

impl Default for HammingCode {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            data_bits: count_data_positions(DEFAULT_BLOCK_SIZE),
        }
    }
}

impl HammingCode {
    /// Creates a Hamming code with `block_size` bits per block.
    ///
    /// # Arguments
    ///
    /// * `block_size` - Bits per encoded block, control bits included
    ///
    /// # Returns
    ///
    /// A new `HammingCode`, or [`Error::InvalidBlockSize`] unless
    /// `MIN_BLOCK_SIZE <= block_size <= MAX_BLOCK_SIZE`.
    pub fn new(block_size: usize) -> Result<Self> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(Error::InvalidBlockSize {
                size: block_size,
                min: MIN_BLOCK_SIZE,
                max: MAX_BLOCK_SIZE,
            });
        }

        Ok(HammingCode {
            block_size,
            data_bits: count_data_positions(block_size),
        })
    }

    /// Total bits per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Data bits carried by one full block.
    pub fn data_bits(&self) -> usize {
        self.data_bits
    }

    /// Control bits carried by one full block.
    pub fn parity_bits(&self) -> usize {
        self.control_positions().count()
    }

    /// Fraction of each block that is payload.
    pub fn code_rate(&self) -> f64 {
        self.data_bits as f64 / self.block_size as f64
    }

    /// Whether `pos` holds a control bit.
    pub fn is_control(&self, pos: usize) -> bool {
        pos < self.block_size && pos.is_power_of_two()
    }

    /// Whether `pos` holds a data bit.
    pub fn is_data(&self, pos: usize) -> bool {
        is_data_position(pos) && pos <= self.block_size
    }

    /// Control positions in increasing order.
    pub fn control_positions(&self) -> impl Iterator<Item = usize> {
        let n = self.block_size;
        successors(Some(1usize), |&c| Some(c * 2)).take_while(move |&c| c < n)
    }

    /// Data positions in increasing order.
    pub fn data_positions(&self) -> impl Iterator<Item = usize> {
        (MIN_BLOCK_SIZE..=self.block_size).filter(|&pos| is_data_position(pos))
    }

    /// Number of encoded bytes produced for `input_bytes` bytes of payload.
    pub fn encoded_len(&self, input_bytes: usize) -> usize {
        let bits = input_bytes * 8;
        let blocks = bits / self.data_bits;
        let tail = bits % self.data_bits;
        (blocks * self.block_size + tail).div_ceil(8)
    }

    /// Fills the control positions of `block` from its data positions.
    ///
    /// Control positions and the reserved position are cleared first.
    pub fn encode_block(&self, block: &mut Block) {
        for c in self.control_positions() {
            set_bit(block, c, false);
        }
        if self.block_size.is_power_of_two() {
            set_bit(block, self.block_size, false);
        }
        self.compute_control_bits(block);
    }

    /// XORs the parity of every control group into its control position.
    ///
    /// For control position `c` the group is the runs of `c` positions starting at `c`,
    /// `3c`, `5c`, ... (check `c`, skip `c`), clamped to the block size. Control positions
    /// must be zero on entry for the result to be the group parity.
    pub fn compute_control_bits(&self, block: &mut Block) {
        let n = self.block_size;
        for c in self.control_positions() {
            let mut start = c;
            while start <= n {
                let end = (start + c - 1).min(n);
                for v in start..=end {
                    if bit(block, v) {
                        flip_bit(block, c);
                    }
                }
                start += 2 * c;
            }
        }
    }

    /// Checks a received block and flips the single bit the syndrome points at.
    ///
    /// On return the data positions hold the corrected payload; control positions hold
    /// the recomputed parity, not the received values.
    pub fn correct_block(&self, block: &mut Block) -> Correction {
        let mut received = [false; MAX_CONTROL_BITS];
        for (slot, c) in self.control_positions().enumerate() {
            received[slot] = bit(block, c);
            set_bit(block, c, false);
        }

        self.compute_control_bits(block);

        let syndrome: usize = self
            .control_positions()
            .enumerate()
            .filter(|&(slot, c)| bit(block, c) != received[slot])
            .map(|(_, c)| c)
            .sum();

        match syndrome {
            0 => Correction::Clean,
            pos if pos <= self.block_size => {
                flip_bit(block, pos);
                Correction::Corrected(pos)
            }
            pos => Correction::Unlocatable(pos),
        }
    }

    /// Builds a block from data bits, in data-position order.
    ///
    /// Missing data bits are zero; extra ones are ignored.
    pub fn block_from_data<I>(&self, data: I) -> Block
    where
        I: IntoIterator<Item = bool>,
    {
        let mut block = empty_buffer();
        for (pos, value) in self.data_positions().zip(data) {
            set_bit(&mut block, pos, value);
        }
        self.encode_block(&mut block);
        block
    }

    /// Data bits of `block`, in data-position order.
    pub fn data_of<'a>(&self, block: &'a Block) -> impl Iterator<Item = bool> + 'a {
        self.data_positions().map(move |pos| bit(block, pos))
    }
}

/// Reads the bit at 1-indexed position `pos`.
pub fn bit(block: &Block, pos: usize) -> bool {
    block[pos - 1]
}

/// Writes the bit at 1-indexed position `pos`.
pub fn set_bit(block: &mut Block, pos: usize, value: bool) {
    block.set(pos - 1, value);
}

/// Inverts the bit at 1-indexed position `pos`.
pub fn flip_bit(block: &mut Block, pos: usize) {
    let value = bit(block, pos);
    set_bit(block, pos, !value);
}

fn is_data_position(pos: usize) -> bool {
    pos >= MIN_BLOCK_SIZE && !pos.is_power_of_two()
}

fn count_data_positions(block_size: usize) -> usize {
    (MIN_BLOCK_SIZE..=block_size)
        .filter(|&pos| is_data_position(pos))
        .count()
}
