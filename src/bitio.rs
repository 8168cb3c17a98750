//! Bit-level I/O over byte streams.
//!
//! [`BitReader`] and [`BitWriter`] let the codec treat a byte-oriented stream as a
//! continuous sequence of bits, most significant bit first, independent of how the
//! block boundaries fall relative to the byte boundaries.

use bitvec::prelude::*;
use std::io::{self, BufRead, Write};

/// Size of the bounded working buffer in bytes.
pub const BUFFER_BYTES: usize = 10;

/// Number of bits the working buffer holds.
pub const BUFFER_BITS: usize = BUFFER_BYTES * 8;

/// Fixed-capacity, MSB-first bit buffer shared by the writer and the block codec.
pub type BitBuffer = BitArray<[u8; BUFFER_BYTES], Msb0>;

/// Returns an all-zero [`BitBuffer`].
pub fn empty_buffer() -> BitBuffer {
    BitArray::new([0; BUFFER_BYTES])
}

/// Pulls single bits out of a buffered byte source.
#[derive(Debug)]
pub struct BitReader<R: BufRead> {
    source: R,
    byte: u8,
    // invariant: `remaining <= 8`
    remaining: u8,
}

impl<R: BufRead> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            byte: 0,
            remaining: 0,
        }
    }

    /// Returns the next bit, or `None` once the source is exhausted.
    pub fn pop(&mut self) -> io::Result<Option<bool>> {
        if self.remaining == 0 {
            match self.next_byte()? {
                Some(byte) => {
                    self.byte = byte;
                    self.remaining = 8;
                }
                None => return Ok(None),
            }
        }
        self.remaining -= 1;
        Ok(Some((self.byte >> self.remaining) & 1 == 1))
    }

    /// Number of bits of the current byte not yet popped.
    pub fn remaining_bits(&self) -> usize {
        self.remaining as usize
    }

    /// Whether the source has no bytes left beyond the one currently being read.
    pub fn source_exhausted(&mut self) -> io::Result<bool> {
        loop {
            match self.source.fill_buf() {
                Ok(buf) => return Ok(buf.is_empty()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let byte = match self.source.fill_buf() {
                Ok(buf) => buf.first().copied(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if byte.is_some() {
                self.source.consume(1);
            }
            return Ok(byte);
        }
    }
}

/// Accumulates bits MSB-first and writes them to a byte sink.
///
/// Bits are staged in a [`BitBuffer`]; the buffer is written out whenever it
/// fills up, which always happens on a byte boundary.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    sink: W,
    buffer: BitBuffer,
    // invariant: `len < BUFFER_BITS` between calls
    len: usize,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buffer: empty_buffer(),
            len: 0,
        }
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: bool) -> io::Result<()> {
        self.buffer.set(self.len, bit);
        self.len += 1;
        if self.len == BUFFER_BITS {
            self.write_buffer(BUFFER_BYTES)?;
        }
        Ok(())
    }

    /// Bits pushed since the last byte boundary.
    pub fn pending_bits(&self) -> usize {
        self.len % 8
    }

    /// Writes everything pushed so far, zero-padding a trailing partial byte.
    pub fn flush(&mut self) -> io::Result<()> {
        self.write_buffer(self.len.div_ceil(8))?;
        self.sink.flush()
    }

    /// Writes every complete byte and drops a trailing partial byte.
    ///
    /// Returns the number of bits dropped.
    pub fn flush_whole_bytes(&mut self) -> io::Result<usize> {
        let dropped = self.pending_bits();
        self.write_buffer(self.len / 8)?;
        self.sink.flush()?;
        Ok(dropped)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn write_buffer(&mut self, bytes: usize) -> io::Result<()> {
        self.sink.write_all(&self.buffer.as_raw_slice()[..bytes])?;
        self.buffer = empty_buffer();
        self.len = 0;
        Ok(())
    }
}
