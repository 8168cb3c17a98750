//! Stream driver: runs the block codec over a whole byte stream.
//!
//! Encoded stream layout:
//!
//! ```text
//! | block | block | ... | block | raw tail | zero padding |
//! ```
//!
//! Every block is `block_size` bits produced by [`HammingCode::encode_block`]. Data bits
//! that do not fill a last block are written as they are, without control bits (the raw
//! tail), and the stream is padded with zero bits to a byte boundary.
//!
//! The decoder cannot see where the blocks stop and the tail starts, but it knows the
//! original data was a whole number of bytes. Once the source has no bytes left beyond the
//! current one, the number of bits still unread is known exactly, and only one split of
//! those bits into blocks, tail and padding gives a whole number of payload bytes.

use super::hamming::{bit, set_bit, Block, Correction, HammingCode};
use crate::bitio::{empty_buffer, BitReader, BitWriter};
use crate::error::Result;
use log::{debug, trace, warn};
use std::io::{BufRead, Write};

/// What an encode run produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Full Hamming blocks written
    pub blocks: usize,
    /// Data bits written raw after the last block
    pub tail_bits: usize,
}

/// What a decode run found.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Full Hamming blocks decoded
    pub blocks: usize,
    /// Blocks in which one bit was flipped back
    pub corrected: usize,
    /// Blocks whose syndrome pointed past the end of the block
    pub unlocatable: usize,
    /// Raw data bits decoded after the last block
    pub tail_bits: usize,
}

/// Encodes everything `input` yields into `output`.
///
/// # Arguments
///
/// * `code` - Block layout to encode with
/// * `input` - Source of the data bytes
/// * `output` - Sink for the encoded stream, flushed before returning
///
/// # Returns
///
/// The number of blocks and raw tail bits written, or [`Error::Io`](crate::Error::Io)
/// if either stream fails.
pub fn encode<R: BufRead, W: Write>(
    code: &HammingCode,
    input: R,
    output: W,
) -> Result<EncodeSummary> {
    let mut reader = BitReader::new(input);
    let mut writer = BitWriter::new(output);
    let mut summary = EncodeSummary::default();

    debug!(
        "encoding with {} bit blocks ({} data bits each)",
        code.block_size(),
        code.data_bits()
    );

    'blocks: loop {
        let mut block = empty_buffer();
        let mut filled = 0;

        for pos in code.data_positions() {
            match reader.pop()? {
                Some(value) => {
                    set_bit(&mut block, pos, value);
                    filled += 1;
                }
                None => {
                    // Short last block: data bits only
                    for pos in code.data_positions().take(filled) {
                        writer.push(bit(&block, pos))?;
                    }
                    summary.tail_bits = filled;
                    break 'blocks;
                }
            }
        }

        code.encode_block(&mut block);
        for pos in 1..=code.block_size() {
            writer.push(bit(&block, pos))?;
        }
        summary.blocks += 1;
    }

    writer.flush()?;
    debug!(
        "encoded {} blocks and {} tail bits",
        summary.blocks, summary.tail_bits
    );
    Ok(summary)
}

/// Decodes everything `input` yields into `output`, correcting one bit per block.
///
/// # Arguments
///
/// * `code` - Block layout the stream was encoded with
/// * `input` - Source of the encoded stream
/// * `output` - Sink for the decoded bytes, flushed before returning
///
/// # Returns
///
/// Block, correction and tail counts, or [`Error::Io`](crate::Error::Io) if either
/// stream fails.
pub fn decode<R: BufRead, W: Write>(
    code: &HammingCode,
    input: R,
    output: W,
) -> Result<DecodeSummary> {
    let n = code.block_size();
    let mut reader = BitReader::new(input);
    let mut writer = BitWriter::new(output);
    let mut summary = DecodeSummary::default();

    debug!(
        "decoding with {} bit blocks ({} data bits each)",
        n,
        code.data_bits()
    );

    loop {
        let mut block = empty_buffer();
        let read = read_block(&mut reader, &mut block, n)?;
        if read == 0 {
            break;
        }
        if read == n && !reader.source_exhausted()? {
            decode_block(code, &mut block, &mut writer, &mut summary)?;
            continue;
        }

        // Everything left is `block` plus the rest of the current byte
        let available = read + reader.remaining_bits();
        finish(
            code,
            block,
            read,
            available,
            &mut reader,
            &mut writer,
            &mut summary,
        )?;
        break;
    }

    let dropped = writer.flush_whole_bytes()?;
    if dropped > 0 {
        warn!("dropped {} trailing bits that do not form a byte", dropped);
    }
    debug!(
        "decoded {} blocks ({} corrected, {} unlocatable) and {} tail bits",
        summary.blocks, summary.corrected, summary.unlocatable, summary.tail_bits
    );
    Ok(summary)
}

/// Splits the last `available` bits of an encoded stream into full blocks, raw tail
/// bits and padding, given `pending` payload bits already written past a byte boundary.
///
/// Returns `(blocks, tail_bits)`, or `None` when no split yields whole payload bytes.
pub fn plan_tail(code: &HammingCode, available: usize, pending: usize) -> Option<(usize, usize)> {
    let (n, k) = (code.block_size(), code.data_bits());

    (0..=available / n).find_map(|blocks| {
        let rest = available - blocks * n;
        let wanted = (8 - (pending + blocks * k) % 8) % 8;
        // Padding is at most 7 bits, so the tail lies in `lo..=rest`
        let lo = rest.saturating_sub(7);
        let tail = lo + (wanted + 8 - lo % 8) % 8;
        (tail <= rest && tail < k).then_some((blocks, tail))
    })
}

/// Reads up to `n` bits into positions `1..=n` of `block`.
fn read_block<R: BufRead>(reader: &mut BitReader<R>, block: &mut Block, n: usize) -> Result<usize> {
    for pos in 1..=n {
        match reader.pop()? {
            Some(value) => set_bit(block, pos, value),
            None => return Ok(pos - 1),
        }
    }
    Ok(n)
}

fn decode_block<W: Write>(
    code: &HammingCode,
    block: &mut Block,
    writer: &mut BitWriter<W>,
    summary: &mut DecodeSummary,
) -> Result<()> {
    match code.correct_block(block) {
        Correction::Clean => {}
        Correction::Corrected(pos) => {
            trace!("block {}: flipped bit {}", summary.blocks, pos);
            summary.corrected += 1;
        }
        Correction::Unlocatable(syndrome) => {
            warn!(
                "block {}: syndrome {} is outside the block, multiple bits are corrupt",
                summary.blocks, syndrome
            );
            summary.unlocatable += 1;
        }
    }

    for value in code.data_of(block) {
        writer.push(value)?;
    }
    summary.blocks += 1;
    Ok(())
}

/// Decodes the final stretch of the stream, starting with the `read` bits in `block`.
fn finish<R: BufRead, W: Write>(
    code: &HammingCode,
    mut block: Block,
    read: usize,
    available: usize,
    reader: &mut BitReader<R>,
    writer: &mut BitWriter<W>,
    summary: &mut DecodeSummary,
) -> Result<()> {
    let n = code.block_size();

    let Some((blocks, tail)) = plan_tail(code, available, writer.pending_bits()) else {
        warn!(
            "last {} bits do not match any block/tail split, copying them raw",
            available
        );
        for pos in 1..=read {
            writer.push(bit(&block, pos))?;
        }
        while let Some(value) = reader.pop()? {
            writer.push(value)?;
        }
        summary.tail_bits += available;
        return Ok(());
    };

    trace!(
        "last {} bits: {} blocks, {} tail bits, {} padding bits",
        available,
        blocks,
        tail,
        available - blocks * n - tail
    );

    if blocks == 0 {
        // The tail is shorter than a block, so it is all inside `block`
        for pos in 1..=tail {
            writer.push(bit(&block, pos))?;
        }
    } else {
        decode_block(code, &mut block, writer, summary)?;
        for _ in 1..blocks {
            let mut next = empty_buffer();
            read_block(reader, &mut next, n)?;
            decode_block(code, &mut next, writer, summary)?;
        }
        for _ in 0..tail {
            if let Some(value) = reader.pop()? {
                writer.push(value)?;
            }
        }
    }
    summary.tail_bits += tail;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::hamming::MAX_BLOCK_SIZE;
    use crate::error::Error;
    use std::io::{self, BufReader, Read, Write};

    /// Source that fails with `Interrupted` on every other read.
    struct Stuttering<'a> {
        data: &'a [u8],
        calls: usize,
    }

    impl Read for Stuttering<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 1 {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            self.data.read(buf)
        }
    }

    fn stuttering(data: &[u8]) -> BufReader<Stuttering<'_>> {
        BufReader::with_capacity(1, Stuttering { data, calls: 0 })
    }

    /// Source or sink that always fails.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn encode_vec(code: &HammingCode, data: &[u8]) -> (Vec<u8>, EncodeSummary) {
        let mut out = Vec::new();
        let summary = encode(code, data, &mut out).unwrap();
        (out, summary)
    }

    fn decode_vec(code: &HammingCode, data: &[u8]) -> (Vec<u8>, DecodeSummary) {
        let mut out = Vec::new();
        let summary = decode(code, data, &mut out).unwrap();
        (out, summary)
    }

    #[test]
    fn test_scenario_b4() {
        let code = HammingCode::new(8).unwrap();
        let (encoded, summary) = encode_vec(&code, &[0xB4]);
        assert_eq!(encoded, vec![0x66, 0x98]);
        assert_eq!(
            summary,
            EncodeSummary {
                blocks: 2,
                tail_bits: 0
            }
        );

        let (decoded, summary) = decode_vec(&code, &encoded);
        assert_eq!(decoded, vec![0xB4]);
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.corrected, 0);
    }

    #[test]
    fn test_scenario_b4_single_flip() {
        let code = HammingCode::new(8).unwrap();
        let (encoded, _) = encode_vec(&code, &[0xB4]);

        for bit_index in 0..encoded.len() * 8 {
            let mut corrupted = encoded.clone();
            corrupted[bit_index / 8] ^= 0x80 >> (bit_index % 8);

            let (decoded, _) = decode_vec(&code, &corrupted);
            assert_eq!(decoded, vec![0xB4], "flipped stream bit {}", bit_index);
        }
    }

    #[test]
    fn test_empty_streams() {
        let code = HammingCode::default();
        assert_eq!(encode_vec(&code, &[]).0, Vec::<u8>::new());
        assert_eq!(decode_vec(&code, &[]).0, Vec::<u8>::new());
    }

    #[test]
    fn test_raw_tail() {
        // 8 bits do not fill the 11 data positions of a 16 bit block
        let code = HammingCode::new(16).unwrap();
        let (encoded, summary) = encode_vec(&code, &[0x5A]);
        assert_eq!(encoded, vec![0x5A]);
        assert_eq!(
            summary,
            EncodeSummary {
                blocks: 0,
                tail_bits: 8
            }
        );

        let (decoded, summary) = decode_vec(&code, &encoded);
        assert_eq!(decoded, vec![0x5A]);
        assert_eq!(summary.blocks, 0);
        assert_eq!(summary.tail_bits, 8);
    }

    #[test]
    fn test_block_then_tail() {
        // 16 data bits over 11 bit payloads: one block and a 5 bit tail
        let code = HammingCode::new(16).unwrap();
        let (encoded, summary) = encode_vec(&code, &[0xC3, 0x3C]);
        assert_eq!(
            summary,
            EncodeSummary {
                blocks: 1,
                tail_bits: 5
            }
        );
        assert_eq!(encoded.len(), code.encoded_len(2));

        let (decoded, summary) = decode_vec(&code, &encoded);
        assert_eq!(decoded, vec![0xC3, 0x3C]);
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.tail_bits, 5);
    }

    #[test]
    fn test_small_blocks_share_last_byte() {
        // Several 3 bit blocks end inside the final byte
        let code = HammingCode::new(3).unwrap();
        let (encoded, summary) = encode_vec(&code, &[0x81]);
        assert_eq!(summary.blocks, 8);
        assert_eq!(encoded.len(), 3);

        let (decoded, summary) = decode_vec(&code, &encoded);
        assert_eq!(decoded, vec![0x81]);
        assert_eq!(summary.blocks, 8);
        assert_eq!(summary.tail_bits, 0);
    }

    #[test]
    fn test_round_trip_all_block_sizes() {
        let data: Vec<u8> = (0..=255u8).rev().chain(b"hamming".iter().copied()).collect();
        for size in 3..=MAX_BLOCK_SIZE {
            let code = HammingCode::new(size).unwrap();
            for len in [0, 1, 2, 3, 5, 9, 10, 11, 17, data.len()] {
                let input = &data[..len];
                let (encoded, _) = encode_vec(&code, input);
                assert_eq!(encoded.len(), code.encoded_len(len));
                let (decoded, _) = decode_vec(&code, &encoded);
                assert_eq!(decoded, input, "block size {} length {}", size, len);
            }
        }
    }

    #[test]
    fn test_corrections_counted() {
        let code = HammingCode::new(12).unwrap();
        let input = b"correct me";
        let (mut encoded, summary) = encode_vec(&code, input);
        assert_eq!(summary.blocks, 10);

        // One flip in the first block, one in the third
        encoded[0] ^= 0x10;
        encoded[3] ^= 0x01;

        let (decoded, summary) = decode_vec(&code, &encoded);
        assert_eq!(decoded, input);
        assert_eq!(summary.corrected, 2);
        assert_eq!(summary.unlocatable, 0);
    }

    #[test]
    fn test_plan_tail() {
        let code = HammingCode::new(8).unwrap();
        // A lone block closing a byte
        assert_eq!(plan_tail(&code, 8, 4), Some((1, 0)));

        let code = HammingCode::new(16).unwrap();
        assert_eq!(plan_tail(&code, 8, 0), Some((0, 8)));
        // 5 tail bits after 11 payload bits, then 3 padding bits
        assert_eq!(plan_tail(&code, 8, 3), Some((0, 5)));

        let code = HammingCode::new(3).unwrap();
        assert_eq!(plan_tail(&code, 9, 5), Some((3, 0)));
        // One payload bit past a byte boundary and no block to complete the byte
        assert_eq!(plan_tail(&code, 2, 1), None);
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let input = [0xB4u8, 0x01, 0x02];
        for size in [3, 8, 13] {
            let code = HammingCode::new(size).unwrap();
            let mut encoded = Vec::new();
            encode(&code, stuttering(&input), &mut encoded).unwrap();
            assert_eq!(encoded, encode_vec(&code, &input).0);

            let mut decoded = Vec::new();
            decode(&code, stuttering(&encoded), &mut decoded).unwrap();
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn test_stream_errors_abort() {
        let code = HammingCode::default();

        assert!(matches!(
            encode(&code, &[0xB4u8][..], Broken),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert!(matches!(
            decode(&code, &[0x66u8, 0x98][..], Broken),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));

        let mut out = Vec::new();
        assert!(matches!(
            encode(&code, BufReader::new(Broken), &mut out),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::Other
        ));
        assert!(matches!(
            decode(&code, BufReader::new(Broken), &mut out),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::Other
        ));
    }
}
