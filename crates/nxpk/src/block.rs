//! Decoder for the LZ4-style block format (compression flag 2).
//!
//! A block is a bare sequence stream: no frame header, no stored output
//! size. Each sequence is
//!
//! ```text
//! token | [literal length bytes] | literals | offset (u16 LE) | [match length bytes]
//! ```
//!
//! where the token's high nibble is the literal length and its low nibble
//! the match length minus [`MIN_MATCH`]. A nibble of 15 continues into
//! extension bytes that are summed until one is below 255. The last sequence
//! carries literals only.

use nxpk_common::BinaryReader;

use crate::{Error, Result};

/// Shortest back-reference the format can express.
pub const MIN_MATCH: usize = 4;

/// Nibble value that continues a length into extension bytes.
const LENGTH_EXTENDED: usize = 0x0F;

/// Upper bound for trusting a caller's size hint when pre-allocating.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

/// Decompress one block.
///
/// `size_hint` is only used to pre-size the output and may be wrong; the
/// output grows as needed.
///
/// The stream may end at any sequence boundary, including straight after a
/// match or before the first token. Empty input decodes to an empty buffer.
pub fn decompress_block(src: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut reader = BinaryReader::new(src);
    let mut dst = Vec::with_capacity(size_hint.min(MAX_PREALLOC));

    while !reader.is_empty() {
        let token = reader
            .read_u8()
            .map_err(|_| Error::corrupt(reader.position(), "missing token"))?;

        let literal_len = read_length(&mut reader, usize::from(token >> 4))?;
        let literals = reader.read_bytes(literal_len).map_err(|_| {
            Error::corrupt(
                reader.position(),
                format!(
                    "literal run of {literal_len} bytes but only {} remain",
                    reader.remaining()
                ),
            )
        })?;
        dst.extend_from_slice(literals);

        let match_nibble = usize::from(token & 0x0F);
        match reader.remaining() {
            0 if match_nibble == 0 => break,
            0 => {
                return Err(Error::corrupt(
                    reader.position(),
                    "input ends where a match offset is required",
                ))
            }
            1 => {
                return Err(Error::corrupt(
                    reader.position(),
                    "match offset truncated to one byte",
                ))
            }
            _ => {}
        }

        let offset_position = reader.position();
        let offset = usize::from(reader.read_u16()?);
        if offset == 0 {
            return Err(Error::corrupt(offset_position, "match offset is zero"));
        }
        if offset > dst.len() {
            return Err(Error::corrupt(
                offset_position,
                format!(
                    "match offset {offset} reaches before the {} bytes decoded so far",
                    dst.len()
                ),
            ));
        }

        let match_len = read_length(&mut reader, match_nibble)? + MIN_MATCH;
        copy_match(&mut dst, offset, match_len);
    }

    Ok(dst)
}

/// Decode a token nibble plus its extension bytes.
fn read_length(reader: &mut BinaryReader<'_>, nibble: usize) -> Result<usize> {
    if nibble != LENGTH_EXTENDED {
        return Ok(nibble);
    }

    let mut length = nibble;
    loop {
        let byte = reader
            .read_u8()
            .map_err(|_| Error::corrupt(reader.position(), "input ends inside a length"))?;
        length = length
            .checked_add(usize::from(byte))
            .ok_or_else(|| Error::corrupt(reader.position(), "length overflows"))?;
        if byte != 0xFF {
            return Ok(length);
        }
    }
}

/// Append `len` bytes copied from `offset` bytes behind the write position.
///
/// The source may overlap the bytes being written (offset < len), so each
/// byte is read only after the previous one has been pushed.
fn copy_match(dst: &mut Vec<u8>, offset: usize, len: usize) {
    dst.reserve(len);
    for _ in 0..len {
        let byte = dst[dst.len() - offset];
        dst.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write a length remainder using the extension-byte scheme.
    fn push_extension(out: &mut Vec<u8>, mut rest: usize) {
        while rest >= 0xFF {
            out.push(0xFF);
            rest -= 0xFF;
        }
        out.push(rest as u8);
    }

    /// Minimal encoder: emits one sequence per call.
    fn push_sequence(out: &mut Vec<u8>, literals: &[u8], matched: Option<(u16, usize)>) {
        let lit_nibble = literals.len().min(LENGTH_EXTENDED);
        let match_nibble = matched
            .map(|(_, len)| (len - MIN_MATCH).min(LENGTH_EXTENDED))
            .unwrap_or(0);
        out.push(((lit_nibble as u8) << 4) | match_nibble as u8);
        if lit_nibble == LENGTH_EXTENDED {
            push_extension(out, literals.len() - LENGTH_EXTENDED);
        }
        out.extend_from_slice(literals);
        if let Some((offset, len)) = matched {
            out.extend_from_slice(&offset.to_le_bytes());
            if match_nibble == LENGTH_EXTENDED {
                push_extension(out, len - MIN_MATCH - LENGTH_EXTENDED);
            }
        }
    }

    fn corrupt_reason(src: &[u8]) -> String {
        match decompress_block(src, 0) {
            Err(Error::CorruptBlock { reason, .. }) => reason,
            other => panic!("expected CorruptBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_literals_only() {
        let mut src = Vec::new();
        push_sequence(&mut src, b"hello", None);
        assert_eq!(decompress_block(&src, 5).unwrap(), b"hello");
    }

    #[test]
    fn test_extended_literal_and_overlapping_match() {
        let literals = b"abcdefghijklmnopqrst";
        let mut src = Vec::new();
        push_sequence(&mut src, literals, Some((3, 10)));
        push_sequence(&mut src, b"XYZ", None);

        // 15 + 5 literal length, match nibble 6
        assert_eq!(&src[..2], &[0xF6, 0x05]);

        let mut expected = literals.to_vec();
        expected.extend_from_slice(b"rstrstrstr");
        expected.extend_from_slice(b"XYZ");

        let first = decompress_block(&src, 0).unwrap();
        let second = decompress_block(&src, expected.len()).unwrap();
        assert_eq!(first, expected);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stream_may_end_after_match() {
        let mut src = Vec::new();
        push_sequence(&mut src, b"ab", Some((2, 6)));
        assert_eq!(decompress_block(&src, 0).unwrap(), b"abababab");
    }

    #[test]
    fn test_no_trailing_literal_sequence() {
        // Final sequence is literals "ab" plus a 4-byte match at offset 2,
        // with no literal-only sequence after it.
        let src = [0x20, b'a', b'b', 0x02, 0x00];
        assert_eq!(decompress_block(&src, 0).unwrap(), b"ababab");
        assert_eq!(decompress_block(&src[..3], 0).unwrap(), b"ab");
    }

    #[test]
    fn test_offset_one_run() {
        let mut src = Vec::new();
        push_sequence(&mut src, b"z", Some((1, 300)));
        push_sequence(&mut src, b".", None);

        let out = decompress_block(&src, 0).unwrap();
        assert_eq!(out.len(), 302);
        assert!(out[..301].iter().all(|&b| b == b'z'));
        assert_eq!(out[301], b'.');
    }

    #[test]
    fn test_multi_byte_extension() {
        let literals: Vec<u8> = (0..273u32).map(|i| (i % 251) as u8).collect();
        let mut src = Vec::new();
        push_sequence(&mut src, &literals, None);

        // 15 + 255 + 3
        assert_eq!(&src[..3], &[0xF0, 0xFF, 0x03]);
        assert_eq!(decompress_block(&src, 0).unwrap(), literals);
    }

    #[test]
    fn test_empty_input() {
        assert!(decompress_block(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_offset() {
        assert_eq!(corrupt_reason(&[0x10, b'a', 0x00, 0x00]), "match offset is zero");
    }

    #[test]
    fn test_truncated_literals() {
        let reason = corrupt_reason(&[0x50, b'a', b'b']);
        assert!(reason.starts_with("literal run of 5 bytes"), "{reason}");
    }

    #[test]
    fn test_one_byte_offset() {
        assert_eq!(
            corrupt_reason(&[0x10, b'a', 0x01]),
            "match offset truncated to one byte"
        );
    }

    #[test]
    fn test_pending_match_at_end() {
        assert_eq!(
            corrupt_reason(&[0x11, b'a']),
            "input ends where a match offset is required"
        );
    }

    #[test]
    fn test_truncated_length() {
        assert_eq!(corrupt_reason(&[0xF0]), "input ends inside a length");
        assert_eq!(corrupt_reason(&[0xF0, 0xFF]), "input ends inside a length");
    }

    #[test]
    fn test_offset_before_start() {
        let reason = corrupt_reason(&[0x10, b'a', 0x05, 0x00]);
        assert!(reason.contains("reaches before"), "{reason}");
    }

    #[test]
    fn test_error_position() {
        match decompress_block(&[0x20, b'x', b'y', 0x00, 0x00], 0) {
            Err(Error::CorruptBlock { position, .. }) => assert_eq!(position, 3),
            other => panic!("expected CorruptBlock, got {:?}", other),
        }
    }
}
