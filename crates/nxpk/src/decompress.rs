//! Decompression dispatch for NXPK entries.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::{trace, warn};

use crate::block::decompress_block;
use crate::format::CompressionFlag;
use crate::{Error, Result};

/// Decompress a zlib stream.
///
/// Any inflate failure is reported as [`Error::CorruptBlock`] at the
/// position the decoder had consumed up to.
pub fn decompress_deflate(data: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut decoder = ZlibDecoder::new(data);

    output.clear();
    decoder.read_to_end(output).map_err(|e| Error::CorruptBlock {
        position: decoder.total_in() as usize,
        reason: format!("inflate failed: {e}"),
    })?;

    Ok(())
}

/// Decompress a zlib stream with a known output size.
pub fn decompress_deflate_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size.min(data.len().saturating_mul(8)));
    decompress_deflate(data, &mut output)?;
    Ok(output)
}

/// Turn stored entry bytes into their original content.
///
/// `original_length` only sizes buffers; a mismatch is logged, not enforced.
pub fn decompress_entry(
    flag: CompressionFlag,
    data: &[u8],
    original_length: usize,
) -> Result<Vec<u8>> {
    trace!("{} bytes, flag {:?}", data.len(), flag);

    let output = match flag {
        CompressionFlag::Stored => data.to_vec(),
        CompressionFlag::Deflate => decompress_deflate_sized(data, original_length)?,
        CompressionFlag::Block => decompress_block(data, original_length)?,
        CompressionFlag::Unknown(raw) => {
            warn!("unknown compression flag {raw}, passing data through");
            data.to_vec()
        }
    };

    if output.len() != original_length {
        warn!(
            "decompressed size {} differs from recorded size {}",
            output.len(),
            original_length
        );
    }

    Ok(output)
}
