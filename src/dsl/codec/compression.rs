//! Transparent decompression of `.dsl.dz` sources.
//!
//! Dictzip files are ordinary gzip streams with an extra header field, so a
//! multi-member gzip decoder reads them. Anything without the gzip magic is
//! passed through untouched.

use std::io::{BufRead, BufReader, Read};

use flate2::bufread::MultiGzDecoder;
use log::debug;

use crate::dsl::types::error::Result;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Wraps `reader` in a gzip decoder if it starts with the gzip magic bytes.
///
/// Offsets reported by the scanner always refer to the stream returned here,
/// i.e. to decompressed bytes.
pub fn open_stream<R: Read + Send + 'static>(reader: R) -> Result<Box<dyn Read + Send>> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        debug!("Gzip magic found, reading through dictzip/gzip decoder");
        Ok(Box::new(MultiGzDecoder::new(buffered)))
    } else {
        Ok(Box::new(buffered))
    }
}
