//! The compression stage: LZMA via `xz2`, wrapping the tar byte stream on
//! the way in and unwrapping it on the way out.

use std::io::{BufReader, Read, Write};

use coffer_core::crypto::DEFAULT_COMPRESSION_LEVEL;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Wrap `inner` so every byte written to the returned writer is LZMA
/// compressed at `level` before reaching `inner`.
pub fn compressing_writer_at_level<W: Write>(inner: W, level: u32) -> XzEncoder<W> {
    XzEncoder::new(inner, level)
}

/// [`compressing_writer_at_level`] at the default compression level.
pub fn compressing_writer<W: Write>(inner: W) -> XzEncoder<W> {
    compressing_writer_at_level(inner, DEFAULT_COMPRESSION_LEVEL)
}

/// Wrap `inner` so every byte read from the returned reader is the LZMA
/// decompression of `inner`'s bytes.
pub fn decompressing_reader<R: Read>(inner: R) -> XzDecoder<BufReader<R>> {
    XzDecoder::new(BufReader::new(inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut compressed = Vec::new();
        {
            let mut w = compressing_writer(&mut compressed);
            w.write_all(b"the quick brown fox jumps over the lazy dog").unwrap();
            w.finish().unwrap();
        }
        let mut r = decompressing_reader(compressed.as_slice());
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"the quick brown fox jumps over the lazy dog");
    }
}
