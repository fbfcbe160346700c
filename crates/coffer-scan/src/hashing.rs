//! Hashing stream wrapper: tees bytes read from an inner reader into a
//! SHA-1 accumulator so a single pass over a file can simultaneously feed
//! a consumer (the tar body writer) and produce its content print.

use std::io::{self, Read};

use sha1::{Digest, Sha1};

/// Wraps a readable byte source, updating an internal SHA-1 accumulator
/// for every non-empty chunk returned by `read`.
///
/// The digest is only meaningful once [`HashingReader::finalize`] is
/// called after the wrapped reader has yielded EOF (an empty read). Calling
/// it earlier returns `None` — callers must treat that as a contract
/// violation, log it, and fall back to an independent reopen + rehash.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha1,
    eof_reached: bool,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    /// Wrap `inner`, ready to tee every read chunk into a fresh SHA-1 state.
    pub fn new(inner: R) -> Self {
        Self { inner, hasher: Sha1::new(), eof_reached: false, bytes_read: 0 }
    }

    /// Whether the wrapped reader has yielded its end-of-stream marker.
    pub fn eof_reached(&self) -> bool {
        self.eof_reached
    }

    /// Total bytes yielded by `read` so far, independent of EOF/digest
    /// state — used to cross-check a declared size against what was
    /// actually streamed.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the wrapper and return the accumulated digest, or `None` if
    /// EOF was never reached.
    pub fn finalize(self) -> Option<[u8; 20]> {
        if !self.eof_reached {
            return None;
        }
        Some(self.hasher.finalize().into())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.eof_reached = true;
        } else {
            self.hasher.update(&buf[..n]);
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn digest_unavailable_before_eof() {
        let mut reader = HashingReader::new(Cursor::new(b"hello".to_vec()));
        let mut buf = [0u8; 2];
        let _ = reader.read(&mut buf).unwrap();
        assert!(!reader.eof_reached());
        assert!(reader.finalize().is_none());
    }

    #[test]
    fn digest_matches_sha1_after_full_read() {
        let mut reader = HashingReader::new(Cursor::new(b"hello\n".to_vec()));
        let mut out = Vec::new();
        io::copy(&mut reader, &mut out).unwrap();
        assert!(reader.eof_reached());
        let digest = reader.finalize().unwrap();
        assert_eq!(hex::encode(digest), "f572d396fae9206628714fb2ce00f72e94f2258f");
    }
}
