//! The encryption stage: a 4-byte magic, a random salt and IV, and an
//! AES-256-OFB ciphertext of whatever the previous stage produced. The key
//! is derived from the caller's password with PBKDF2-HMAC-SHA1.
//!
//! This is confidentiality only — there is no MAC, so a tampered or
//! truncated ciphertext decrypts to garbage rather than failing closed.
//! Adding authentication would need a new magic (`mob2`) to stay
//! distinguishable from envelopes already on disk.

use std::fmt;
use std::io::{self, Read, Write};

use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use coffer_core::crypto::CryptoParams;
use ofb::Ofb;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;

use crate::error::PipelineError;

type Cipher = Ofb<Aes256>;

fn derive_key(password: &[u8], salt: &[u8], params: &CryptoParams) -> Vec<u8> {
    let mut key = vec![0u8; params.key_len];
    pbkdf2_hmac::<Sha1>(password, salt, params.pbkdf2_iterations, &mut key);
    key
}

/// Wraps an output stream, writing the envelope header on construction and
/// encrypting every subsequent write in place.
pub struct EncryptingWriter<W: Write> {
    inner: W,
    cipher: Cipher,
}

impl<W: Write> EncryptingWriter<W> {
    /// Generate a fresh salt and IV, write the envelope header to `inner`,
    /// and derive the stream cipher from `password`.
    pub fn new(mut inner: W, password: &[u8]) -> Result<Self, PipelineError> {
        let params = CryptoParams::DEFAULT;
        let mut salt = vec![0u8; params.salt_len];
        let mut iv = vec![0u8; params.iv_len];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        inner.write_all(&params.magic)?;
        inner.write_all(&salt)?;
        inner.write_all(&iv)?;

        let key = derive_key(password, &salt, &params);
        let cipher = Cipher::new(key.as_slice().into(), iv.as_slice().into());
        Ok(Self { inner, cipher })
    }

    /// Recover the wrapped stream (useful once the caller is done writing).
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut chunk = buf.to_vec();
        self.cipher.apply_keystream(&mut chunk);
        self.inner.write_all(&chunk)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wraps an input stream, reading and validating the envelope header on
/// construction and decrypting every subsequent read in place.
pub struct DecryptingReader<R: Read> {
    inner: R,
    cipher: Cipher,
}

impl<R: Read + fmt::Debug> fmt::Debug for DecryptingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptingReader")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<R: Read> DecryptingReader<R> {
    /// Read the envelope header from `inner`, verify the magic, and derive
    /// the stream cipher from `password`.
    pub fn new(mut inner: R, password: &[u8]) -> Result<Self, PipelineError> {
        let params = CryptoParams::DEFAULT;

        let mut magic = [0u8; 4];
        inner.read_exact(&mut magic)?;
        if magic != params.magic {
            return Err(PipelineError::UnsupportedFormat);
        }

        let mut salt = vec![0u8; params.salt_len];
        inner.read_exact(&mut salt)?;
        let mut iv = vec![0u8; params.iv_len];
        inner.read_exact(&mut iv)?;

        let key = derive_key(password, &salt, &params);
        let cipher = Cipher::new(key.as_slice().into(), iv.as_slice().into());
        Ok(Self { inner, cipher })
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.apply_keystream(&mut buf[..n]);
        Ok(n)
    }
}
