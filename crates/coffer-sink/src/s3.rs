//! A sink that streams the archive into an S3 object via a multipart
//! upload, buffering just enough bytes to fill one part before issuing
//! each `UploadPart` call.
//!
//! The rest of the pipeline is synchronous (threads connected by bounded
//! channels); the AWS SDK is async-only, so this sink owns a small
//! dedicated Tokio runtime and blocks on it for every call rather than
//! asking the whole crate to become async for the sake of one backend.

use std::io::{self, Write};
use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::Sink;

/// S3's hard floor on any part but the last.
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
/// S3's hard ceiling on parts per upload.
const MAX_PARTS: u64 = 10_000;
/// Default bound on `UploadPart` retry attempts before the upload is
/// aborted.
const DEFAULT_MAX_RETRIES: u32 = 10;

/// Choose a part size for an upload expected to total `size_hint` bytes:
/// the smallest multiple of the minimum part size that keeps the part
/// count at or under [`MAX_PARTS`].
fn part_size_for(size_hint: u64) -> u64 {
    if size_hint <= MIN_PART_SIZE * MAX_PARTS {
        MIN_PART_SIZE
    } else {
        (size_hint + MAX_PARTS - 1) / MAX_PARTS
    }
}

/// An S3 destination, created by [`S3Sink::new`] with a size hint used to
/// pick the multipart part size up front (the exact final size is
/// rarely known before compression and encryption run).
pub struct S3Sink {
    client: Client,
    bucket: String,
    key: String,
    part_size: u64,
    max_retries: u32,
    rt: Arc<Runtime>,
}

impl S3Sink {
    /// Build a sink targeting `bucket`/`key`. `size_hint` informs the
    /// multipart part size (see [`part_size_for`]); `max_retries` bounds
    /// how many times a single part is retried before the whole upload
    /// is aborted.
    pub fn new(client: Client, bucket: String, key: String, size_hint: u64) -> Self {
        Self {
            client,
            bucket,
            key,
            part_size: part_size_for(size_hint),
            max_retries: DEFAULT_MAX_RETRIES,
            rt: Arc::new(Runtime::new().expect("failed to start S3 sink runtime")),
        }
    }

    /// Override the default retry bound.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Sink for S3Sink {
    type Writer = S3Writer;

    fn open_writer(&mut self) -> Result<Self::Writer, SinkError> {
        let upload_id = self
            .rt
            .block_on(
                self.client
                    .create_multipart_upload()
                    .bucket(&self.bucket)
                    .key(&self.key)
                    .send(),
            )
            .map_err(|e| SinkError::Io(e.to_string()))?
            .upload_id()
            .ok_or_else(|| SinkError::Io("S3 did not return an upload id".to_string()))?
            .to_string();

        Ok(S3Writer {
            client: self.client.clone(),
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            upload_id,
            part_size: self.part_size,
            max_retries: self.max_retries,
            rt: Arc::clone(&self.rt),
            buffer: Vec::with_capacity(self.part_size as usize),
            part_number: 1,
            completed_parts: Vec::new(),
        })
    }

    fn commit(self, mut writer: Self::Writer) -> Result<(), SinkError> {
        writer.flush_part(true)?;
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(std::mem::take(&mut writer.completed_parts)))
            .build();
        self.rt
            .block_on(
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(&self.key)
                    .upload_id(&writer.upload_id)
                    .multipart_upload(upload)
                    .send(),
            )
            .map_err(|e| SinkError::Io(e.to_string()))?;
        info!(bucket = %self.bucket, key = %self.key, "committed multipart upload");
        Ok(())
    }

    fn abort(self, writer: Self::Writer) -> Result<(), SinkError> {
        let result = self.rt.block_on(
            self.client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(&self.key)
                .upload_id(&writer.upload_id)
                .send(),
        );
        if let Err(e) = result {
            warn!(bucket = %self.bucket, key = %self.key, error = %e, "failed to abort multipart upload");
        }
        Ok(())
    }
}

/// The `Write` half of an in-progress multipart upload: buffers bytes
/// until a full part is ready, then uploads it with bounded retries.
pub struct S3Writer {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    part_size: u64,
    max_retries: u32,
    rt: Arc<Runtime>,
    buffer: Vec<u8>,
    part_number: i32,
    completed_parts: Vec<CompletedPart>,
}

impl S3Writer {
    fn flush_part(&mut self, is_final: bool) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            // A multipart upload needs at least one part; if nothing was
            // ever buffered, send a single empty final part.
            if !(is_final && self.completed_parts.is_empty()) {
                return Ok(());
            }
        }

        let body = std::mem::take(&mut self.buffer);
        let part_number = self.part_number;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let stream = ByteStream::from(body.clone());
            let result = self.rt.block_on(
                self.client
                    .upload_part()
                    .bucket(&self.bucket)
                    .key(&self.key)
                    .upload_id(&self.upload_id)
                    .part_number(part_number)
                    .body(stream)
                    .send(),
            );
            match result {
                Ok(output) => {
                    let etag = output.e_tag().unwrap_or_default().to_string();
                    self.completed_parts.push(
                        CompletedPart::builder().part_number(part_number).e_tag(etag).build(),
                    );
                    break;
                }
                Err(e) if attempt < self.max_retries => {
                    warn!(part = part_number, attempt, error = %e, "retrying S3 part upload");
                }
                Err(e) => {
                    return Err(SinkError::RetriesExhausted {
                        destination: format!("s3://{}/{}", self.bucket, self.key),
                        attempts: attempt,
                        cause: e.to_string(),
                    });
                }
            }
        }
        self.part_number += 1;
        Ok(())
    }
}

impl Write for S3Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while self.buffer.len() as u64 >= self.part_size {
            let remainder = self.buffer.split_off(self.part_size as usize);
            self.flush_part(false).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            self.buffer = remainder;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_stays_at_minimum_for_small_uploads() {
        assert_eq!(part_size_for(1024), MIN_PART_SIZE);
    }

    #[test]
    fn part_size_grows_to_respect_the_part_count_ceiling() {
        let huge = MIN_PART_SIZE * MAX_PARTS * 3;
        let size = part_size_for(huge);
        assert!(size > MIN_PART_SIZE);
        assert!((huge + size - 1) / size <= MAX_PARTS);
    }
}
