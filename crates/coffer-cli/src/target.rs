//! Parses the `--target` URL into a concrete destination: `file://` (or
//! a bare path) for a local sink, `s3://bucket/key` for a multipart
//! upload.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("s3 target must look like s3://bucket/key, got {0}")]
    MalformedS3Url(String),
}

pub enum Target {
    Local(PathBuf),
    S3 { bucket: String, key: String, credentials: Option<(String, String)> },
}

/// Parse `--target`. S3 URLs may carry credentials in the userinfo
/// position (`s3://access:secret@bucket/prefix`); a bucket/key pair with
/// no userinfo falls back to the ambient AWS credential chain.
pub fn parse(raw: &str) -> Result<Target, TargetError> {
    if let Some(rest) = raw.strip_prefix("s3://") {
        let (authority, key) =
            rest.split_once('/').ok_or_else(|| TargetError::MalformedS3Url(raw.to_string()))?;
        if authority.is_empty() || key.is_empty() {
            return Err(TargetError::MalformedS3Url(raw.to_string()));
        }

        let (credentials, bucket) = match authority.split_once('@') {
            Some((userinfo, bucket)) => {
                let (access, secret) = userinfo
                    .split_once(':')
                    .ok_or_else(|| TargetError::MalformedS3Url(raw.to_string()))?;
                (Some((access.to_string(), secret.to_string())), bucket)
            }
            None => (None, authority),
        };

        return Ok(Target::S3 { bucket: bucket.to_string(), key: key.to_string(), credentials });
    }

    let path = raw.strip_prefix("file://").unwrap_or(raw);
    Ok(Target::Local(PathBuf::from(path)))
}
