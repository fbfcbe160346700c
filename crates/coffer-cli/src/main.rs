//! Command-line driver: scan a directory, diff it against the last run's
//! fingerprint database, stream the changed files through the
//! tar/compress/encrypt pipeline to a local file or S3 object, and
//! rewrite the database to reflect what was just archived.

mod logging;
mod target;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use coffer_core::{Error, RelPath};
use coffer_fingerprint::Database;
use coffer_pipeline::{run_pipeline, write_compressed_encrypted, PipelineSource};
use coffer_sink::{LocalSink, Sink};
use serde::Serialize;
use target::Target;
use tracing::info;

/// Produce a compressed, encrypted, incremental backup of a directory
/// tree.
#[derive(Parser)]
#[command(name = "coffer", version, about)]
struct Cli {
    /// Directory to back up.
    directory: PathBuf,

    /// Path to the fingerprint database from the previous run.
    #[arg(long, default_value = "fingerprints.db")]
    db: PathBuf,

    /// Increase log verbosity; repeatable (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Where to ship the archive: a local path, `file://...`, or
    /// `s3://[access:secret@]bucket/key`.
    #[arg(long)]
    target: String,

    /// Encryption password. Prompted for on stdin if omitted.
    #[arg(long)]
    password: Option<String>,

    /// LZMA compression level (0-9).
    #[arg(long, default_value_t = 9)]
    compression_level: u32,
}

/// The metadata index artifact: what this run archived, what it found
/// deleted, and the fresh fingerprint database, all run through the same
/// compress/encrypt stage pair as the archive.
#[derive(Serialize)]
struct MetadataIndex<'a> {
    deleted: &'a [RelPath],
    archived: &'a [RelPath],
    db: Vec<u8>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let password = match cli.password.clone() {
        Some(p) => p,
        None => match prompt_password() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("failed to read password: {e}");
                return ExitCode::from(2);
            }
        },
    };

    match run(&cli, password.as_bytes()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, cause_chain = ?source_chain(&e), "backup failed");
            eprintln!("backup failed: {e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// No interactive-terminal crate is otherwise in the dependency stack,
/// so the password prompt is a plain, unmasked stdin read.
fn prompt_password() -> std::io::Result<String> {
    eprint!("Backup password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

fn source_chain(e: &Error) -> Vec<String> {
    let mut chain = Vec::new();
    let mut cause: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(e);
    while let Some(c) = cause {
        chain.push(c.to_string());
        cause = c.source();
    }
    chain
}

fn exit_code_for(e: &Error) -> u8 {
    match e {
        Error::PipelineStageFailed { .. } | Error::ArchiveSizeMismatch { .. } => 3,
        Error::SinkIoError(_) => 4,
        Error::UnsupportedFileType { .. } | Error::UnsupportedFormat => 5,
        _ => 1,
    }
}

fn run(cli: &Cli, password: &[u8]) -> Result<(), Error> {
    let inventory = coffer_scan::scan(&cli.directory);
    let mut db = Database::load_or_new(cli.directory.clone(), &cli.db)?;

    let (new, updated) = db.diff(&inventory.files)?;
    let deleted = db.deletions(&inventory.files);
    let altered = db.altered(&updated, &inventory.files, None)?;

    if new.is_empty() && updated.is_empty() && deleted.is_empty() {
        info!("no changes since the last run; nothing to do");
        return Ok(());
    }

    let mut archived: Vec<RelPath> = new.iter().chain(altered.iter()).cloned().collect();
    archived.sort();

    let total_bytes = db.sizes_of(&archived, &inventory.files)?;
    info!(
        new = new.len(),
        updated = updated.len(),
        altered = altered.len(),
        deleted = deleted.len(),
        total_bytes,
        "diff computed"
    );

    if !archived.is_empty() {
        let archive_target =
            target::parse(&cli.target).map_err(|e| Error::SinkIoError(e.to_string()))?;
        ship_archive(archive_target, &archived, &inventory.files, password, cli.compression_level)?;
    } else {
        info!("no file content changed; skipping archive, updating database only");
    }

    db.update_meta(&inventory.files)?;

    let db_bytes = db.to_bytes()?;
    let index = MetadataIndex { deleted: &deleted, archived: &archived, db: db_bytes };
    let index_bytes = rmp_serde::to_vec(&index).map_err(|e| Error::CorruptDatabase(e.to_string()))?;
    let metadata_target_raw = metadata_index_target(&cli.target);
    let metadata_target =
        target::parse(&metadata_target_raw).map_err(|e| Error::SinkIoError(e.to_string()))?;
    ship_metadata_index(metadata_target, &index_bytes, password, cli.compression_level)?;

    db.save_atomic(&cli.db)?;
    info!(path = %cli.db.display(), "fingerprint database updated");
    Ok(())
}

fn metadata_index_target(archive_target: &str) -> String {
    for suffix in [".tar.xz.mob"] {
        if let Some(stripped) = archive_target.strip_suffix(suffix) {
            return format!("{stripped}.mdx.xz.mob");
        }
    }
    format!("{archive_target}.mdx.xz.mob")
}

fn ship_archive(
    target: Target,
    members: &[RelPath],
    files: &std::collections::BTreeMap<RelPath, coffer_scan::FileEntry>,
    password: &[u8],
    compression_level: u32,
) -> Result<(), Error> {
    match target {
        Target::Local(path) => {
            let mut sink = LocalSink::new(path);
            let mut writer = sink.open_writer().map_err(Error::from)?;
            let source = PipelineSource { members: members.to_vec(), files };
            match run_pipeline(source, password, compression_level, &mut writer) {
                Ok(()) => sink.commit(writer).map_err(Error::from),
                Err(e) => {
                    let _ = sink.abort(writer);
                    Err(e)
                }
            }
        }
        #[cfg(feature = "s3")]
        Target::S3 { bucket, key, credentials } => {
            let rt = tokio::runtime::Runtime::new().map_err(Error::Io)?;
            let client = rt.block_on(build_s3_client(credentials));
            let mut sink = coffer_sink::S3Sink::new(client, bucket, key, 0);
            let mut writer = sink.open_writer().map_err(Error::from)?;
            let source = PipelineSource { members: members.to_vec(), files };
            match run_pipeline(source, password, compression_level, &mut writer) {
                Ok(()) => sink.commit(writer).map_err(Error::from),
                Err(e) => {
                    let _ = sink.abort(writer);
                    Err(e)
                }
            }
        }
        #[cfg(not(feature = "s3"))]
        Target::S3 { .. } => Err(Error::SinkIoError("s3 support not built in".to_string())),
    }
}

fn ship_metadata_index(
    target: Target,
    payload: &[u8],
    password: &[u8],
    compression_level: u32,
) -> Result<(), Error> {
    match target {
        Target::Local(path) => {
            let mut sink = LocalSink::new(path);
            let mut writer = sink.open_writer().map_err(Error::from)?;
            match write_compressed_encrypted(payload, password, compression_level, &mut writer) {
                Ok(()) => sink.commit(writer).map_err(Error::from),
                Err(e) => {
                    let _ = sink.abort(writer);
                    Err(e)
                }
            }
        }
        #[cfg(feature = "s3")]
        Target::S3 { bucket, key, credentials } => {
            let rt = tokio::runtime::Runtime::new().map_err(Error::Io)?;
            let client = rt.block_on(build_s3_client(credentials));
            let mut sink = coffer_sink::S3Sink::new(client, bucket, key, payload.len() as u64);
            let mut writer = sink.open_writer().map_err(Error::from)?;
            match write_compressed_encrypted(payload, password, compression_level, &mut writer) {
                Ok(()) => sink.commit(writer).map_err(Error::from),
                Err(e) => {
                    let _ = sink.abort(writer);
                    Err(e)
                }
            }
        }
        #[cfg(not(feature = "s3"))]
        Target::S3 { .. } => Err(Error::SinkIoError("s3 support not built in".to_string())),
    }
}

#[cfg(feature = "s3")]
async fn build_s3_client(credentials: Option<(String, String)>) -> aws_sdk_s3::Client {
    let loader = aws_config::from_env();
    let loader = match credentials {
        Some((access_key, secret_key)) => loader.credentials_provider(
            aws_credential_types::Credentials::from_keys(access_key, secret_key, None),
        ),
        None => loader,
    };
    let config = loader.load().await;
    aws_sdk_s3::Client::new(&config)
}
