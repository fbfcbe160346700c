// End-to-end scenarios against the public pipeline API: a real tree
// scanned, archived, compressed and encrypted, then restored the other
// way.

use coffer_pipeline::crypto::{DecryptingReader, EncryptingWriter};
use coffer_pipeline::{run_pipeline, write_compressed_encrypted, PipelineSource};
use coffer_scan::scan;
use std::fs;
use std::io::{Read, Write};

#[test]
fn e1_small_tree_round_trips_through_tar_compress_encrypt() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
    let inv = scan(dir.path());
    let members: Vec<_> = inv.files.keys().cloned().collect();

    let mut sink = Vec::new();
    run_pipeline(PipelineSource { members, files: &inv.files }, b"hunter2", 9, &mut sink).unwrap();

    let decrypted = DecryptingReader::new(sink.as_slice(), b"hunter2").unwrap();
    let mut decompressed = coffer_pipeline::compress::decompressing_reader(decrypted);
    let mut tar_bytes = Vec::new();
    decompressed.read_to_end(&mut tar_bytes).unwrap();

    let mut archive = tar::Archive::new(tar_bytes.as_slice());
    let mut entries = archive.entries().unwrap();
    let mut entry = entries.next().unwrap().unwrap();
    let mut body = Vec::new();
    entry.read_to_end(&mut body).unwrap();
    assert_eq!(body, b"hello\n");
    assert!(entries.next().is_none());
}

#[test]
fn metadata_index_payload_round_trips() {
    let payload = br#"{"deleted":[],"archived":["a.txt"]}"#;
    let mut sink = Vec::new();
    write_compressed_encrypted(payload, b"hunter2", 9, &mut sink).unwrap();

    let decrypted = DecryptingReader::new(sink.as_slice(), b"hunter2").unwrap();
    let mut decompressed = coffer_pipeline::compress::decompressing_reader(decrypted);
    let mut out = Vec::new();
    decompressed.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn boundary_tree_of_only_symlinks_streams_zero_body_bytes() {
    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink("nowhere", dir.path().join("link")).unwrap();
    let inv = scan(dir.path());
    let members: Vec<_> = inv.files.keys().cloned().collect();

    let mut sink = Vec::new();
    run_pipeline(PipelineSource { members, files: &inv.files }, b"hunter2", 9, &mut sink).unwrap();

    let decrypted = DecryptingReader::new(sink.as_slice(), b"hunter2").unwrap();
    let mut decompressed = coffer_pipeline::compress::decompressing_reader(decrypted);
    let mut tar_bytes = Vec::new();
    decompressed.read_to_end(&mut tar_bytes).unwrap();

    let mut archive = tar::Archive::new(tar_bytes.as_slice());
    let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
    assert_eq!(entry.header().entry_type(), tar::EntryType::Symlink);
    let mut body = Vec::new();
    entry.read_to_end(&mut body).unwrap();
    assert!(body.is_empty());
}

#[test]
fn e6_megabyte_payload_round_trips_with_exact_envelope_overhead() {
    let payload = vec![b'A'; 1_000_000];
    let mut ciphertext = Vec::new();
    {
        let mut w = EncryptingWriter::new(&mut ciphertext, b"s3cret").unwrap();
        w.write_all(&payload).unwrap();
    }
    assert_eq!(ciphertext.len(), 52 + 1_000_000);

    let mut r = DecryptingReader::new(ciphertext.as_slice(), b"s3cret").unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn boundary_truncated_ciphertext_decrypts_but_the_tar_stream_is_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
    let inv = scan(dir.path());
    let members: Vec<_> = inv.files.keys().cloned().collect();

    let mut sink = Vec::new();
    run_pipeline(PipelineSource { members, files: &inv.files }, b"hunter2", 0, &mut sink).unwrap();
    sink.truncate(sink.len() / 2);

    // Decryption never fails closed on truncated ciphertext (no MAC); it
    // simply decrypts whatever prefix bytes are present.
    let decrypted = DecryptingReader::new(sink.as_slice(), b"hunter2").unwrap();
    let mut decompressed = coffer_pipeline::compress::decompressing_reader(decrypted);
    let mut out = Vec::new();
    let result = decompressed.read_to_end(&mut out);
    assert!(result.is_err() || out.len() < b"hello\n".len() + 512);
}
