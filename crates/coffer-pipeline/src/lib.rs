//! The streaming archive pipeline: tar framing, LZMA compression, and
//! AES-256-OFB encryption, connected by bounded channel conduits so each
//! stage runs on its own thread without buffering whole files.

#![deny(unsafe_code)]

pub mod compress;
pub mod crypto;
pub mod error;
pub mod runner;
pub mod tar_writer;

pub use error::PipelineError;
pub use runner::{run_pipeline, write_compressed_encrypted, PipelineSource};
