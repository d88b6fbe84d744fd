//! Typed error taxonomy for the conversion pipeline.
//!
//! Each stage owns one error type; [`RelayError`] aggregates them for the
//! orchestrator. `Display` on every variant doubles as the short reason
//! string quoted back to the user, so messages stay free of internal
//! detail. [`CleanupError`] is never surfaced: callers log it and move on.

use std::path::PathBuf;

use crate::trigger::TargetFormat;

/// The attachment download failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("download returned HTTP {0}")]
    Status(u16),
    #[error("download failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Persisting the fetched bytes to local storage failed. The path stays
/// out of `Display`: these strings reach the user reply, which gets a
/// generic reason only (the full path is still in the fields for logs).
#[derive(Debug, thiserror::Error)]
#[error("could not persist the attachment to local storage: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Reading an artifact back failed. Hitting this after a release is an
/// ownership violation and must never occur in correct operation.
#[derive(Debug, thiserror::Error)]
#[error("could not read back a local artifact: {source}")]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Decoding or re-encoding the image failed.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("attachment is not a decodable image ({0})")]
    Decode(image::ImageError),
    #[error("no encoder available for {0}")]
    UnsupportedTarget(TargetFormat),
    #[error("could not encode converted image ({0})")]
    Encode(image::ImageError),
}

/// One of the relay's sub-steps failed; the variant identifies which.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file upload failed: {0}")]
    Upload(String),
    #[error("public share failed: {0}")]
    Share(String),
    #[error("share permalink did not match the expected shape: {0}")]
    LinkParse(String),
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Deleting a local artifact failed. Best-effort only: logged, never
/// propagated into the reply path.
#[derive(Debug, thiserror::Error)]
#[error("could not remove artifact {}: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Aggregate pipeline error. One of these aborts the current request,
/// triggers cleanup of any artifact still held, and becomes the reason
/// string in the threaded error reply. Never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("the message asked for a conversion but carried no file")]
    NoAttachment,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}
