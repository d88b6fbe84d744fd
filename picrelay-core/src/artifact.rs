//! Temporary artifact store: one named file on local ephemeral storage,
//! owned by exactly one pipeline stage at a time.
//!
//! The central invariant of the whole design lives here: every artifact a
//! pipeline run creates is gone from disk by the time that run terminates,
//! on success and on failure. Stages release the artifact they consumed;
//! a `Drop` guard backs them up and logs if it ever has to act.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::contract::ByteStream;
use crate::error::{CleanupError, ReadError, RelayError, WriteError};

/// A single temporary file under the pipeline's working directory.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// Take ownership of a file some other step already wrote (the
    /// converter's output).
    pub(crate) fn adopt(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Stream bytes to `dir/file_name`. A mid-stream fetch failure or an
    /// I/O failure removes the partial file before returning.
    pub async fn write_from_stream(
        dir: &Path,
        file_name: &str,
        mut stream: ByteStream,
    ) -> Result<Self, RelayError> {
        let path = dir.join(file_name);
        let write = async {
            let mut file = tokio::fs::File::create(&path).await.map_err(|source| {
                RelayError::Write(WriteError {
                    path: path.clone(),
                    source,
                })
            })?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(RelayError::Fetch)?;
                file.write_all(&chunk).await.map_err(|source| {
                    RelayError::Write(WriteError {
                        path: path.clone(),
                        source,
                    })
                })?;
            }
            file.flush().await.map_err(|source| {
                RelayError::Write(WriteError {
                    path: path.clone(),
                    source,
                })
            })
        };
        match write.await {
            Ok(()) => Ok(Self {
                path,
                released: false,
            }),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            error = ?rm,
                            path = %path.display(),
                            "could not remove partial artifact"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole artifact back for upload. Fails if the file was
    /// already released, which in correct operation never happens.
    pub fn read_for_upload(&self) -> Result<Vec<u8>, ReadError> {
        std::fs::read(&self.path).map_err(|source| ReadError {
            path: self.path.clone(),
            source,
        })
    }

    /// Give up ownership without touching the file, for in-place
    /// ownership transfer to a successor artifact at the same path.
    pub(crate) fn disarm(&mut self) {
        self.released = true;
    }

    /// Delete the underlying file. Idempotent: a second call, or a file
    /// already gone, is not an error. A real I/O failure is reported so
    /// the caller can log it; it is never worth aborting a reply over.
    pub fn release(&mut self) -> Result<(), CleanupError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CleanupError {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "artifact was not released by its owning stage; removed on drop"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = ?e,
                    path = %self.path.display(),
                    "could not remove leaked artifact on drop"
                );
            }
        }
    }
}

/// Per-request unique token for on-disk names, derived from the message
/// timestamp so concurrent requests in the same working directory never
/// collide. Falls back to a fresh UUID when the timestamp yields nothing.
pub fn request_token(ts: &str) -> String {
    let token: String = ts
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    if token.chars().all(|c| c == '-') {
        uuid::Uuid::new_v4().to_string()
    } else {
        token
    }
}

/// Platform file names can contain spaces and worse; keep a conservative
/// character set for the on-disk name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
