//! Artifact storage module
//!
//! Writes generated bytes into the static directory under a timestamped
//! filename and derives the public URL clients fetch them from. Files are
//! never overwritten: a name that is already taken gets a numeric suffix.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Upper bound on `_N` suffixes tried for one timestamp
const MAX_SUFFIX: u32 = 1000;

/// A stored file and the URL it is served under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    public_base_url: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Current unix time in seconds, the naming unit for artifacts
    pub fn timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Store `bytes` as `<stem>_<timestamp>.<ext>`, or `<stem>_<timestamp>_<n>.<ext>`
    /// when that name is taken
    pub async fn save_at(
        &self,
        stem: &str,
        ext: &str,
        bytes: &[u8],
        timestamp: i64,
    ) -> io::Result<Artifact> {
        self.ensure_root().await?;

        for attempt in 0..=MAX_SUFFIX {
            let filename = if attempt == 0 {
                format!("{stem}_{timestamp}.{ext}")
            } else {
                format!("{stem}_{timestamp}_{attempt}.{ext}")
            };
            let path = self.root.join(&filename);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            file.write_all(bytes).await?;
            file.flush().await?;

            tracing::debug!(file = %path.display(), bytes = bytes.len(), "artifact stored");
            return Ok(Artifact {
                url: self.url_for(&filename),
                filename,
                path,
            });
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free artifact name for {stem}_{timestamp}.{ext}"),
        ))
    }

    /// Public URL of a stored filename
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_base_url, filename)
    }
}
