//! Frame capture to disk.
//!
//! Each inbound data frame is written verbatim to `<dir>/frame-NNN.vdt`.
//! The directory is created on first use, so it may be given on the command
//! line before it exists.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::application::error::RecorderError;
use crate::application::ports::FrameRecorder;
use crate::domain::frame_file_name;

/// [`FrameRecorder`] writing one file per frame; inert without a directory.
#[derive(Debug, Clone, Default)]
pub struct FileFrameRecorder {
    dir: Option<PathBuf>,
}

impl FileFrameRecorder {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// A recorder that saves nothing.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

#[async_trait]
impl FrameRecorder for FileFrameRecorder {
    async fn record(&self, sequence: u64, payload: &[u8]) -> Result<(), RecorderError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).await.map_err(io_error(dir))?;

        let path = dir.join(frame_file_name(sequence));
        info!("saving frame to {}", path.display());
        let mut file = fs::File::create(&path).await.map_err(io_error(&path))?;
        file.write_all(payload).await.map_err(io_error(&path))?;
        file.flush().await.map_err(io_error(&path))?;
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> RecorderError {
    let path = path.to_path_buf();
    move |source| RecorderError::Io { path, source }
}
