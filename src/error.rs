use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("at least 4 point correspondences are required, got {got}")]
    InsufficientCorrespondences { got: usize },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("homography not initialized, set correspondences first")]
    NotInitialized,

    #[error("zero homogeneous component projecting ({x}, {y})")]
    DegenerateProjection { x: f64, y: f64 },

    #[error("malformed record in frame {frame:?}: {reason}")]
    MalformedRecord { frame: Option<u64>, reason: String },

    #[error("video source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("video source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "video")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl Error {
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    pub fn malformed(frame: Option<u64>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            frame,
            reason: reason.into(),
        }
    }
}
