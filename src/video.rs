use tracing::warn;

use crate::error::Error;
use crate::frame::Frame;

const FALLBACK_DIMS: (u32, u32) = (1280, 720);
const FALLBACK_FPS: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    /// As reported by the container, zero when unknown.
    pub frame_count: u64,
}

impl VideoMeta {
    /// Replaces unreported dimensions or frame rate with 1280x720 at 25 fps.
    pub fn or_fallback(mut self) -> Self {
        if self.width == 0 || self.height == 0 {
            warn!(
                "video reports {}x{}, assuming {}x{}",
                self.width, self.height, FALLBACK_DIMS.0, FALLBACK_DIMS.1
            );
            (self.width, self.height) = FALLBACK_DIMS;
        }

        if !(self.fps > 0.0) {
            warn!("video reports fps {}, assuming {}", self.fps, FALLBACK_FPS);
            self.fps = FALLBACK_FPS;
        }

        self
    }

    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Sequential frame producer. `Ok(None)` marks the end of the stream.
pub trait VideoSource {
    fn meta(&self) -> VideoMeta;
    fn next_frame(&mut self) -> Result<Option<Frame>, Error>;
}

/// Yields `frame_count` frames without pixels.
///
/// Drives the pipeline when identities come from a recorded log and the
/// video itself is not needed.
#[derive(Debug, Clone)]
pub struct BlankSource {
    meta: VideoMeta,
    next: u64,
}

impl BlankSource {
    pub fn new(meta: VideoMeta) -> Self {
        Self { meta, next: 0 }
    }
}

impl VideoSource for BlankSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        if self.next >= self.meta.frame_count {
            return Ok(None);
        }

        let frame = Frame::empty(self.next, self.meta.dims(), self.meta.fps);
        self.next += 1;

        Ok(Some(frame))
    }
}

#[cfg(feature = "video")]
pub use self::opencv_source::OpenCvSource;

#[cfg(feature = "video")]
mod opencv_source {
    use opencv::{core::Mat, prelude::*, videoio};
    use std::path::Path;
    use tracing::info;

    use super::{VideoMeta, VideoSource};
    use crate::error::Error;
    use crate::frame::Frame;

    pub struct OpenCvSource {
        cap: videoio::VideoCapture,
        meta: VideoMeta,
        next: u64,
    }

    impl OpenCvSource {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
            let path = path.as_ref();
            if !path.exists() {
                return Err(Error::SourceNotFound(path.to_path_buf()));
            }

            let name = path
                .to_str()
                .ok_or_else(|| Error::SourceUnreadable(format!("non utf-8 path {:?}", path)))?;
            let cap = videoio::VideoCapture::from_file(name, videoio::CAP_ANY)?;

            if !cap.is_opened()? {
                return Err(Error::SourceUnreadable(name.to_string()));
            }

            let meta = VideoMeta {
                width: cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
                height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
                fps: cap.get(videoio::CAP_PROP_FPS)? as f32,
                frame_count: cap.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as u64,
            }
            .or_fallback();

            info!(
                "opened {}: {}x{} @ {} fps, {} frames",
                name, meta.width, meta.height, meta.fps, meta.frame_count
            );

            Ok(Self { cap, meta, next: 0 })
        }
    }

    impl VideoSource for OpenCvSource {
        fn meta(&self) -> VideoMeta {
            self.meta
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
            let mut mat = Mat::default();

            if !self.cap.read(&mut mat)? || mat.rows() == 0 {
                return Ok(None);
            }

            let dims = (mat.cols() as u32, mat.rows() as u32);
            // a cloned Mat is always continuous
            let data = mat.try_clone()?.data_bytes()?.to_vec();

            let mut frame = Frame::empty(self.next, dims, self.meta.fps);
            frame.data = data;
            self.next += 1;

            Ok(Some(frame))
        }
    }
}
