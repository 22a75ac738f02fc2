//! Media dimension probing for samples whose streams carry no size.

use std::path::Path;

use crate::error::OpenLabelError;
use crate::labels::FrameSize;

/// Reads the frame dimensions of a media file.
pub trait MediaProbe {
    fn frame_size(&self, path: &Path) -> Result<FrameSize, OpenLabelError>;
}

/// Reads image headers with `imagesize`. Videos are not supported.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageSizeProbe;

impl MediaProbe for ImageSizeProbe {
    fn frame_size(&self, path: &Path) -> Result<FrameSize, OpenLabelError> {
        let size = imagesize::size(path).map_err(|source| OpenLabelError::MediaProbe {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(FrameSize::new(size.width as f64, size.height as f64))
    }
}

/// A probe that knows no dimensions; every lookup fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProbe;

impl MediaProbe for NoProbe {
    fn frame_size(&self, path: &Path) -> Result<FrameSize, OpenLabelError> {
        Err(OpenLabelError::MediaProbeUnsupported {
            path: path.to_path_buf(),
            message: "no media probe configured".to_string(),
        })
    }
}
