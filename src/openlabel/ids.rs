//! Newtype identifiers for OpenLABEL objects and label files.
//!
//! Both are plain strings on the wire. Wrapping them keeps an object id from
//! being passed where a label-file key is expected (and vice versa).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

/// The key of an object in an OpenLABEL `objects` mapping.
///
/// Stable across fragments: every record carrying the same id describes
/// the same logical object.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:?})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifies one parsed label file: its path with the extension stripped.
///
/// The same file always maps to the same id, and the id doubles as a
/// candidate media name (`labels/frame_0001.json` describes `frame_0001`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelFileId(String);

impl LabelFileId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the id from a label path by stripping its extension.
    pub fn from_path(path: &Path) -> Self {
        Self(path.with_extension("").to_string_lossy().into_owned())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LabelFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelFileId({:?})", self.0)
    }
}

impl fmt::Display for LabelFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelFileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A 1-based frame number.
///
/// OpenLABEL frame indices are 0-based; everything downstream of parsing
/// works with `index + 1`.
pub type FrameNumber = u32;
