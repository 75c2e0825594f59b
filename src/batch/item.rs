//! Items flowing through a batch.

use std::path::{Path, PathBuf};

use crate::digest::{BufferSource, ByteSource, FileSource};

/// Where an item's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// No content at all. Passed through without being tracked.
    Null,
    /// A directory entry. Passed through without being tracked.
    Directory,
    /// Content already held in memory.
    Buffer(Vec<u8>),
    /// Content streamed from a file on disk.
    File(PathBuf),
}

/// A named unit of content, typically a file in a build.
///
/// The cache never modifies an item; emitted items are the ones that went in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    name: String,
    contents: Contents,
}

impl Item {
    /// Create an item from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, contents: Contents) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }

    /// Item whose content is the given bytes.
    #[must_use]
    pub fn buffer(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, Contents::Buffer(data.into()))
    }

    /// Item streamed from `path`, named by the path itself.
    ///
    /// Names are UTF-8. A non-UTF-8 path is named by its lossy conversion,
    /// so two such paths can share a name and therefore a store entry.
    /// `changecache check` skips non-UTF-8 paths for that reason.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(path.to_string_lossy().into_owned(), Contents::File(path))
    }

    /// Item without content.
    #[must_use]
    pub fn null(name: impl Into<String>) -> Self {
        Self::new(name, Contents::Null)
    }

    /// Directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, Contents::Directory)
    }

    /// Unique name of the item.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path on disk, for file-backed items.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.contents {
            Contents::File(path) => Some(path),
            _ => None,
        }
    }

    /// Whether the item carries content that should be tracked.
    #[must_use]
    pub fn has_content(&self) -> bool {
        matches!(self.contents, Contents::Buffer(_) | Contents::File(_))
    }

    /// A fresh byte source over the content, or `None` for null and directory items.
    #[must_use]
    pub fn source(&self) -> Option<Box<dyn ByteSource + '_>> {
        match &self.contents {
            Contents::Buffer(data) => Some(Box::new(BufferSource::new(data))),
            Contents::File(path) => Some(Box::new(FileSource::new(path.clone()))),
            Contents::Null | Contents::Directory => None,
        }
    }
}
