//! The ordered set of images the presentation cycles through.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::bitmap;
use crate::error::Error;
use crate::framebuffer::ChannelFramebuffer;
use crate::source::SliceSource;

/// Ordered image identifiers that can be decoded on demand.
pub trait Catalog {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of entry `index`, for logs.
    fn label(&self, index: usize) -> String;

    /// Decode entry `index` into a freshly allocated framebuffer.
    ///
    /// # Errors
    /// [`Error::CatalogIndex`] for an index past the end, otherwise any
    /// decode or IO error for the entry.
    fn load(&self, index: usize) -> Result<ChannelFramebuffer, Error>;
}

/// Bitmap files on disk.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    paths: Vec<PathBuf>,
}

impl DirectoryCatalog {
    /// Use an explicit list, keeping its order.
    ///
    /// # Errors
    /// [`Error::EmptyCatalog`] if `paths` is empty.
    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self { paths })
    }

    /// Collect every `.bmp` below `root`, sorted by path.
    ///
    /// # Errors
    /// [`Error::EmptyCatalog`] if nothing was found.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref();
        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| is_bitmap(p))
            .collect();
        paths.sort();
        info!(root = %root.display(), discovered = paths.len(), "bitmap scan complete");
        Self::from_paths(paths)
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn path(&self, index: usize) -> Result<&Path, Error> {
        self.paths
            .get(index)
            .map(PathBuf::as_path)
            .ok_or(Error::CatalogIndex {
                index,
                len: self.paths.len(),
            })
    }
}

impl Catalog for DirectoryCatalog {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn label(&self, index: usize) -> String {
        self.paths
            .get(index)
            .map_or_else(|| format!("#{index}"), |p| p.display().to_string())
    }

    fn load(&self, index: usize) -> Result<ChannelFramebuffer, Error> {
        let path = self.path(index)?;
        debug!(path = %path.display(), "decoding bitmap file");
        bitmap::decode_file(path)
    }
}

#[inline]
fn is_bitmap(p: &Path) -> bool {
    p.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case("bmp"))
}

/// Bitmaps held in memory, e.g. compiled in with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedCatalog {
    entries: Vec<(String, Cow<'static, [u8]>)>,
}

impl EmbeddedCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        self.push(name, bytes);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) {
        self.entries.push((name.into(), bytes.into()));
    }
}

impl Catalog for EmbeddedCatalog {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn label(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map_or_else(|| format!("#{index}"), |(name, _)| name.clone())
    }

    fn load(&self, index: usize) -> Result<ChannelFramebuffer, Error> {
        let (_, bytes) = self.entries.get(index).ok_or(Error::CatalogIndex {
            index,
            len: self.entries.len(),
        })?;
        bitmap::decode(&mut SliceSource::new(bytes))
    }
}
