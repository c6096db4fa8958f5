use thiserror::Error;

use crate::framebuffer::Channel;

/// Library error type for decoding, buffer access and presentation.
#[derive(Debug, Error)]
pub enum Error {
    /// The source does not start with the `BM` signature, or its header
    /// describes an image with no pixels.
    #[error("not a valid bitmap: {0}")]
    InvalidFormat(&'static str),

    /// The bitmap uses a pixel depth other than 24 bits.
    #[error("unsupported bitmap encoding: {0} bits per pixel (only 24 is supported)")]
    UnsupportedEncoding(u16),

    /// The byte source could not be read or seeked.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A plane access fell outside the framebuffer.
    #[error("{channel} plane access at row {row}, col {col} outside {width}x{height}")]
    IndexOutOfBounds {
        channel: Channel,
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    /// `allocate` was called on a framebuffer that still owns its planes.
    #[error("framebuffer is already allocated")]
    DoubleAllocation,

    /// The framebuffer was read or written after `release`.
    #[error("framebuffer used after release")]
    UseAfterRelease,

    /// A framebuffer was requested with a zero dimension.
    #[error("invalid framebuffer dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// The image catalog holds no entries.
    #[error("image catalog is empty")]
    EmptyCatalog,

    /// A catalog index beyond the number of entries.
    #[error("catalog index {index} out of range ({len} entries)")]
    CatalogIndex { index: usize, len: usize },
}

impl Error {
    /// Lifecycle and bounds violations are programming errors rather than
    /// bad input; callers should fail fast on them.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::DoubleAllocation | Self::UseAfterRelease
        )
    }
}
