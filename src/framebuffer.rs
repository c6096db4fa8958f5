//! Channel-separated pixel storage.
//!
//! A decoded image lives in three independent planes (red, green, blue), each
//! a row-major grid of 8-bit intensities. [`Plane`] owns its bytes and only
//! hands out checked accessors; [`ChannelFramebuffer`] adds the explicit
//! allocate/release lifecycle the presentation controller drives.

use std::fmt;

use tracing::trace;

use crate::error::Error;

/// One colour channel of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-channel 2-D grid stored as one flat buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Zero-filled plane of `width × height`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.height && col < self.width).then(|| row * self.width + col)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.index(row, col).map(|i| self.data[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut u8> {
        let i = self.index(row, col)?;
        self.data.get_mut(i)
    }

    /// Store `value`, returning the previous one, or `None` if out of range.
    pub fn set(&mut self, row: usize, col: usize, value: u8) -> Option<u8> {
        self.get_mut(row, col).map(|slot| std::mem::replace(slot, value))
    }

    /// Borrow one full row.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        self.data.get(start..start + self.width)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [u8]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        self.data.get_mut(start..start + self.width)
    }

    /// The raw row-major bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

/// Three equally sized channel planes.
///
/// This is both the storage behind an allocated [`ChannelFramebuffer`] and
/// the per-frame working copy produced by the glitch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planes {
    red: Plane,
    green: Plane,
    blue: Plane,
}

impl Planes {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            red: Plane::new(width, height),
            green: Plane::new(width, height),
            blue: Plane::new(width, height),
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.red.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.red.height
    }

    #[must_use]
    pub const fn plane(&self, channel: Channel) -> &Plane {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    pub fn plane_mut(&mut self, channel: Channel) -> &mut Plane {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        }
    }

    /// Mutable red, green and blue slices of one row.
    pub fn rows_mut(&mut self, row: usize) -> Option<[&mut [u8]; 3]> {
        Some([
            self.red.row_mut(row)?,
            self.green.row_mut(row)?,
            self.blue.row_mut(row)?,
        ])
    }

    /// The `[r, g, b]` triple at a pixel.
    #[must_use]
    pub fn rgb(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        Some([
            self.red.get(row, col)?,
            self.green.get(row, col)?,
            self.blue.get(row, col)?,
        ])
    }

    /// Checked read of one channel value.
    pub fn get(&self, channel: Channel, row: usize, col: usize) -> Result<u8, Error> {
        self.plane(channel)
            .get(row, col)
            .ok_or_else(|| self.out_of_bounds(channel, row, col))
    }

    /// Checked write of one channel value.
    pub fn set(&mut self, channel: Channel, row: usize, col: usize, value: u8) -> Result<(), Error> {
        let err = self.out_of_bounds(channel, row, col);
        let slot = self.plane_mut(channel).get_mut(row, col).ok_or(err)?;
        *slot = value;
        Ok(())
    }

    fn out_of_bounds(&self, channel: Channel, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            channel,
            row,
            col,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Framebuffer for one decoded image.
///
/// Created empty, populated once by the decoder, read once per frame by the
/// glitch engine, then released when the image is retired. The planes are
/// dropped on release or when the framebuffer itself is dropped.
#[derive(Debug, Clone, Default)]
pub struct ChannelFramebuffer {
    planes: Option<Planes>,
}

impl ChannelFramebuffer {
    /// An unallocated framebuffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { planes: None }
    }

    /// Wrap already populated planes as an allocated framebuffer.
    #[must_use]
    pub const fn from_planes(planes: Planes) -> Self {
        Self {
            planes: Some(planes),
        }
    }

    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.planes.is_some()
    }

    /// Width in pixels, or 0 while unallocated.
    #[must_use]
    pub fn width(&self) -> usize {
        self.planes.as_ref().map_or(0, Planes::width)
    }

    /// Height in pixels, or 0 while unallocated.
    #[must_use]
    pub fn height(&self) -> usize {
        self.planes.as_ref().map_or(0, Planes::height)
    }

    /// Allocate zeroed planes of `width × height`.
    ///
    /// # Errors
    /// [`Error::DoubleAllocation`] if planes are already held (they are left
    /// untouched), [`Error::InvalidDimensions`] for a zero dimension or a
    /// pixel count that overflows `usize`.
    pub fn allocate(&mut self, width: usize, height: usize) -> Result<(), Error> {
        if self.planes.is_some() {
            return Err(Error::DoubleAllocation);
        }
        if width == 0 || height == 0 || width.checked_mul(height).is_none() {
            return Err(Error::InvalidDimensions { width, height });
        }
        self.planes = Some(Planes::new(width, height));
        trace!(width, height, "framebuffer allocated");
        Ok(())
    }

    /// Drop the planes. A no-op on an unallocated framebuffer.
    pub fn release(&mut self) {
        if self.planes.take().is_some() {
            trace!("framebuffer released");
        }
    }

    /// Borrow the planes for reading.
    ///
    /// # Errors
    /// [`Error::UseAfterRelease`] when unallocated.
    pub fn planes(&self) -> Result<&Planes, Error> {
        self.planes.as_ref().ok_or(Error::UseAfterRelease)
    }

    /// Borrow the planes for writing.
    ///
    /// # Errors
    /// [`Error::UseAfterRelease`] when unallocated.
    pub fn planes_mut(&mut self) -> Result<&mut Planes, Error> {
        self.planes.as_mut().ok_or(Error::UseAfterRelease)
    }

    pub fn get(&self, channel: Channel, row: usize, col: usize) -> Result<u8, Error> {
        self.planes()?.get(channel, row, col)
    }

    pub fn set(&mut self, channel: Channel, row: usize, col: usize, value: u8) -> Result<(), Error> {
        self.planes_mut()?.set(channel, row, col, value)
    }
}
