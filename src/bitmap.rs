//! Decoder for uncompressed 24-bit bitmaps.
//!
//! Only the handful of header fields the pipeline needs are read, each from
//! its fixed offset regardless of which info-header variant follows:
//!
//! | offset | size | field                |
//! |--------|------|----------------------|
//! | 0      | 2    | signature `BM`       |
//! | 10     | 4    | pixel data offset    |
//! | 18     | 4    | width (signed)       |
//! | 22     | 4    | height (signed)      |
//! | 28     | 2    | bits per pixel       |
//!
//! Rows are padded to a multiple of four bytes and, for a positive height,
//! stored bottom row first. Pixels are stored blue, green, red.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::Error;
use crate::framebuffer::ChannelFramebuffer;
use crate::source::{ByteSource, StreamSource};

/// `BM` read as a little-endian u16.
pub const SIGNATURE: u16 = 0x4D42;
/// The only pixel depth the decoder accepts.
pub const SUPPORTED_BITS_PER_PIXEL: u16 = 24;

const PIXEL_DATA_OFFSET_AT: u64 = 10;
const WIDTH_AT: u64 = 18;
const HEIGHT_AT: u64 = 22;
const BITS_PER_PIXEL_AT: u64 = 28;

/// Header fields of one bitmap, parsed once per decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub signature: u16,
    pub pixel_data_offset: u32,
    pub width: i32,
    pub height: i32,
    pub bits_per_pixel: u16,
}

impl BitmapHeader {
    /// Read and validate the header.
    ///
    /// # Errors
    /// [`Error::InvalidFormat`] for a bad signature, an empty image or
    /// dimensions whose pixel data size overflows,
    /// [`Error::UnsupportedEncoding`] for anything but 24 bits per pixel,
    /// [`Error::Io`] if the header cannot be read or the source is shorter
    /// than the pixel data the header declares.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self, Error> {
        let signature = source.read_u16_le(0)?;
        if signature != SIGNATURE {
            return Err(Error::InvalidFormat("missing BM signature"));
        }

        let header = Self {
            signature,
            pixel_data_offset: source.read_u32_le(PIXEL_DATA_OFFSET_AT)?,
            width: source.read_i32_le(WIDTH_AT)?,
            height: source.read_i32_le(HEIGHT_AT)?,
            bits_per_pixel: source.read_u16_le(BITS_PER_PIXEL_AT)?,
        };
        debug!(
            width = header.width,
            height = header.height,
            bpp = header.bits_per_pixel,
            "bitmap header"
        );

        if header.bits_per_pixel != SUPPORTED_BITS_PER_PIXEL {
            return Err(Error::UnsupportedEncoding(header.bits_per_pixel));
        }
        if header.width <= 0 || header.height == 0 {
            return Err(Error::InvalidFormat("image has no pixels"));
        }

        let end = header
            .pixel_data_len()
            .and_then(|len| len.checked_add(u64::from(header.pixel_data_offset)))
            .ok_or(Error::InvalidFormat("image dimensions overflow"))?;
        let available = source.byte_len()?;
        if end > available {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("pixel data ends at byte {end} but the source holds {available}"),
            )));
        }
        Ok(header)
    }

    /// Bytes of stored pixel data: padded stride times height, or `None` on overflow.
    #[must_use]
    pub fn pixel_data_len(&self) -> Option<u64> {
        let stride = u64::from(self.width.unsigned_abs())
            .checked_mul(3)?
            .div_ceil(4)
            .checked_mul(4)?;
        stride.checked_mul(u64::from(self.height.unsigned_abs()))
    }

    #[must_use]
    pub const fn pixel_width(&self) -> usize {
        self.width.unsigned_abs() as usize
    }

    #[must_use]
    pub const fn pixel_height(&self) -> usize {
        self.height.unsigned_abs() as usize
    }

    /// Negative heights mark rows stored top row first.
    #[must_use]
    pub const fn is_top_down(&self) -> bool {
        self.height < 0
    }

    /// Bytes per stored row: `width * 3` rounded up to a multiple of four.
    #[must_use]
    pub const fn row_stride(&self) -> usize {
        (self.pixel_width() * 3).div_ceil(4) * 4
    }

    /// Absolute offset of the stored row holding visual row `row`
    /// (row 0 is the top of the picture).
    #[must_use]
    pub const fn row_offset(&self, row: usize) -> u64 {
        let stored = if self.is_top_down() {
            row
        } else {
            self.pixel_height() - 1 - row
        };
        self.pixel_data_offset as u64 + (stored * self.row_stride()) as u64
    }
}

/// Visit every row top to bottom as `(row, bgr_bytes)`.
///
/// Each row is read with the full padded stride; only the first `width * 3`
/// bytes are handed to `visit`.
///
/// # Errors
/// Any read failure, or whatever `visit` returns.
pub fn read_rows<S, F>(source: &mut S, header: &BitmapHeader, mut visit: F) -> Result<(), Error>
where
    S: ByteSource + ?Sized,
    F: FnMut(usize, &[u8]) -> Result<(), Error>,
{
    let mut row_buf = vec![0u8; header.row_stride()];
    let meaningful = header.pixel_width() * 3;
    for row in 0..header.pixel_height() {
        source.read_at(header.row_offset(row), &mut row_buf)?;
        visit(row, &row_buf[..meaningful])?;
    }
    Ok(())
}

/// Decode into a fresh framebuffer.
///
/// # Errors
/// See [`decode_into`].
pub fn decode<S: ByteSource + ?Sized>(source: &mut S) -> Result<ChannelFramebuffer, Error> {
    let mut fb = ChannelFramebuffer::new();
    decode_into(source, &mut fb)?;
    Ok(fb)
}

/// Decode into `fb`, which must be unallocated.
///
/// The header, including the size of the pixel data it declares, is
/// validated before anything is allocated; if a row read still fails half
/// way the partially filled planes are released again.
///
/// # Errors
/// Header errors from [`BitmapHeader::read`], [`Error::DoubleAllocation`] if
/// `fb` already holds an image, or [`Error::Io`] for truncated pixel data.
pub fn decode_into<S: ByteSource + ?Sized>(
    source: &mut S,
    fb: &mut ChannelFramebuffer,
) -> Result<(), Error> {
    let header = BitmapHeader::read(source)?;
    fb.allocate(header.pixel_width(), header.pixel_height())?;

    let filled = fb.planes_mut().and_then(|planes| {
        read_rows(source, &header, |row, bgr| {
            let [red, green, blue] = planes.rows_mut(row).ok_or(Error::UseAfterRelease)?;
            for (col, px) in bgr.chunks_exact(3).enumerate() {
                blue[col] = px[0];
                green[col] = px[1];
                red[col] = px[2];
            }
            Ok(())
        })
    });
    if let Err(err) = filled {
        fb.release();
        return Err(err);
    }

    debug!(
        width = header.pixel_width(),
        height = header.pixel_height(),
        "bitmap decoded into framebuffer"
    );
    Ok(())
}

/// Open and decode a bitmap file.
///
/// # Errors
/// [`Error::Io`] if the file cannot be opened, otherwise as [`decode`].
pub fn decode_file(path: impl AsRef<Path>) -> Result<ChannelFramebuffer, Error> {
    let mut source = StreamSource::open(path)?;
    decode(&mut source)
}
