//! Drawing channel planes or raw bitmaps onto a pixel sink.

use crate::bitmap::{BitmapHeader, read_rows};
use crate::error::Error;
use crate::framebuffer::Planes;
use crate::source::ByteSource;

/// Destination surface the pipeline draws onto.
///
/// The sink decides its own colour representation and is responsible for
/// clipping writes that land outside it.
pub trait PixelSink {
    type Color: Copy;

    fn pack_color(&self, r: u8, g: u8, b: u8) -> Self::Color;

    fn set_pixel(&mut self, x: i32, y: i32, color: Self::Color);
}

impl<S: PixelSink + ?Sized> PixelSink for &mut S {
    type Color = S::Color;

    fn pack_color(&self, r: u8, g: u8, b: u8) -> Self::Color {
        (**self).pack_color(r, g, b)
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Self::Color) {
        (**self).set_pixel(x, y, color);
    }
}

/// 8-bit RGB to 16-bit 5-6-5.
#[inline]
#[must_use]
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    (((r as u16) >> 3) << 11) | (((g as u16) >> 2) << 5) | ((b as u16) >> 3)
}

/// Panel coordinate `index` pixels past `origin`, saturating at the `i32`
/// range so far-off destinations stay off-surface instead of wrapping.
#[inline]
fn offset(origin: i32, index: usize) -> i32 {
    origin.saturating_add(i32::try_from(index).unwrap_or(i32::MAX))
}

/// Write every pixel of `planes` to `sink`, top-left at `(dest_x, dest_y)`.
///
/// Issues exactly `width * height` writes, whatever the destination.
pub fn composite<S: PixelSink + ?Sized>(planes: &Planes, dest_x: i32, dest_y: i32, sink: &mut S) {
    for row in 0..planes.height() {
        for col in 0..planes.width() {
            let Some([r, g, b]) = planes.rgb(row, col) else {
                continue;
            };
            let color = sink.pack_color(r, g, b);
            sink.set_pixel(offset(dest_x, col), offset(dest_y, row), color);
        }
    }
}

/// Decode a bitmap straight onto `sink` without keeping a framebuffer.
///
/// Used for static screens that never glitch, where holding three planes
/// would only cost memory.
pub fn draw_direct<B, S>(
    source: &mut B,
    dest_x: i32,
    dest_y: i32,
    sink: &mut S,
) -> Result<(), Error>
where
    B: ByteSource + ?Sized,
    S: PixelSink + ?Sized,
{
    let header = BitmapHeader::read(source)?;
    read_rows(source, &header, |row, bgr| {
        for (col, px) in bgr.chunks_exact(3).enumerate() {
            let color = sink.pack_color(px[2], px[1], px[0]);
            sink.set_pixel(offset(dest_x, col), offset(dest_y, row), color);
        }
        Ok(())
    })
}
