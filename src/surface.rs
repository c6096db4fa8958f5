//! In-memory display surfaces.
//!
//! The real panel driver lives outside this crate; these surfaces stand in
//! for it. [`Rgb565Surface`] holds exactly what a HUB75 matrix driver would
//! be handed, [`RgbSurface`] keeps full 24-bit colour and can be exported as
//! a PNG for headless runs.

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use crate::processing::composite::{PixelSink, pack_rgb565};

/// A pixel sink with global brightness, as LED matrix panels have.
pub trait Panel: PixelSink {
    fn set_brightness(&mut self, level: u8);

    fn brightness(&self) -> u8;

    /// Blank the whole surface.
    fn clear(&mut self);
}

impl<P: Panel + ?Sized> Panel for &mut P {
    fn set_brightness(&mut self, level: u8) {
        (**self).set_brightness(level);
    }

    fn brightness(&self) -> u8 {
        (**self).brightness()
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

fn dim(image: &mut RgbImage, brightness: u8) {
    let level = u16::from(brightness);
    for pixel in image.pixels_mut() {
        for channel in &mut pixel.0 {
            *channel = ((u16::from(*channel) * level) / 255) as u8;
        }
    }
}

fn save(img: &RgbImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))
}

fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = u32::try_from(x).ok()?;
    let y = u32::try_from(y).ok()?;
    (x < width && y < height).then_some((x, y))
}

/// Row-major offset, computed in `usize` so large panels cannot wrap.
#[inline]
fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// 16-bit 5-6-5 framebuffer.
#[derive(Debug, Clone)]
pub struct Rgb565Surface {
    width: u32,
    height: u32,
    brightness: u8,
    pixels: Vec<u16>,
}

impl Rgb565Surface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            brightness: u8::MAX,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        pixel_index(self.width, x, y)
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        (x < self.width && y < self.height).then(|| self.pixels[self.index(x, y)])
    }

    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// The framebuffer as native-endian bytes, ready for a DMA transfer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels.as_slice())
    }

    /// Expand back to 8 bits per channel, brightness applied.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut out = RgbImage::from_fn(self.width, self.height, |x, y| {
            let p = self.pixels[self.index(x, y)];
            let r = ((p >> 11) & 0x1F) as u8;
            let g = ((p >> 5) & 0x3F) as u8;
            let b = (p & 0x1F) as u8;
            Rgb([r << 3 | r >> 2, g << 2 | g >> 4, b << 3 | b >> 2])
        });
        dim(&mut out, self.brightness);
        out
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        save(&self.to_rgb_image(), path.as_ref())
    }
}

impl PixelSink for Rgb565Surface {
    type Color = u16;

    fn pack_color(&self, r: u8, g: u8, b: u8) -> u16 {
        pack_rgb565(r, g, b)
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u16) {
        if let Some((x, y)) = in_bounds(x, y, self.width, self.height) {
            let i = self.index(x, y);
            self.pixels[i] = color;
        }
    }
}

impl Panel for Rgb565Surface {
    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// 24-bit surface backed by an [`RgbImage`].
#[derive(Debug, Clone)]
pub struct RgbSurface {
    image: RgbImage,
    brightness: u8,
}

impl RgbSurface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
            brightness: u8::MAX,
        }
    }

    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The surface as it would appear on the panel, brightness applied.
    #[must_use]
    pub fn dimmed(&self) -> RgbImage {
        let mut out = self.image.clone();
        dim(&mut out, self.brightness);
        out
    }

    /// Write the dimmed surface as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        save(&self.dimmed(), path.as_ref())
    }
}

impl PixelSink for RgbSurface {
    type Color = Rgb<u8>;

    fn pack_color(&self, r: u8, g: u8, b: u8) -> Rgb<u8> {
        Rgb([r, g, b])
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb<u8>) {
        if let Some((x, y)) = in_bounds(x, y, self.image.width(), self.image.height()) {
            self.image.put_pixel(x, y, color);
        }
    }
}

impl Panel for RgbSurface {
    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
    }
}
