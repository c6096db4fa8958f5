//! Per-frame glitch: random rectangular patches shifted with toroidal wrap.
//!
//! Patches pull from the untouched original into a working copy, so the
//! decoded framebuffer is never modified and overlapping patches do not
//! compound.

use rand::Rng;
use tracing::trace;

use crate::config::GlitchOptions;
use crate::error::Error;
use crate::framebuffer::{Channel, ChannelFramebuffer, Planes};

/// Toroidal wrap of `value` into `[0, len)`.
///
/// `len` must be non-zero.
#[inline]
#[must_use]
pub fn wrap(value: i64, len: usize) -> usize {
    debug_assert!(len > 0, "wrap modulus must be positive");
    value.rem_euclid(len as i64) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// Shift the whole chunk, all three channels together.
    AllChannels,
    /// Shift a single channel (chromatic aberration).
    Single(Channel),
}

/// One rectangular displacement, generated and discarded within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlitchPatch {
    /// Anchor column; may be negative, the box wraps around the canvas.
    pub box_x: i64,
    /// Anchor row; may be negative.
    pub box_y: i64,
    pub box_width: usize,
    pub box_height: usize,
    pub offset_x: i64,
    pub offset_y: i64,
    pub mode: PatchMode,
}

#[derive(Debug, Clone)]
pub struct GlitchEngine {
    enabled: bool,
    patches_per_frame: usize,
    max_offset: u32,
}

impl GlitchEngine {
    #[must_use]
    pub fn new(options: &GlitchOptions) -> Self {
        Self {
            enabled: options.enabled,
            patches_per_frame: options.patches_per_frame,
            max_offset: options.max_offset,
        }
    }

    #[must_use]
    pub const fn patches_per_frame(&self) -> usize {
        self.patches_per_frame
    }

    /// Draw one random patch for a `width × height` canvas.
    ///
    /// Both dimensions must be non-zero.
    pub fn generate_patch<R: Rng + ?Sized>(
        &self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> GlitchPatch {
        let (w, h) = (width as i64, height as i64);
        let box_x = rng.random_range(-(w / 2)..w);
        let box_y = rng.random_range(-(h / 2)..h);
        let box_width = rng.random_range(width / 4..width);
        let box_height = rng.random_range(height / 4..height);
        let all_channels = rng.random_bool(0.5);
        // Drawn regardless of mode so the sequence of draws is fixed per patch.
        let channel = Channel::ALL[rng.random_range(0..Channel::ALL.len())];
        let offset_x = self.draw_offset(rng);
        let offset_y = self.draw_offset(rng);

        GlitchPatch {
            box_x,
            box_y,
            box_width,
            box_height,
            offset_x,
            offset_y,
            mode: if all_channels {
                PatchMode::AllChannels
            } else {
                PatchMode::Single(channel)
            },
        }
    }

    fn draw_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let magnitude = i64::from(rng.random_range(0..=self.max_offset));
        if rng.random_bool(0.5) {
            magnitude
        } else {
            -magnitude
        }
    }

    /// The patch list for one frame. Empty when disabled or for an empty canvas.
    pub fn generate_patches<R: Rng + ?Sized>(
        &self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Vec<GlitchPatch> {
        if !self.enabled || width == 0 || height == 0 {
            return Vec::new();
        }
        (0..self.patches_per_frame)
            .map(|_| self.generate_patch(width, height, rng))
            .collect()
    }

    /// Produce this frame's glitched working copy of `fb`.
    ///
    /// The framebuffer is only borrowed; its planes are never modified.
    ///
    /// # Errors
    /// [`Error::UseAfterRelease`] if `fb` holds no image.
    pub fn render<R: Rng + ?Sized>(
        &self,
        fb: &ChannelFramebuffer,
        rng: &mut R,
    ) -> Result<Planes, Error> {
        let original = fb.planes()?;
        let patches = self.generate_patches(original.width(), original.height(), rng);
        for patch in &patches {
            trace!(?patch, "glitch patch");
        }
        Ok(apply_patches(original, &patches))
    }

    /// Apply an explicit patch list to `fb`.
    ///
    /// # Errors
    /// [`Error::UseAfterRelease`] if `fb` holds no image.
    pub fn apply(&self, fb: &ChannelFramebuffer, patches: &[GlitchPatch]) -> Result<Planes, Error> {
        let original = fb.planes()?;
        if !self.enabled {
            return Ok(original.clone());
        }
        Ok(apply_patches(original, patches))
    }
}

/// Apply `patches` in order to a copy of `original`.
///
/// Every patch reads from `original`, never from the copy, so overlapping
/// patches overwrite each other instead of compounding.
#[must_use]
pub fn apply_patches(original: &Planes, patches: &[GlitchPatch]) -> Planes {
    let mut working = original.clone();
    for patch in patches {
        apply_patch(original, &mut working, patch);
    }
    working
}

fn apply_patch(original: &Planes, working: &mut Planes, patch: &GlitchPatch) {
    let (width, height) = (original.width(), original.height());
    if width == 0 || height == 0 {
        return;
    }
    for by in 0..patch.box_height {
        let y = patch.box_y + by as i64;
        let dst_row = wrap(y, height);
        let src_row = wrap(y + patch.offset_y, height);
        for bx in 0..patch.box_width {
            let x = patch.box_x + bx as i64;
            let dst_col = wrap(x, width);
            let src_col = wrap(x + patch.offset_x, width);
            match patch.mode {
                PatchMode::AllChannels => {
                    for channel in Channel::ALL {
                        pull(original, working, channel, (src_row, src_col), (dst_row, dst_col));
                    }
                }
                PatchMode::Single(channel) => {
                    pull(original, working, channel, (src_row, src_col), (dst_row, dst_col));
                }
            }
        }
    }
}

#[inline]
fn pull(
    original: &Planes,
    working: &mut Planes,
    channel: Channel,
    (src_row, src_col): (usize, usize),
    (dst_row, dst_col): (usize, usize),
) {
    if let (Some(value), Some(slot)) = (
        original.plane(channel).get(src_row, src_col),
        working.plane_mut(channel).get_mut(dst_row, dst_col),
    ) {
        *slot = value;
    }
}
