//! YAML configuration for the slideshow, display and glitch effect.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::presentation::Timings;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directory scanned recursively for `.bmp` images.
    pub library_path: Option<PathBuf>,
    /// Explicit ordered image list; used instead of scanning when non-empty.
    pub images: Vec<PathBuf>,
    /// Time to ramp brightness from black to full.
    #[serde(with = "humantime_serde")]
    pub fade_in: Duration,
    /// Time an image stays at full brightness.
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    /// Time to ramp brightness from full back to black.
    #[serde(with = "humantime_serde")]
    pub fade_out: Duration,
    /// Interval between ticks of the presentation loop.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Optional deterministic seed for glitch patches and image selection.
    pub seed: Option<u64>,
    pub glitch: GlitchOptions,
    pub display: DisplayOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.tick_interval.is_zero(),
            "tick-interval must be greater than zero"
        );
        ensure!(
            self.library_path.is_some() || !self.images.is_empty(),
            "either library-path or images must be set"
        );
        self.glitch.validate()?;
        self.display.validate()?;
        Ok(self)
    }

    #[must_use]
    pub const fn timings(&self) -> Timings {
        Timings {
            fade_in: self.fade_in,
            hold: self.hold,
            fade_out: self.fade_out,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            library_path: None,
            images: Vec::new(),
            fade_in: Duration::from_millis(500),
            hold: Duration::from_secs(2),
            fade_out: Duration::from_millis(500),
            tick_interval: Duration::from_millis(16),
            seed: None,
            glitch: GlitchOptions::default(),
            display: DisplayOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GlitchOptions {
    /// Draw frames untouched when false.
    pub enabled: bool,
    /// Number of random patches composited into each frame.
    pub patches_per_frame: usize,
    /// Largest displacement, in pixels, a patch may shift along either axis.
    pub max_offset: u32,
}

impl GlitchOptions {
    const MAX_OFFSET_LIMIT: u32 = 64;

    fn validate(&self) -> Result<()> {
        if self.enabled {
            ensure!(
                self.patches_per_frame >= 1,
                "glitch.patches-per-frame must be >= 1 when glitching is enabled"
            );
        }
        ensure!(
            self.max_offset <= Self::MAX_OFFSET_LIMIT,
            "glitch.max-offset must be <= {}",
            Self::MAX_OFFSET_LIMIT
        );
        Ok(())
    }
}

impl Default for GlitchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            patches_per_frame: 4,
            max_offset: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    /// 16-bit 5-6-5 packing, as HUB75 matrix drivers take it.
    #[default]
    Rgb565,
    /// 24-bit passthrough.
    Rgb888,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DisplayOptions {
    pub width: u32,
    pub height: u32,
    /// Top-left position the image is composited at.
    pub origin: [i32; 2],
    /// Brightness before the first fade starts (0-255).
    pub initial_brightness: u8,
    pub format: PixelFormat,
}

impl DisplayOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "display.width and display.height must be greater than zero"
        );
        Ok(())
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            origin: [0, 0],
            initial_brightness: 128,
            format: PixelFormat::default(),
        }
    }
}
