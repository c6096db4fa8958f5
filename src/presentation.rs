//! Fade state machine that owns the live framebuffer.
//!
//! ```text
//! Loading --decoded--> FadeIn --fade-in--> Holding --hold--> FadeOut --fade-out--> Retired
//!    ^                                                                                |
//!    +---------------------------- release, pick next --------------------------------+
//! ```
//!
//! The machine is driven purely by `tick` calls carrying a monotonic
//! timestamp; it never sleeps or spawns anything. All timing decisions live
//! in [`advance`], the controller only carries out the effects it asks for.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::Configuration;
use crate::error::Error;
use crate::events::{PresentationEvent, TickReport};
use crate::framebuffer::ChannelFramebuffer;
use crate::processing::composite::composite;
use crate::processing::glitch::GlitchEngine;
use crate::surface::Panel;

pub const MAX_BRIGHTNESS: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationState {
    Loading,
    FadeIn,
    Holding,
    FadeOut,
    Retired,
}

impl PresentationState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::FadeIn => "fade-in",
            Self::Holding => "holding",
            Self::FadeOut => "fade-out",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for PresentationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub fade_in: Duration,
    pub hold: Duration,
    pub fade_out: Duration,
}

/// Work the controller performs before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Decode the current catalog entry. The transition only happens if it succeeds.
    Load,
    /// Free the framebuffer and choose the next entry.
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Option<PresentationState>,
    pub effect: Option<Effect>,
    pub brightness: Option<u8>,
    pub render: bool,
}

/// Slow start, fast finish.
#[must_use]
pub fn ease_in(progress: f32) -> f32 {
    progress * progress
}

/// Fast start, slow finish.
#[must_use]
pub fn ease_out(progress: f32) -> f32 {
    let inv = 1.0 - progress;
    1.0 - inv * inv
}

fn progress(elapsed: Duration, total: Duration) -> f32 {
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

fn level(fraction: f32) -> u8 {
    (fraction.clamp(0.0, 1.0) * f32::from(MAX_BRIGHTNESS)) as u8
}

/// Decide what a tick in `state` does, `elapsed` after the state was entered.
#[must_use]
pub fn advance(state: PresentationState, elapsed: Duration, timings: &Timings) -> Transition {
    use PresentationState::*;

    let stay = Transition {
        next: None,
        effect: None,
        brightness: None,
        render: true,
    };
    match state {
        Loading => Transition {
            next: Some(FadeIn),
            effect: Some(Effect::Load),
            brightness: Some(0),
            render: false,
        },
        FadeIn if elapsed < timings.fade_in => Transition {
            brightness: Some(level(ease_in(progress(elapsed, timings.fade_in)))),
            ..stay
        },
        FadeIn => Transition {
            next: Some(Holding),
            brightness: Some(MAX_BRIGHTNESS),
            ..stay
        },
        Holding if elapsed >= timings.hold => Transition {
            next: Some(FadeOut),
            ..stay
        },
        Holding => stay,
        FadeOut if elapsed < timings.fade_out => Transition {
            brightness: Some(level(1.0 - ease_out(progress(elapsed, timings.fade_out)))),
            ..stay
        },
        FadeOut => Transition {
            next: Some(Retired),
            brightness: Some(0),
            ..stay
        },
        Retired => Transition {
            next: Some(Loading),
            effect: Some(Effect::Release),
            brightness: None,
            render: false,
        },
    }
}

/// Everything that changes from tick to tick.
#[derive(Debug)]
pub struct Session {
    state: PresentationState,
    current_index: usize,
    transition_start: Instant,
    framebuffer: ChannelFramebuffer,
}

impl Session {
    #[must_use]
    pub const fn state(&self) -> PresentationState {
        self.state
    }

    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub const fn transition_start(&self) -> Instant {
        self.transition_start
    }

    #[must_use]
    pub const fn framebuffer(&self) -> &ChannelFramebuffer {
        &self.framebuffer
    }
}

pub struct Presentation<C> {
    catalog: C,
    engine: GlitchEngine,
    timings: Timings,
    origin: (i32, i32),
    session: Session,
}

impl<C: Catalog> Presentation<C> {
    /// Start in `Loading` with the first catalog entry.
    ///
    /// # Errors
    /// [`Error::EmptyCatalog`] if there is nothing to show.
    pub fn new(
        catalog: C,
        engine: GlitchEngine,
        timings: Timings,
        origin: (i32, i32),
        now: Instant,
    ) -> Result<Self, Error> {
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self {
            catalog,
            engine,
            timings,
            origin,
            session: Session {
                state: PresentationState::Loading,
                current_index: 0,
                transition_start: now,
                framebuffer: ChannelFramebuffer::new(),
            },
        })
    }

    /// Build from the glitch, timing and display origin settings of `cfg`.
    ///
    /// # Errors
    /// [`Error::EmptyCatalog`] if there is nothing to show.
    pub fn from_config(catalog: C, cfg: &Configuration, now: Instant) -> Result<Self, Error> {
        let [x, y] = cfg.display.origin;
        Self::new(
            catalog,
            GlitchEngine::new(&cfg.glitch),
            cfg.timings(),
            (x, y),
            now,
        )
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Run one tick at time `now`.
    ///
    /// Decode failures are reported in the returned [`TickReport`] and the
    /// machine stays in `Loading` with a different entry selected.
    ///
    /// # Errors
    /// Lifecycle and bounds defects only.
    pub fn tick<R, P>(&mut self, now: Instant, rng: &mut R, panel: &mut P) -> Result<TickReport, Error>
    where
        R: Rng + ?Sized,
        P: Panel + ?Sized,
    {
        let from = self.session.state;
        let index = self.session.current_index;
        let elapsed = now.saturating_duration_since(self.session.transition_start);
        let transition = advance(from, elapsed, &self.timings);

        match transition.effect {
            Some(Effect::Load) => {
                if let Err(err) = self.load_current() {
                    if err.is_defect() {
                        return Err(err);
                    }
                    warn!(image = %self.catalog.label(index), error = %err, "failed to load image");
                    self.session.current_index = self.pick_next(rng);
                    return Ok(TickReport {
                        state: from,
                        index,
                        brightness: panel.brightness(),
                        rendered: false,
                        event: Some(PresentationEvent::LoadFailed {
                            index,
                            reason: err.to_string(),
                        }),
                    });
                }
            }
            Some(Effect::Release) => {
                self.session.framebuffer.release();
                panel.clear();
                self.session.current_index = self.pick_next(rng);
                debug!(next = self.session.current_index, "image retired");
            }
            None => {}
        }

        if transition.render {
            let working = self.engine.render(&self.session.framebuffer, rng)?;
            composite(&working, self.origin.0, self.origin.1, panel);
        }
        if let Some(level) = transition.brightness {
            panel.set_brightness(level);
        }

        let mut event = None;
        if let Some(to) = transition.next {
            info!(%from, %to, image = index, "presentation transition");
            self.session.state = to;
            self.session.transition_start = now;
            event = Some(PresentationEvent::Transitioned { from, to });
        }

        Ok(TickReport {
            state: from,
            index,
            brightness: panel.brightness(),
            rendered: transition.render,
            event,
        })
    }

    fn load_current(&mut self) -> Result<(), Error> {
        if self.session.framebuffer.is_allocated() {
            return Err(Error::DoubleAllocation);
        }
        let index = self.session.current_index;
        let framebuffer = self.catalog.load(index)?;
        info!(
            image = %self.catalog.label(index),
            width = framebuffer.width(),
            height = framebuffer.height(),
            "image loaded"
        );
        self.session.framebuffer = framebuffer;
        Ok(())
    }

    fn pick_next<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.random_range(0..self.catalog.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PresentationState::*;

    fn timings() -> Timings {
        Timings {
            fade_in: Duration::from_millis(100),
            hold: Duration::from_millis(200),
            fade_out: Duration::from_millis(100),
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn loading_asks_for_load_without_render() {
        let t = advance(Loading, ms(0), &timings());
        assert_eq!(t.effect, Some(Effect::Load));
        assert_eq!(t.next, Some(FadeIn));
        assert!(!t.render);
    }

    #[test]
    fn fade_in_eases_then_snaps_to_full() {
        let t = timings();
        assert_eq!(advance(FadeIn, ms(0), &t).brightness, Some(0));
        // 50% progress eased in is 25% brightness.
        assert_eq!(advance(FadeIn, ms(50), &t).brightness, Some(63));
        assert_eq!(advance(FadeIn, ms(50), &t).next, None);
        let done = advance(FadeIn, ms(100), &t);
        assert_eq!(done.brightness, Some(MAX_BRIGHTNESS));
        assert_eq!(done.next, Some(Holding));
        assert!(done.render);
    }

    #[test]
    fn holding_renders_until_duration() {
        let t = timings();
        let mid = advance(Holding, ms(199), &t);
        assert!(mid.render);
        assert_eq!((mid.next, mid.brightness), (None, None));
        assert_eq!(advance(Holding, ms(200), &t).next, Some(FadeOut));
    }

    #[test]
    fn fade_out_eases_then_snaps_to_black() {
        let t = timings();
        assert_eq!(advance(FadeOut, ms(0), &t).brightness, Some(MAX_BRIGHTNESS));
        // 50% progress eased out leaves 25% brightness.
        assert_eq!(advance(FadeOut, ms(50), &t).brightness, Some(63));
        let done = advance(FadeOut, ms(100), &t);
        assert_eq!(done.brightness, Some(0));
        assert_eq!(done.next, Some(Retired));
    }

    #[test]
    fn retired_releases_and_loops() {
        let t = advance(Retired, ms(0), &timings());
        assert_eq!(t.effect, Some(Effect::Release));
        assert_eq!(t.next, Some(Loading));
        assert!(!t.render);
    }

    #[test]
    fn zero_durations_snap_immediately() {
        let t = Timings {
            fade_in: Duration::ZERO,
            hold: Duration::ZERO,
            fade_out: Duration::ZERO,
        };
        assert_eq!(advance(FadeIn, ms(0), &t).next, Some(Holding));
        assert_eq!(advance(Holding, ms(0), &t).next, Some(FadeOut));
        assert_eq!(advance(FadeOut, ms(0), &t).next, Some(Retired));
    }

    #[test]
    fn fade_curves_are_monotonic() {
        let t = timings();
        let mut last_in = 0u8;
        let mut last_out = MAX_BRIGHTNESS;
        for step in 0..=100 {
            let fin = advance(FadeIn, ms(step), &t).brightness.unwrap();
            let fout = advance(FadeOut, ms(step), &t).brightness.unwrap();
            assert!(fin >= last_in);
            assert!(fout <= last_out);
            last_in = fin;
            last_out = fout;
        }
    }
}
