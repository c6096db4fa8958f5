use std::time::{Duration, Instant};

use glitch_frame::Error;
use glitch_frame::bitmap;
use glitch_frame::catalog::{Catalog, EmbeddedCatalog};
use glitch_frame::config::GlitchOptions;
use glitch_frame::events::PresentationEvent;
use glitch_frame::framebuffer::{Channel, ChannelFramebuffer};
use glitch_frame::presentation::{Presentation, PresentationState, Timings};
use glitch_frame::processing::glitch::{GlitchEngine, GlitchPatch, PatchMode};
use glitch_frame::source::SliceSource;
use glitch_frame::surface::{Panel, Rgb565Surface};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TICK: Duration = Duration::from_millis(10);

/// Bottom-up 24-bit bitmap filled with one colour.
fn solid_bmp(width: usize, height: usize, [r, g, b]: [u8; 3]) -> Vec<u8> {
    let stride = (width * 3).div_ceil(4) * 4;
    let mut out = Vec::with_capacity(54 + stride * height);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&((54 + stride * height) as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.resize(54, 0);
    for _ in 0..height {
        let start = out.len();
        for _ in 0..width {
            out.extend_from_slice(&[b, g, r]);
        }
        out.resize(start + stride, 0);
    }
    out
}

fn timings() -> Timings {
    Timings {
        fade_in: Duration::from_millis(100),
        hold: Duration::from_millis(100),
        fade_out: Duration::from_millis(100),
    }
}

fn engine() -> GlitchEngine {
    GlitchEngine::new(&GlitchOptions::default())
}

#[test]
fn decoded_solid_image_is_unchanged_by_full_frame_shift() {
    let bytes = solid_bmp(8, 8, [255, 0, 0]);
    let fb = bitmap::decode(&mut SliceSource::new(&bytes)).unwrap();
    let before = fb.planes().unwrap().clone();

    let shift = GlitchPatch {
        box_x: 0,
        box_y: 0,
        box_width: 8,
        box_height: 8,
        offset_x: 1,
        offset_y: 0,
        mode: PatchMode::AllChannels,
    };
    let out = engine().apply(&fb, &[shift]).unwrap();

    assert_eq!((out.width(), out.height()), (8, 8));
    for row in 0..8 {
        for col in 0..8 {
            assert_eq!(out.rgb(row, col), Some([255, 0, 0]), "row {row}, col {col}");
        }
    }
    assert_eq!(&out, &before);
    assert_eq!(fb.planes().unwrap(), &before);
    assert!(fb.planes().unwrap().plane(Channel::Green).as_raw().iter().all(|&v| v == 0));

    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..16 {
        assert_eq!(engine().render(&fb, &mut rng).unwrap(), before);
    }
}

#[test]
fn full_cycle_visits_states_in_order_with_monotonic_fades() {
    let catalog = EmbeddedCatalog::new().with("red", solid_bmp(8, 8, [255, 0, 0]));
    let t0 = Instant::now();
    let mut presentation = Presentation::new(catalog, engine(), timings(), (0, 0), t0).unwrap();
    let mut panel = Rgb565Surface::new(8, 8);
    let mut rng = StdRng::seed_from_u64(7);

    let mut entered = Vec::new();
    let mut fade_in = Vec::new();
    let mut fade_out = Vec::new();
    // One full cycle plus the next load.
    for step in 0..33u32 {
        let report = presentation
            .tick(t0 + TICK * step, &mut rng, &mut panel)
            .unwrap();
        match report.state {
            PresentationState::FadeIn => fade_in.push(report.brightness),
            PresentationState::FadeOut => fade_out.push(report.brightness),
            _ => {}
        }
        if let Some(state) = report.entered() {
            entered.push(state);
        }
    }

    use PresentationState::*;
    assert_eq!(
        &entered[..6],
        &[FadeIn, Holding, FadeOut, Retired, Loading, FadeIn]
    );
    assert!(fade_in.windows(2).all(|w| w[0] <= w[1]), "{fade_in:?}");
    assert!(fade_out.windows(2).all(|w| w[0] >= w[1]), "{fade_out:?}");
    assert!(fade_in[0] < 16);
    assert_eq!(fade_out.last(), Some(&0));
    assert!(fade_in.contains(&255));
}

#[test]
fn solid_image_survives_glitching_and_is_cleared_on_retire() {
    let catalog = EmbeddedCatalog::new().with("red", solid_bmp(8, 8, [255, 0, 0]));
    let t0 = Instant::now();
    let mut presentation = Presentation::new(catalog, engine(), timings(), (0, 0), t0).unwrap();
    let mut panel = Rgb565Surface::new(8, 8);
    let mut rng = StdRng::seed_from_u64(11);

    let mut step = 0u32;
    let mut tick = |presentation: &mut Presentation<EmbeddedCatalog>, panel: &mut Rgb565Surface| {
        let report = presentation
            .tick(t0 + TICK * step, &mut rng, panel)
            .unwrap();
        step += 1;
        report
    };

    // Load, then render through fade-in and hold.
    while presentation.session().state() != PresentationState::FadeOut {
        let report = tick(&mut presentation, &mut panel);
        if report.rendered {
            assert!(panel.pixels().iter().all(|&p| p == 0xF800));
        }
    }
    assert!(presentation.session().framebuffer().is_allocated());

    while presentation.session().state() != PresentationState::Loading {
        tick(&mut presentation, &mut panel);
    }
    assert!(!presentation.session().framebuffer().is_allocated());
    assert!(panel.pixels().iter().all(|&p| p == 0));
    assert_eq!(panel.brightness(), 0);
}

#[test]
fn failed_load_stays_in_loading_and_recovers() {
    let catalog = EmbeddedCatalog::new()
        .with("broken", b"not a bitmap at all".to_vec())
        .with("ok", solid_bmp(2, 2, [0, 0, 255]));
    let t0 = Instant::now();
    let mut presentation = Presentation::new(catalog, engine(), timings(), (0, 0), t0).unwrap();
    let mut panel = Rgb565Surface::new(2, 2);
    let mut rng = StdRng::seed_from_u64(3);

    // Entry 0 is first and broken.
    let first = presentation.tick(t0, &mut rng, &mut panel).unwrap();
    assert!(matches!(
        first.event,
        Some(PresentationEvent::LoadFailed { index: 0, .. })
    ));
    assert_eq!(presentation.session().state(), PresentationState::Loading);
    assert!(!presentation.session().framebuffer().is_allocated());

    let mut loaded = false;
    for step in 1..200u32 {
        let report = presentation
            .tick(t0 + TICK * step, &mut rng, &mut panel)
            .unwrap();
        if report.entered() == Some(PresentationState::FadeIn) {
            assert_eq!(report.index, 1);
            loaded = true;
            break;
        }
        assert_eq!(report.state, PresentationState::Loading);
    }
    assert!(loaded, "never recovered from the broken entry");
}

#[test]
fn empty_catalog_is_rejected() {
    let result = Presentation::new(
        EmbeddedCatalog::new(),
        engine(),
        timings(),
        (0, 0),
        Instant::now(),
    );
    assert!(matches!(result, Err(Error::EmptyCatalog)));
}

struct DefectiveCatalog;

impl Catalog for DefectiveCatalog {
    fn len(&self) -> usize {
        1
    }

    fn label(&self, _index: usize) -> String {
        "defective".into()
    }

    fn load(&self, _index: usize) -> Result<ChannelFramebuffer, Error> {
        Err(Error::UseAfterRelease)
    }
}

#[test]
fn lifecycle_defects_propagate() {
    let t0 = Instant::now();
    let mut presentation =
        Presentation::new(DefectiveCatalog, engine(), timings(), (0, 0), t0).unwrap();
    let mut panel = Rgb565Surface::new(1, 1);
    let mut rng = StdRng::seed_from_u64(0);
    let err = presentation.tick(t0, &mut rng, &mut panel).unwrap_err();
    assert!(matches!(err, Error::UseAfterRelease));
}

#[test]
fn origin_offsets_the_composited_frame() {
    let options = GlitchOptions {
        enabled: false,
        ..GlitchOptions::default()
    };
    let catalog = EmbeddedCatalog::new().with("green", solid_bmp(2, 2, [0, 255, 0]));
    let t0 = Instant::now();
    let mut presentation =
        Presentation::new(catalog, GlitchEngine::new(&options), timings(), (3, 1), t0).unwrap();
    let mut panel = Rgb565Surface::new(4, 4);
    let mut rng = StdRng::seed_from_u64(5);
    presentation.tick(t0, &mut rng, &mut panel).unwrap();
    presentation.tick(t0 + TICK, &mut rng, &mut panel).unwrap();

    assert_eq!(panel.pixel(3, 1), Some(0x07E0));
    assert_eq!(panel.pixel(3, 2), Some(0x07E0));
    // Column 4 is off the panel and clipped.
    assert_eq!(panel.pixel(2, 1), Some(0));
    assert_eq!(panel.pixel(0, 0), Some(0));
}
