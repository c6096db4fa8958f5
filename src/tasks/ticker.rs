//! Async fixed-rate driver for the presentation controller.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::select;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::events::PresentationEvent;
use crate::presentation::{Presentation, PresentationState};
use crate::surface::Panel;

#[derive(Debug, Clone, Copy)]
pub struct TickerOptions {
    pub interval: Duration,
    /// Stop after this many ticks; run until cancelled when `None`.
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerSummary {
    pub ticks: u64,
    /// Images shown all the way through to `Retired`.
    pub cycles: u64,
    pub load_failures: u64,
}

/// Drive `presentation` from a fixed-rate timer until cancelled or
/// `max_ticks` is reached.
pub async fn run<C, P, R>(
    presentation: &mut Presentation<C>,
    panel: &mut P,
    rng: &mut R,
    options: TickerOptions,
    cancel: CancellationToken,
) -> Result<TickerSummary>
where
    C: Catalog,
    P: Panel + ?Sized,
    R: Rng + ?Sized,
{
    let mut interval = time::interval(options.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = TickerSummary::default();

    loop {
        if options.max_ticks.is_some_and(|max| summary.ticks >= max) {
            debug!(ticks = summary.ticks, "tick budget reached");
            break;
        }
        let now = select! {
            biased;
            _ = cancel.cancelled() => break,
            at = interval.tick() => at.into_std(),
        };

        let report = presentation
            .tick(now, rng, panel)
            .with_context(|| format!("presentation tick {} failed", summary.ticks))?;
        summary.ticks += 1;
        match report.event {
            Some(PresentationEvent::Transitioned {
                to: PresentationState::Retired,
                ..
            }) => summary.cycles += 1,
            Some(PresentationEvent::LoadFailed { .. }) => summary.load_failures += 1,
            _ => {}
        }
    }

    info!(
        ticks = summary.ticks,
        cycles = summary.cycles,
        load_failures = summary.load_failures,
        "ticker stopped"
    );
    Ok(summary)
}
