//! Report category cycling
//!
//! `ReportCycle` walks the configured categories strictly in order. For each
//! one it makes the category active, waits for the rendering layer to settle,
//! and captures every chart tagged under it in document order. The active
//! category in effect before the run is owned by an `ActiveCategoryGuard` and
//! put back when the guard drops, whichever way the run ends.

use crate::capture::ChartCapturer;
use crate::notify::{ExportEvent, Notifier, Phase};
use crate::surface::RenderSurface;
use crate::{CaptureConfig, CapturedChart, ReportCategory, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::sync::watch;

/// Captured charts per category, in visitation order
pub type CategoryImages = IndexMap<ReportCategory, Vec<CapturedChart>>;

/// Exclusive hold on the surface's active category slot.
///
/// Restores the category that was active at construction when dropped,
/// unless `restore` already did.
pub struct ActiveCategoryGuard<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    original: Option<ReportCategory>,
    restored: bool,
}

impl<'a, S: RenderSurface + ?Sized> ActiveCategoryGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let original = surface.active_category();
        Self {
            surface,
            original,
            restored: false,
        }
    }

    pub fn original(&self) -> Option<ReportCategory> {
        self.original
    }

    pub fn switch_to(&mut self, category: ReportCategory) -> Result<()> {
        self.surface.set_active_category(Some(category))
    }

    /// Restore now and report the outcome instead of only logging it.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.surface.set_active_category(self.original)
    }
}

impl<S: RenderSurface + ?Sized> Deref for ActiveCategoryGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for ActiveCategoryGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for ActiveCategoryGuard<'_, S> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match self.surface.set_active_category(self.original) {
            Ok(()) => debug!("Restored active category {:?}", self.original),
            Err(e) => warn!("Failed to restore active category {:?}: {}", self.original, e),
        }
    }
}

/// Drives one sequential capture pass over every configured category.
pub struct ReportCycle<'c> {
    config: &'c CaptureConfig,
    capturer: &'c ChartCapturer,
    notifier: &'c dyn Notifier,
}

impl<'c> ReportCycle<'c> {
    pub fn new(config: &'c CaptureConfig, capturer: &'c ChartCapturer, notifier: &'c dyn Notifier) -> Self {
        Self { config, capturer, notifier }
    }

    /// Visit every category once and collect its captured charts.
    ///
    /// Failures are contained per chart and per category: a category that
    /// cannot be shown or listed contributes an empty list.
    pub async fn run<S: RenderSurface + ?Sized>(&self, surface: &mut S) -> CategoryImages {
        let mut signal = surface.render_signal();
        let mut guard = ActiveCategoryGuard::new(surface);
        let mut results = CategoryImages::with_capacity(self.config.categories.len());

        for &category in &self.config.categories {
            self.notifier
                .notify(&ExportEvent::Progress(Phase::CapturingCharts(category)));
            info!("Entering category {}", category);

            let images = match guard.switch_to(category) {
                Ok(()) => {
                    settle(signal.as_mut(), category, self.config.category_settle()).await;
                    self.capture_category(&mut *guard, category).await
                }
                Err(e) => {
                    warn!("Could not activate category {}: {}", category, e);
                    Vec::new()
                }
            };

            info!("Category {}: captured {} chart(s)", category, images.len());
            results.insert(category, images);
        }

        let original = guard.original();
        if let Err(e) = guard.restore() {
            warn!("Failed to restore active category {:?}: {}", original, e);
        }
        results
    }

    async fn capture_category<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        category: ReportCategory,
    ) -> Vec<CapturedChart> {
        let charts = match surface.charts(category) {
            Ok(charts) => charts,
            Err(e) => {
                warn!("Could not list charts for category {}: {}", category, e);
                return Vec::new();
            }
        };
        debug!("Category {} has {} chart(s)", category, charts.len());

        let mut captured = Vec::with_capacity(charts.len());
        for chart in &charts {
            // Charts may still be animating in.
            pause(self.config.chart_settle()).await;
            if let Some(c) = self.capturer.capture(surface, chart) {
                captured.push(c);
            }
        }
        captured
    }
}

/// Wait for `category` to finish rendering: on the render signal when there
/// is one (bounded by `delay`), otherwise for the full `delay`. A zero
/// delay does not wait at all.
async fn settle(
    signal: Option<&mut watch::Receiver<Option<ReportCategory>>>,
    category: ReportCategory,
    delay: Duration,
) {
    if delay.is_zero() {
        return;
    }
    let Some(rx) = signal else {
        pause(delay).await;
        return;
    };

    let rendered = async { rx.wait_for(|c| *c == Some(category)).await.map(|_| ()) };
    match tokio::time::timeout(delay, rendered).await {
        Ok(Ok(())) => debug!("Category {} reported rendered", category),
        Ok(Err(_)) => {
            debug!("Render signal closed, waiting out the settle delay");
            pause(delay).await;
        }
        Err(_) => warn!("Category {} did not report rendered within {:?}", category, delay),
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
