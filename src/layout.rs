//! Multi-card compositions.
//!
//! Both layouts render every card with [`CardRenderer::render`] first, then
//! place the finished rasters on a shared transparent canvas:
//!
//! ```text
//!   album                          fan
//!  +------------------------+
//!  |  [0]   [1]   [2]       |        [1] [2]
//!  |  [3]   [4]             |     [0]       [3]
//!  +------------------------+    (arc, tilted outward)
//! ```
//!
//! The cancel signal is polled inside each card render and again at
//! [`Checkpoint::BetweenCards`], so a long list stops after the card in
//! flight.

use image::{Rgba, RgbaImage, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::asset::AssetStore;
use crate::deadline::{CancelSignal, Checkpoint, DeadlineGuard};
use crate::error::{RenderError, RenderResult};
use crate::frame::SizePx;
use crate::layer::{composite_over, paint_replace};
use crate::renderer::CardRenderer;
use crate::request::RenderRequest;

// ============================================================================
// Album
// ============================================================================

/// Grid placement for an album: equal cells sized to the largest card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlbumLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell: SizePx,
    pub padding: u32,
}

impl AlbumLayout {
    /// Widens the grid a little so albums come out landscape.
    pub const ASPECT_BIAS: f32 = 1.35;

    /// Gap around and between cells, in pixels.
    pub const PADDING: u32 = 20;

    /// Lays out `count` cards: `cols = ceil(sqrt(1.35 * count))`, capped at
    /// `count`, and as many rows as needed.
    pub fn new(count: usize, cell: SizePx, padding: u32) -> Self {
        let count = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
        let cols = ((Self::ASPECT_BIAS * count as f32).sqrt().ceil() as u32).clamp(1, count);
        let rows = count.div_ceil(cols);

        Self {
            cols,
            rows,
            cell,
            padding,
        }
    }

    pub fn canvas_size(&self) -> SizePx {
        SizePx::new(
            self.cols * self.cell.width + (self.cols + 1) * self.padding,
            self.rows * self.cell.height + (self.rows + 1) * self.padding,
        )
    }

    /// Top-left corner of the cell holding card `index`.
    pub fn cell_origin(&self, index: usize) -> (i64, i64) {
        let index = index as u64;
        let col = index % u64::from(self.cols);
        let row = index / u64::from(self.cols);
        let pad = u64::from(self.padding);

        (
            (pad + col * (u64::from(self.cell.width) + pad)) as i64,
            (pad + row * (u64::from(self.cell.height) + pad)) as i64,
        )
    }
}

// ============================================================================
// Fan
// ============================================================================

/// Where one card of a fan sits, relative to the apex of the arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanSlot {
    /// Horizontal offset of the card center.
    pub x: f32,
    /// Drop of the card center below the apex.
    pub y: f32,
    /// Tilt in radians, positive to the right.
    pub angle: f32,
}

/// Angle between neighbouring cards, in degrees.
pub const FAN_CARD_ANGLE: f32 = 5.0;

/// Distance from the card centers to the pivot of the arc.
pub const FAN_RADIUS: f32 = 2000.0;

/// Spreads `count` cards symmetrically along the arc.
pub fn fan_slots(count: usize) -> Vec<FanSlot> {
    (0..count)
        .map(|i| {
            let position = i as f32 - count as f32 / 2.0 + 0.5;
            let angle = (FAN_CARD_ANGLE * position).to_radians();
            FanSlot {
                x: FAN_RADIUS * angle.sin(),
                y: (FAN_RADIUS * angle.cos() - FAN_RADIUS).abs(),
                angle,
            }
        })
        .collect()
}

/// Paint order for a fan: outermost pairs first (right, then left), the
/// middle card last so it ends up on top.
pub fn fan_stacking_order(count: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(count);
    for i in 0..count / 2 {
        order.push(count - i - 1);
        order.push(i);
    }
    if count % 2 == 1 {
        order.push(count / 2);
    }
    order
}

/// Rotates a card clockwise by `angle` radians on a canvas large enough to
/// hold every corner.
fn tilt(card: RgbaImage, angle: f32) -> RgbaImage {
    let mut degrees = angle.to_degrees().round();
    let mut card = card;

    // Quarter turns are exact; only the remainder gets resampled
    if degrees > 45.0 && degrees < 135.0 {
        degrees -= 90.0;
        card = imageops::rotate90(&card);
    } else if degrees < -45.0 && degrees > -135.0 {
        degrees += 90.0;
        card = imageops::rotate270(&card);
    }
    if degrees == 0.0 {
        return card;
    }

    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = card.dimensions();
    let bound_w = ((w as f32 * cos.abs() + h as f32 * sin.abs()).ceil() as u32).max(w);
    let bound_h = ((w as f32 * sin.abs() + h as f32 * cos.abs()).ceil() as u32).max(h);

    let mut padded = RgbaImage::new(bound_w, bound_h);
    paint_replace(
        &mut padded,
        &card,
        i64::from((bound_w - w) / 2),
        i64::from((bound_h - h) / 2),
    );

    rotate_about_center(&padded, theta, Interpolation::Bicubic, Rgba([0, 0, 0, 0]))
}

// ============================================================================
// CardRenderer
// ============================================================================

impl<S: AssetStore> CardRenderer<'_, S> {
    /// Renders `requests` into a grid, in reading order.
    ///
    /// Every frame id is validated before any asset is read. Fails with
    /// `EmptyLayout` on an empty list and otherwise with the first card's
    /// error.
    #[tracing::instrument(level = "debug", skip_all, fields(cards = requests.len()))]
    pub fn render_album(
        &self,
        requests: &[RenderRequest],
        signal: &dyn CancelSignal,
    ) -> RenderResult<RgbaImage> {
        let cards = self.render_all(requests, signal)?;

        let cell = SizePx::new(
            cards.iter().map(RgbaImage::width).max().unwrap_or(0),
            cards.iter().map(RgbaImage::height).max().unwrap_or(0),
        );
        let layout = AlbumLayout::new(cards.len(), cell, AlbumLayout::PADDING);
        let size = layout.canvas_size();
        tracing::debug!(
            cols = layout.cols,
            rows = layout.rows,
            width = size.width,
            height = size.height,
            "album layout"
        );

        let mut canvas = RgbaImage::new(size.width, size.height);
        for (index, card) in cards.iter().enumerate() {
            let (x, y) = layout.cell_origin(index);
            composite_over(&mut canvas, card, x, y);
        }
        Ok(canvas)
    }

    /// Renders `requests` as a hand of cards fanned along an arc.
    ///
    /// Cards are tilted by their slot angle, and the canvas is the bounding
    /// box of every tilted card, so nothing is clipped.
    #[tracing::instrument(level = "debug", skip_all, fields(cards = requests.len()))]
    pub fn render_fan(
        &self,
        requests: &[RenderRequest],
        signal: &dyn CancelSignal,
    ) -> RenderResult<RgbaImage> {
        let guard = DeadlineGuard::new(signal);
        let slots = fan_slots(requests.len());
        let cards = self.render_all(requests, signal)?;

        let mut placed = Vec::with_capacity(cards.len());
        for (card, slot) in cards.into_iter().zip(&slots) {
            let card = tilt(card, slot.angle);
            let left = slot.x.ceil() as i64 - i64::from(card.width() / 2);
            let top = slot.y.ceil() as i64 - i64::from(card.height() / 2);
            placed.push((card, left, top));
            guard.check(Checkpoint::BetweenCards)?;
        }

        let min_x = placed.iter().map(|(_, x, _)| *x).min().unwrap_or(0);
        let min_y = placed.iter().map(|(_, _, y)| *y).min().unwrap_or(0);
        let max_x = placed
            .iter()
            .map(|(card, x, _)| x + i64::from(card.width()))
            .max()
            .unwrap_or(0);
        let max_y = placed
            .iter()
            .map(|(card, _, y)| y + i64::from(card.height()))
            .max()
            .unwrap_or(0);

        let width = u32::try_from(max_x - min_x).unwrap_or(0);
        let height = u32::try_from(max_y - min_y).unwrap_or(0);
        tracing::debug!(width, height, "fan layout");

        let mut canvas = RgbaImage::new(width, height);
        for index in fan_stacking_order(placed.len()) {
            let (card, x, y) = &placed[index];
            composite_over(&mut canvas, card, x - min_x, y - min_y);
        }
        Ok(canvas)
    }

    /// Validates every frame, then renders the cards one by one.
    fn render_all(
        &self,
        requests: &[RenderRequest],
        signal: &dyn CancelSignal,
    ) -> RenderResult<Vec<RgbaImage>> {
        if requests.is_empty() {
            return Err(RenderError::EmptyLayout);
        }
        for request in requests {
            self.registry().lookup(request.frame)?;
        }

        let guard = DeadlineGuard::new(signal);
        let mut cards = Vec::with_capacity(requests.len());
        for request in requests {
            cards.push(self.render(request, signal)?);
            guard.check(Checkpoint::BetweenCards)?;
        }
        Ok(cards)
    }
}
