//! Layer infrastructure for card rendering.
//!
//! Each layer knows which asset it reads and how it paints that asset onto
//! the canvas carried by a [`RenderContext`]. Loading, decoding and
//! cancellation are the renderer's job; layers only paint.
//!
//! # Layer Order
//!
//! ```text
//! Empty canvas (frame width x height, transparent)
//!     │
//!     ▼
//! ┌────────────┐
//! │ Character  │ ◄── centered + offset, replaces pixels
//! └─────┬──────┘
//!       ▼
//! ┌────────────┐
//! │    Mask    │ ◄── recolored with the dye, alpha-over at offset
//! └─────┬──────┘
//!       ▼
//! ┌────────────┐
//! │   Static   │ ◄── never dyed, alpha-over at offset
//! └────────────┘
//! ```
//!
//! Static art sits on top so ornate borders are never hidden by the
//! character or the tinted mask.

pub mod blend;
pub mod character;
pub mod decoration;
pub mod mask;

pub use blend::{blend_over, composite_over, paint_replace};
pub use character::CharacterLayer;
pub use decoration::StaticLayer;
pub use mask::{MaskLayer, RecolorMode, recolor};

use image::RgbaImage;

use crate::asset::AssetKey;
use crate::frame::FrameGeometry;
use crate::request::RenderRequest;

// ============================================================================
// Render Context
// ============================================================================

/// State owned by one render call.
///
/// The canvas is never shared between calls.
pub struct RenderContext<'a> {
    /// The canvas being painted.
    pub canvas: RgbaImage,

    pub request: &'a RenderRequest,

    pub frame: &'a FrameGeometry,
}

impl<'a> RenderContext<'a> {
    /// Creates a context with a fully transparent canvas sized to `frame`.
    pub fn new(request: &'a RenderRequest, frame: &'a FrameGeometry) -> Self {
        Self {
            canvas: RgbaImage::new(frame.width, frame.height),
            request,
            frame,
        }
    }

    /// Where frame layers are placed: the request offsets.
    pub fn layer_origin(&self) -> (i64, i64) {
        (
            i64::from(self.request.offset_x),
            i64::from(self.request.offset_y),
        )
    }

    /// Consumes the context, returning the finished canvas.
    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }
}

// ============================================================================
// Layer Trait
// ============================================================================

/// A single paint step of the card.
pub trait CardLayer {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// The asset this layer paints, given the request and frame.
    fn asset_key(&self, ctx: &RenderContext<'_>) -> AssetKey;

    /// Paints a decoded asset onto `ctx.canvas`.
    fn paint(&self, ctx: &mut RenderContext<'_>, source: RgbaImage);
}
