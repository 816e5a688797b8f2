//! Character portrait layer.

use image::RgbaImage;

use super::blend::paint_replace;
use super::{CardLayer, RenderContext};
use crate::asset::AssetKey;

/// The character art, centered in the frame and painted first.
///
/// Painting replaces canvas pixels outright; the canvas underneath is still
/// empty at this point so there is nothing to blend with.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterLayer;

impl CharacterLayer {
    /// Top-left corner that centers a `width` x `height` portrait in the
    /// frame, shifted by the request offsets.
    pub fn origin(ctx: &RenderContext<'_>, width: u32, height: u32) -> (i64, i64) {
        let (ox, oy) = ctx.layer_origin();
        let cx = (i64::from(ctx.frame.width) - i64::from(width)) / 2;
        let cy = (i64::from(ctx.frame.height) - i64::from(height)) / 2;
        (cx + ox, cy + oy)
    }
}

impl CardLayer for CharacterLayer {
    fn name(&self) -> &'static str {
        "character"
    }

    fn asset_key(&self, ctx: &RenderContext<'_>) -> AssetKey {
        AssetKey::character(ctx.request.character_id, ctx.request.custom_image)
    }

    fn paint(&self, ctx: &mut RenderContext<'_>, source: RgbaImage) {
        let (x, y) = Self::origin(ctx, source.width(), source.height());
        paint_replace(&mut ctx.canvas, &source, x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGeometry;
    use crate::request::RenderRequest;
    use image::Rgba;

    #[test]
    fn centers_smaller_portrait() {
        let frame = FrameGeometry::new(0, "wide", "Wide", 303, 428);
        let request = RenderRequest::new(1);
        let ctx = RenderContext::new(&request, &frame);

        assert_eq!(CharacterLayer::origin(&ctx, 245, 370), (29, 29));
    }

    #[test]
    fn offsets_shift_the_portrait() {
        let frame = FrameGeometry::new(0, "default", "Default", 245, 370);
        let request = RenderRequest::new(1).with_offset(-5, 7);
        let ctx = RenderContext::new(&request, &frame);

        assert_eq!(CharacterLayer::origin(&ctx, 245, 370), (-5, 7));
    }

    #[test]
    fn oversized_portrait_gets_negative_origin() {
        let frame = FrameGeometry::new(0, "small", "Small", 10, 10);
        let request = RenderRequest::new(1);
        let ctx = RenderContext::new(&request, &frame);

        assert_eq!(CharacterLayer::origin(&ctx, 14, 10), (-2, 0));
    }

    #[test]
    fn paints_with_replace_semantics() {
        let frame = FrameGeometry::new(0, "tiny", "Tiny", 4, 4);
        let request = RenderRequest::new(1);
        let mut ctx = RenderContext::new(&request, &frame);
        ctx.canvas = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));

        CharacterLayer.paint(&mut ctx, RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0])));

        assert_eq!(ctx.canvas.get_pixel(1, 1).0, [10, 20, 30, 0]);
        assert_eq!(ctx.canvas.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
