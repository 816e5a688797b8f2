//! Static decoration layer.

use image::RgbaImage;

use super::blend::composite_over;
use super::{CardLayer, RenderContext};
use crate::asset::AssetKey;

/// Fixed-color frame art such as metallic trim, painted last.
///
/// Static layers ignore the dye.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLayer;

impl CardLayer for StaticLayer {
    fn name(&self) -> &'static str {
        "static"
    }

    fn asset_key(&self, ctx: &RenderContext<'_>) -> AssetKey {
        AssetKey::static_layer(ctx.frame.name.as_str(), ctx.request.glow)
    }

    fn paint(&self, ctx: &mut RenderContext<'_>, source: RgbaImage) {
        let (x, y) = ctx.layer_origin();
        composite_over(&mut ctx.canvas, &source, x, y);
    }
}
