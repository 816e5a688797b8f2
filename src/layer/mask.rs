//! Dyeable mask layer and the recolor engine.
//!
//! A mask is a grayscale "paint mask": its luminance carries shading and
//! highlights, its alpha carries the silhouette. Recoloring keeps both and
//! swaps in the dye as the single color of the layer.

use image::{Rgba, RgbaImage};
use palette::{IntoColor, LinSrgb, Oklab, Srgb};
use serde::{Deserialize, Serialize};

use super::blend::{composite_over, div255};
use super::{CardLayer, RenderContext};
use crate::asset::AssetKey;
use crate::request::Dye;

// ============================================================================
// RecolorMode
// ============================================================================

/// How mask pixels are turned into dyed pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum RecolorMode {
    /// Dye RGB scaled by mask luminance, integer math.
    #[default]
    Multiply,

    /// Perceptual blend toward the dye in Oklab space.
    Oklab,
}

// ============================================================================
// MaskLayer
// ============================================================================

/// Frame mask, recolored with the request's dye and blended over the canvas.
#[derive(Debug, Clone, Copy)]
pub struct MaskLayer {
    pub dye: Dye,
    pub mode: RecolorMode,
}

impl MaskLayer {
    pub fn new(dye: Dye, mode: RecolorMode) -> Self {
        Self { dye, mode }
    }
}

impl CardLayer for MaskLayer {
    fn name(&self) -> &'static str {
        "mask"
    }

    fn asset_key(&self, ctx: &RenderContext<'_>) -> AssetKey {
        AssetKey::mask(ctx.frame.name.as_str(), ctx.request.glow)
    }

    fn paint(&self, ctx: &mut RenderContext<'_>, source: RgbaImage) {
        let tinted = recolor(&source, self.dye, self.mode);
        let (x, y) = ctx.layer_origin();
        composite_over(&mut ctx.canvas, &tinted, x, y);
    }
}

// ============================================================================
// Recolor Engine
// ============================================================================

/// Recolors a mask with `dye`, returning a layer of the same size.
pub fn recolor(mask: &RgbaImage, dye: Dye, mode: RecolorMode) -> RgbaImage {
    match mode {
        RecolorMode::Multiply => recolor_multiply(mask, dye),
        RecolorMode::Oklab => recolor_oklab(mask, dye),
    }
}

/// Scales the dye by each pixel's luminance and keeps the mask alpha.
///
/// White opaque pixels reproduce the dye exactly. Transparency follows the
/// mask alpha alone: alpha 0 becomes `[0, 0, 0, 0]`, while an opaque black
/// pixel stays opaque black and covers whatever is beneath it.
pub fn recolor_multiply(mask: &RgbaImage, dye: Dye) -> RgbaImage {
    let [dr, dg, db] = dye.rgb();
    let mut result = mask.clone();

    for pixel in result.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }

        let intensity = luma(r, g, b);
        let scale = |c: u8| div255(u32::from(c) * intensity) as u8;
        *pixel = Rgba([scale(dr), scale(dg), scale(db), a]);
    }

    result
}

/// Rec. 601 luma, rounded.
pub fn luma(r: u8, g: u8, b: u8) -> u32 {
    (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) + 500) / 1000
}

// Pull lightness halfway to the dye, chroma 90% of the way.
const LIGHTNESS_BLEND: f32 = 0.5;
const CHROMA_BLEND: f32 = 0.9;
const CHROMA_BOOST: f32 = 0.5;
const MAX_CHROMA: f32 = 1.0;

/// Blends each pixel toward the dye in Oklab, keeping the mask alpha.
///
/// Darker mask regions get a chroma boost so shadows stay saturated.
pub fn recolor_oklab(mask: &RgbaImage, dye: Dye) -> RgbaImage {
    let dye_lab = to_oklab(dye.rgb());
    let mut result = mask.clone();

    for pixel in result.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }

        let orig = to_oklab([r, g, b]);
        let boost = 1.0 + CHROMA_BOOST * (1.0 - orig.l);

        let mut chroma_a = (orig.a * (1.0 - CHROMA_BLEND) + dye_lab.a * CHROMA_BLEND) * boost;
        let mut chroma_b = (orig.b * (1.0 - CHROMA_BLEND) + dye_lab.b * CHROMA_BLEND) * boost;

        let chroma = (chroma_a * chroma_a + chroma_b * chroma_b).sqrt();
        if chroma > MAX_CHROMA {
            chroma_a *= MAX_CHROMA / chroma;
            chroma_b *= MAX_CHROMA / chroma;
        }

        let lightness = orig.l * (1.0 - LIGHTNESS_BLEND) + dye_lab.l * LIGHTNESS_BLEND;
        let linear: LinSrgb<f32> = Oklab::new(lightness, chroma_a, chroma_b).into_color();
        let out = Srgb::<f32>::from_linear(linear).into_format::<u8>();

        *pixel = Rgba([out.red, out.green, out.blue, a]);
    }

    result
}

fn to_oklab([r, g, b]: [u8; 3]) -> Oklab {
    let linear: LinSrgb<f32> = Srgb::new(r, g, b).into_format::<f32>().into_linear();
    linear.into_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    #[test]
    fn full_intensity_reproduces_dye() {
        let out = recolor_multiply(&single([255, 255, 255, 255]), Dye(0x12_AB_EF));
        assert_eq!(out.get_pixel(0, 0).0, [0x12, 0xAB, 0xEF, 255]);
    }

    #[test]
    fn transparent_mask_pixel_is_fully_transparent() {
        let out = recolor_multiply(&single([255, 255, 255, 0]), Dye(0xFF_FF_FF));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);

        let out = recolor_oklab(&single([80, 80, 80, 0]), Dye(0xFF_00_00));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn shading_scales_dye_and_keeps_alpha() {
        let out = recolor_multiply(&single([128, 128, 128, 200]), Dye(0xC8_64_00));
        // 128/255 of each channel, rounded
        assert_eq!(out.get_pixel(0, 0).0, [100, 50, 0, 200]);
    }

    #[test]
    fn opaque_black_mask_pixel_covers_the_canvas() {
        let out = recolor_multiply(&single([0, 0, 0, 255]), Dye(0xFF_00_00));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);

        let mut canvas = single([10, 20, 30, 255]);
        composite_over(&mut canvas, &out, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn luma_extremes() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(100, 100, 100), 100);
    }

    #[test]
    fn recolor_preserves_dimensions() {
        let mask = RgbaImage::from_pixel(7, 3, Rgba([200, 200, 200, 255]));
        for mode in [RecolorMode::Multiply, RecolorMode::Oklab] {
            let out = recolor(&mask, Dye::DEFAULT, mode);
            assert_eq!(out.dimensions(), (7, 3));
        }
    }

    #[test]
    fn oklab_pulls_gray_toward_dye_hue() {
        let out = recolor_oklab(&single([160, 160, 160, 255]), Dye(0xFF_00_00));
        let [r, g, b, a] = out.get_pixel(0, 0).0;
        assert_eq!(a, 255);
        assert!(r > g && r > b, "red dye should dominate: {r} {g} {b}");
    }

    #[test]
    fn recolor_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RecolorMode::Oklab).unwrap(),
            "\"oklab\""
        );
        let mode: RecolorMode = serde_json::from_str("\"multiply\"").unwrap();
        assert_eq!(mode, RecolorMode::Multiply);
    }
}
