//! Pixel compositing onto the card canvas.
//!
//! All arithmetic is integer on straight (non-premultiplied) RGBA8. Layers
//! may be placed at negative or out-of-bounds offsets; anything outside the
//! canvas is clipped.

use image::{Rgba, RgbaImage};

/// Copies `src` onto `dest` at `(x, y)`, replacing destination pixels.
///
/// Transparent source pixels overwrite too; nothing is blended.
pub fn paint_replace(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for_each_overlap(dest, src, x, y, |dst, src| *dst = src);
}

/// Composites `src` over `dest` at `(x, y)` with standard alpha blending.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for_each_overlap(dest, src, x, y, |dst, src| *dst = blend_over(src, *dst));
}

fn for_each_overlap<F>(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, mut op: F)
where
    F: FnMut(&mut Rgba<u8>, Rgba<u8>),
{
    let dest_width = i64::from(dest.width());
    let dest_height = i64::from(dest.height());

    // Source rows/columns that land inside the canvas
    let sx0 = (-x).clamp(0, i64::from(src.width()));
    let sy0 = (-y).clamp(0, i64::from(src.height()));
    let sx1 = (dest_width - x).clamp(0, i64::from(src.width()));
    let sy1 = (dest_height - y).clamp(0, i64::from(src.height()));

    for sy in sy0..sy1 {
        for sx in sx0..sx1 {
            let src_pixel = *src.get_pixel(sx as u32, sy as u32);
            let dst_pixel = dest.get_pixel_mut((x + sx) as u32, (y + sy) as u32);
            op(dst_pixel, src_pixel);
        }
    }
}

/// Alpha blends two RGBA pixels (source over destination).
pub fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    // Destination coverage left after the source
    let dw = div255(u32::from(dst[3]) * (255 - sa));
    let out_a = sa + dw;

    let blend = |s: u8, d: u8| -> u8 {
        let num = u32::from(s) * sa + u32::from(d) * dw;
        ((num + out_a / 2) / out_a).min(255) as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        out_a.min(255) as u8,
    ])
}

/// Rounded division by 255 for products of two 8-bit values.
#[inline]
pub(crate) fn div255(v: u32) -> u32 {
    (v + 127) / 255
}
