//! 8-bit RGBA boundary: packed export, channel import and preview compositing.

use crate::stencil::error::{ImportStage, StencilError};
use crate::stencil::mask::{unpack_from_bytes, Mask, MaskResolution, MASK_MAX};
use crate::stencil::resample::resample_plane;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[0] = fill.r;
            chunk[1] = fill.g;
            chunk[2] = fill.b;
            chunk[3] = fill.a;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, StencilError> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return Err(StencilError::DimensionMismatch(format!(
                "{} bytes supplied for a {width}x{height} RGBA image",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = ((y * self.width + x) * 4) as usize;
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    fn plane(&self, offset: usize) -> Vec<u8> {
        self.pixels.chunks_exact(4).map(|px| px[offset]).collect()
    }

    fn luma_plane(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .map(|px| {
                (0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32)
                    .round()
                    .clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

/// Which part of an imported image carries the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    Red,
    Green,
    Blue,
    Alpha,
    Grayscale,
    /// Red holds the high byte and green the low byte, as written by
    /// [`mask_to_rgba`].
    Packed,
}

/// Packed export: red = high byte, green = low byte, opaque.
pub fn mask_to_rgba(mask: &Mask) -> RgbaBuffer {
    let side = mask.side() as u32;
    let mut pixels = Vec::with_capacity(mask.cells().len() * 4);
    for &value in mask.cells() {
        pixels.extend_from_slice(&[(value >> 8) as u8, (value & 0xFF) as u8, 0, 255]);
    }
    RgbaBuffer {
        width: side,
        height: side,
        pixels,
    }
}

pub fn import_rgba(image: &RgbaBuffer, channel: SourceChannel) -> Result<Mask, StencilError> {
    import_rgba_staged(image, channel).map_err(|(_, err)| err)
}

pub(crate) fn import_rgba_staged(
    image: &RgbaBuffer,
    channel: SourceChannel,
) -> Result<Mask, (ImportStage, StencilError)> {
    let (width, height) = (image.width as usize, image.height as usize);
    let (high, low) = match channel {
        SourceChannel::Red => (image.plane(0), None),
        SourceChannel::Green => (image.plane(1), None),
        SourceChannel::Blue => (image.plane(2), None),
        SourceChannel::Alpha => (image.plane(3), None),
        SourceChannel::Grayscale => (image.luma_plane(), None),
        SourceChannel::Packed => (image.plane(0), Some(image.plane(1))),
    };

    let side = if width == height && MaskResolution::try_from_side(width).is_ok() {
        width
    } else {
        let target = MaskResolution::next_at_least(width.max(height)).side();
        tracing::debug!(width, height, target, "resampling imported stencil image");
        target
    };
    let resample =
        |plane: &[u8]| resample_plane(plane, width, height, side).map_err(|e| (ImportStage::Resample, e));
    let high = resample(&high)?;
    let mask = match low {
        Some(low) => unpack_from_bytes(&high, &resample(&low)?),
        // One 8-bit channel expands to 16 bits as c * 257 (255 -> 65535).
        None => unpack_from_bytes(&high, &high),
    };
    mask.map_err(|e| (ImportStage::Unpack, e))
}

pub(crate) fn decode_image(bytes: &[u8]) -> Result<RgbaBuffer, StencilError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| StencilError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbaBuffer::from_pixels(width, height, rgba.into_raw())
}

/// Decode any image format the `image` crate understands and import it.
pub fn import_image_bytes(bytes: &[u8], channel: SourceChannel) -> Result<Mask, StencilError> {
    let image = decode_image(bytes)?;
    import_rgba(&image, channel)
}

pub fn encode_png(buffer: &RgbaBuffer) -> anyhow::Result<Vec<u8>> {
    let image = image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.pixels.clone())
        .ok_or_else(|| anyhow::anyhow!("RGBA buffer does not match its dimensions"))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
    Ok(bytes)
}

/// Colour a mask for display: alpha follows coverage.
pub fn coverage_overlay(mask: &Mask, colour: Rgba) -> RgbaBuffer {
    let side = mask.side() as u32;
    let mut pixels = Vec::with_capacity(mask.cells().len() * 4);
    for &value in mask.cells() {
        let alpha = (value as f32 / MASK_MAX as f32 * colour.a as f32).round() as u8;
        pixels.extend_from_slice(&[colour.r, colour.g, colour.b, alpha]);
    }
    RgbaBuffer {
        width: side,
        height: side,
        pixels,
    }
}

/// Alpha-blend overlays, first to last, over an opaque background.
pub fn composite_over_blank(
    overlays: &[RgbaBuffer],
    width: u32,
    height: u32,
    background: Rgba,
) -> Result<RgbaBuffer, StencilError> {
    let mut output = RgbaBuffer::new(width, height, background);
    for overlay in overlays {
        blend_in_place(&mut output, overlay)?;
    }
    Ok(output)
}

fn blend_in_place(base: &mut RgbaBuffer, top: &RgbaBuffer) -> Result<(), StencilError> {
    if base.width != top.width || base.height != top.height {
        return Err(StencilError::DimensionMismatch(format!(
            "cannot blend {}x{} over {}x{}",
            top.width, top.height, base.width, base.height
        )));
    }

    for (dst, src) in base
        .pixels
        .chunks_exact_mut(4)
        .zip(top.pixels.chunks_exact(4))
    {
        let blended = blend_pixel(
            Rgba::rgba(dst[0], dst[1], dst[2], dst[3]),
            Rgba::rgba(src[0], src[1], src[2], src[3]),
        );
        dst.copy_from_slice(&[blended.r, blended.g, blended.b, blended.a]);
    }
    Ok(())
}

fn blend_pixel(bottom: Rgba, top: Rgba) -> Rgba {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Rgba::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, px: Rgba) -> RgbaBuffer {
        RgbaBuffer::new(width, height, px)
    }

    #[test]
    fn new_buffer_holds_four_bytes_per_pixel() {
        let buffer = RgbaBuffer::new(3, 2, Rgba::rgba(1, 2, 3, 4));
        assert_eq!(buffer.pixels.len(), 24);
        assert_eq!(buffer.pixel(2, 1), Rgba::rgba(1, 2, 3, 4));
    }

    #[test]
    fn packed_export_reimports_losslessly() {
        let cells = (0..128 * 128).map(|i| (i * 4 + 3) as u16).collect();
        let mask = Mask::from_cells(MaskResolution::R128, cells).unwrap();
        let rgba = mask_to_rgba(&mask);
        assert_eq!(rgba.pixel(1, 0), Rgba::rgba(0, 7, 0, 255));
        assert_eq!(import_rgba(&rgba, SourceChannel::Packed).unwrap(), mask);
    }

    #[test]
    fn single_channel_expands_to_full_range() {
        let image = solid(128, 128, Rgba::rgba(255, 128, 0, 10));
        assert!(import_rgba(&image, SourceChannel::Red)
            .unwrap()
            .cells()
            .iter()
            .all(|&c| c == MASK_MAX));
        assert!(import_rgba(&image, SourceChannel::Green)
            .unwrap()
            .cells()
            .iter()
            .all(|&c| c == 128 * 257));
        assert!(import_rgba(&image, SourceChannel::Blue).unwrap().is_empty());
        assert!(import_rgba(&image, SourceChannel::Alpha)
            .unwrap()
            .cells()
            .iter()
            .all(|&c| c == 10 * 257));
    }

    #[test]
    fn unsupported_sizes_are_resampled_up() {
        let image = solid(100, 60, Rgba::rgba(40, 40, 40, 255));
        let mask = import_rgba(&image, SourceChannel::Grayscale).unwrap();
        assert_eq!(mask.resolution(), MaskResolution::R128);
        assert!(mask.cells().iter().all(|&c| c == 40 * 257));

        let big = solid(300, 300, Rgba::BLACK);
        assert_eq!(
            import_rgba(&big, SourceChannel::Red).unwrap().resolution(),
            MaskResolution::R512
        );
    }

    #[test]
    fn png_bytes_decode_through_import() {
        let image = solid(128, 128, Rgba::rgba(128, 128, 128, 255));
        let png = encode_png(&image).unwrap();
        let mask = import_image_bytes(&png, SourceChannel::Grayscale).unwrap();
        assert!(mask.cells().iter().all(|&c| c == 32_896));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            import_image_bytes(b"not an image", SourceChannel::Red),
            Err(StencilError::Decode(_))
        ));
    }

    #[test]
    fn overlay_alpha_follows_coverage() {
        let mut mask = Mask::new(MaskResolution::R128);
        mask.set(0, 0, MASK_MAX).unwrap();
        mask.set(1, 0, MASK_MAX / 2).unwrap();
        let overlay = coverage_overlay(&mask, Rgba::rgba(255, 0, 0, 255));
        assert_eq!(overlay.pixel(0, 0).a, 255);
        assert_eq!(overlay.pixel(1, 0).a, 127);
        assert_eq!(overlay.pixel(2, 0).a, 0);
    }

    #[test]
    fn composite_blends_overlay_over_background() {
        let overlay = RgbaBuffer::from_pixels(1, 1, vec![200, 0, 0, 128]).unwrap();
        let out =
            composite_over_blank(&[overlay], 1, 1, Rgba::rgba(100, 100, 100, 255)).unwrap();
        assert_eq!(out.pixel(0, 0), Rgba::rgba(150, 50, 50, 255));
    }

    #[test]
    fn composite_rejects_mismatched_sizes() {
        let overlay = solid(2, 2, Rgba::BLACK);
        assert!(matches!(
            composite_over_blank(&[overlay], 4, 4, Rgba::BLACK),
            Err(StencilError::DimensionMismatch(_))
        ));
    }
}
