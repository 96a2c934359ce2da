//! Ancestor tile composition.
//!
//! A parent tile covers its four children at half resolution. Quadrant
//! `(dx, dy)` is the `half × half` block at pixel offset `(half·dx, half·dy)`.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

use crate::Result;

/// Decode any supported encoded image into RGBA.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Render a parent tile from its children, ordered as
/// [`gridmap_types::Coord::children`] yields them.
///
/// Missing children leave their quadrant fully transparent.
pub fn compose(children: &[Option<RgbaImage>; 4], tile_size: u32) -> RgbaImage {
    let half = tile_size / 2;
    let mut canvas = RgbaImage::new(tile_size, tile_size);
    for (slot, child) in children.iter().enumerate() {
        let Some(child) = child else {
            continue;
        };
        let (dx, dy) = (slot as u32 % 2, slot as u32 / 2);
        let scaled = imageops::resize(child, half, half, FilterType::Triangle);
        imageops::replace(
            &mut canvas,
            &scaled,
            i64::from(half * dx),
            i64::from(half * dy),
        );
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(size: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba(px))
    }

    #[test]
    fn test_empty_is_transparent() {
        let img = compose(&[None, None, None, None], 100);
        assert_eq!(img.dimensions(), (100, 100));
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_quadrant_placement() {
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        let img = compose(
            &[Some(solid(100, red)), None, None, Some(solid(100, blue))],
            100,
        );
        assert_eq!(img.get_pixel(10, 10).0, red);
        assert_eq!(img.get_pixel(49, 49).0, red);
        assert_eq!(img.get_pixel(75, 10).0[3], 0);
        assert_eq!(img.get_pixel(10, 75).0[3], 0);
        assert_eq!(img.get_pixel(50, 50).0, blue);
        assert_eq!(img.get_pixel(99, 99).0, blue);
    }

    #[test]
    fn test_recompose_is_bit_identical() {
        let mut gradient = RgbaImage::new(100, 100);
        for (x, y, p) in gradient.enumerate_pixels_mut() {
            *p = Rgba([x as u8, y as u8, (x + y) as u8, 255]);
        }
        let children = [
            Some(gradient.clone()),
            Some(solid(100, [1, 2, 3, 255])),
            None,
            Some(gradient),
        ];
        let a = encode_png(&compose(&children, 100)).expect("encode");
        let b = encode_png(&compose(&children, 100)).expect("encode");
        assert_eq!(a, b);
    }

    #[test]
    fn test_png_roundtrip_and_garbage() {
        let img = solid(4, [9, 8, 7, 255]);
        let bytes = encode_png(&img).expect("encode");
        assert_eq!(decode(&bytes).expect("decode"), img);
        assert!(decode(b"not a png").is_err());
    }
}
