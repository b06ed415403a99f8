/// Presentation helpers
///
/// The numeric core hands the UI a windowed 16-bit intensity buffer; these
/// helpers turn it into the RGBA bytes iced displays and map cursor
/// positions back onto pixel coordinates for the readout.

pub mod canvas;

/// Expand windowed 16-bit intensities into opaque grayscale RGBA bytes.
/// The display surface is 8-bit, so the high byte carries the intensity.
pub fn gray16_to_rgba(display: &[u16]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(display.len() * 4);
    for &value in display {
        let luma = (value >> 8) as u8;
        rgba.extend_from_slice(&[luma, luma, luma, 255]);
    }
    rgba
}

/// Map a cursor position inside a widget to image pixel coordinates,
/// assuming the image is scaled uniformly and centered (letterboxed) within
/// the widget bounds. Returns None outside the drawn image.
pub fn pixel_at(
    bounds_width: f32,
    bounds_height: f32,
    image_width: u32,
    image_height: u32,
    x: f32,
    y: f32,
) -> Option<(u32, u32)> {
    if image_width == 0 || image_height == 0 || bounds_width <= 0.0 || bounds_height <= 0.0 {
        return None;
    }

    let scale = (bounds_width / image_width as f32).min(bounds_height / image_height as f32);
    let drawn_width = image_width as f32 * scale;
    let drawn_height = image_height as f32 * scale;
    let offset_x = (bounds_width - drawn_width) / 2.0;
    let offset_y = (bounds_height - drawn_height) / 2.0;

    let px = ((x - offset_x) / scale).floor();
    let py = ((y - offset_y) / scale).floor();

    if px < 0.0 || py < 0.0 || px >= image_width as f32 || py >= image_height as f32 {
        return None;
    }
    Some((px as u32, py as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_conversion() {
        let rgba = gray16_to_rgba(&[0, 0x8000, 0xFFFF]);
        assert_eq!(rgba.len(), 12);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[0x80, 0x80, 0x80, 255]);
        assert_eq!(&rgba[8..12], &[0xFF, 0xFF, 0xFF, 255]);
    }

    #[test]
    fn test_pixel_mapping_unscaled() {
        // 100x100 image in a 100x100 widget: identity.
        assert_eq!(pixel_at(100.0, 100.0, 100, 100, 0.5, 0.5), Some((0, 0)));
        assert_eq!(pixel_at(100.0, 100.0, 100, 100, 99.5, 99.5), Some((99, 99)));
    }

    #[test]
    fn test_pixel_mapping_letterboxed() {
        // 100x100 image centered in a 300x100 widget: drawn area spans
        // x in [100, 200).
        assert_eq!(pixel_at(300.0, 100.0, 100, 100, 100.5, 50.0), Some((0, 50)));
        assert_eq!(pixel_at(300.0, 100.0, 100, 100, 50.0, 50.0), None);
        assert_eq!(pixel_at(300.0, 100.0, 100, 100, 250.0, 50.0), None);
    }

    #[test]
    fn test_pixel_mapping_scaled_down() {
        // 200x200 image in a 100x100 widget: every widget pixel covers 2x2.
        assert_eq!(pixel_at(100.0, 100.0, 200, 200, 10.0, 10.0), Some((20, 20)));
    }

    #[test]
    fn test_pixel_mapping_degenerate() {
        assert_eq!(pixel_at(100.0, 100.0, 0, 0, 10.0, 10.0), None);
        assert_eq!(pixel_at(0.0, 0.0, 100, 100, 0.0, 0.0), None);
    }
}
