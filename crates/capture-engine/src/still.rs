//! Still-image encoding.

use std::io::Cursor;

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_platform_core::RawFrame;
use image::{ImageBuffer, ImageFormat, Rgba};

/// Encode an RGBA frame as PNG.
pub fn encode_png(frame: RawFrame) -> CheezyResult<Vec<u8>> {
    let RawFrame {
        width,
        height,
        rgba,
    } = frame;
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(CheezyError::capture(format!(
            "frame is {} bytes, expected {expected} for {width}x{height}",
            rgba.len()
        )));
    }

    let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, rgba)
        .ok_or_else(|| CheezyError::capture("frame buffer does not match its dimensions"))?;

    let mut out = Cursor::new(Vec::new());
    buffer
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CheezyError::capture(format!("Failed to encode still: {e}")))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_keeps_dimensions() {
        let frame = RawFrame {
            width: 4,
            height: 2,
            rgba: vec![200; 4 * 2 * 4],
        };
        let png = encode_png(frame).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = RawFrame {
            width: 10,
            height: 10,
            rgba: vec![0; 12],
        };
        assert!(matches!(
            encode_png(frame),
            Err(CheezyError::Capture { .. })
        ));
    }
}
