use std::sync::Arc;

use crate::{UgoiraError, UgoiraResult, assets::DecodedImage};

/// Decode any still format the `image` crate recognizes (ugoira archives carry JPEG or PNG).
pub fn decode_image(bytes: &[u8]) -> UgoiraResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(UgoiraError::decode("frame has no source bytes"));
    }
    let mut rgba = image::load_from_memory(bytes)
        .map_err(|e| UgoiraError::decode(format!("decode frame image: {e}")))?
        .into_rgba8();

    for px in rgba.pixels_mut() {
        premultiply(&mut px.0);
    }

    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba8_premul: Arc::new(rgba.into_raw()),
    })
}

// Rounded integer premultiply; opaque pixels are left as-is.
fn premultiply(px: &mut [u8; 4]) {
    let a = u16::from(px[3]);
    if a == 255 {
        return;
    }
    for c in &mut px[..3] {
        *c = ((u16::from(*c) * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode_png(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn translucent_pixels_are_premultiplied() {
        let png = encode_png(2, 1, vec![200, 100, 0, 51, 255, 255, 255, 0]);
        let img = decode_image(&png).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(img.rgba8_premul.as_slice(), &[40, 20, 0, 51, 0, 0, 0, 0]);
    }

    #[test]
    fn opaque_pixels_are_untouched() {
        let png = encode_png(1, 2, vec![1, 2, 3, 255, 9, 8, 7, 255]);
        let img = decode_image(&png).unwrap();
        assert_eq!(img.rgba8_premul.as_slice(), &[1, 2, 3, 255, 9, 8, 7, 255]);
    }

    #[test]
    fn garbage_and_empty_input_fail() {
        assert!(matches!(
            decode_image(b"PK\x03\x04 not an image"),
            Err(UgoiraError::Decode(_))
        ));
        let png = encode_png(1, 1, vec![1, 2, 3, 4]);
        assert!(matches!(decode_image(&png[..20]), Err(UgoiraError::Decode(_))));
        assert!(matches!(decode_image(&[]), Err(UgoiraError::Decode(_))));
    }
}
