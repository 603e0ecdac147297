//! QR rendering (ambient component, `GET /qr`). Turns the pairing string
//! the session manager stores during the `QR` state into a PNG data-URL.
//! Has no protocol knowledge: it is exercised only by the stored code
//! string, never by the session manager directly.

use base64::Engine;
use image::{GrayImage, Luma};
use qrcode::QrCode;

use crate::error::{Error, Result};

const MODULE_PX: u32 = 8;
const QUIET_ZONE: u32 = 4;

/// Renders a pairing code string to a `data:image/png;base64,...` URL.
pub fn code_to_data_url(code: &str) -> Result<String> {
    if code.is_empty() {
        return Err(Error::Invalid("empty QR code".to_string()));
    }
    let png = code_to_png(code)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    Ok(format!("data:image/png;base64,{encoded}"))
}

fn code_to_png(code: &str) -> Result<Vec<u8>> {
    let qr = QrCode::new(code.as_bytes()).map_err(|e| Error::Invalid(format!("QR encode failed: {e}")))?;

    let matrix = qr.to_colors();
    let width = qr.width() as u32;
    let img_size = (width + QUIET_ZONE * 2) * MODULE_PX;

    let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));
    for y in 0..width {
        for x in 0..width {
            if matrix[(y * width + x) as usize] == qrcode::Color::Dark {
                let px_x = (x + QUIET_ZONE) * MODULE_PX;
                let px_y = (y + QUIET_ZONE) * MODULE_PX;
                for dy in 0..MODULE_PX {
                    for dx in 0..MODULE_PX {
                        img.put_pixel(px_x + dx, px_y + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img_size,
        img_size,
        image::ExtendedColorType::L8,
    )
    .map_err(|e| Error::Invalid(format!("PNG encode failed: {e}")))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_png_data_url() {
        let url = code_to_data_url("1@abc,def,ghi==").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(code_to_data_url("").is_err());
    }
}
