//! QR codes for certificate verification links.

use png::{BitDepth, ColorType, Encoder};
use qrcode::{Color, QrCode};

use crate::shared::error::{AppError, AppResult};

/// Light modules kept around the symbol so scanners can find it.
pub const QUIET_ZONE: usize = 4;

/// Module grid of a QR symbol, row-major, `true` for dark modules.
#[derive(Debug, Clone)]
pub struct QrMatrix {
    pub width: usize,
    pub modules: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(data: &str) -> AppResult<Self> {
        let code = QrCode::new(data.as_bytes())
            .map_err(|e| AppError::Pdf(format!("QR encoding failed: {e}")))?;

        Ok(Self {
            width: code.width(),
            modules: code.to_colors().into_iter().map(|c| c == Color::Dark).collect(),
        })
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }
}

/// Grayscale PNG of `data`, roughly `size` pixels square.
pub fn render_png(data: &str, size: u32) -> AppResult<Vec<u8>> {
    let matrix = QrMatrix::encode(data)?;

    let total_modules = matrix.width + 2 * QUIET_ZONE;
    let scale = ((size as usize) / total_modules).max(1);
    let actual_size = total_modules * scale;

    let mut pixels: Vec<u8> = Vec::with_capacity(actual_size * actual_size);
    for y in 0..actual_size {
        for x in 0..actual_size {
            let mx = (x / scale).checked_sub(QUIET_ZONE);
            let my = (y / scale).checked_sub(QUIET_ZONE);
            let dark = match (mx, my) {
                (Some(mx), Some(my)) => matrix.is_dark(mx, my),
                _ => false,
            };
            pixels.push(if dark { 0 } else { 255 });
        }
    }

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, actual_size as u32, actual_size as u32);
        encoder.set_color(ColorType::Grayscale);
        encoder.set_depth(BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::Pdf(format!("PNG header: {e}")))?;
        writer
            .write_image_data(&pixels)
            .map_err(|e| AppError::Pdf(format!("PNG data: {e}")))?;
    }

    log::trace!("QR code rendered: {} bytes, {}px", out.len(), actual_size);
    Ok(out)
}
