//! Landscape A4 certificate document.

use chrono::{DateTime, Utc};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use uuid::Uuid;

use super::qr::QrMatrix;
use crate::shared::error::{AppError, AppResult};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const BORDER_MARGIN: f32 = 7.0;
const BORDER_THICKNESS_PT: f32 = 4.0;
const QR_SIZE: f32 = 30.0;
const PT_TO_MM: f32 = 0.3528;

/// `#1F3C88`
const BRAND_BLUE: (f32, f32, f32) = (31.0 / 255.0, 60.0 / 255.0, 136.0 / 255.0);
/// `#555555`
const FOOTER_GRAY: (f32, f32, f32) = (85.0 / 255.0, 85.0 / 255.0, 85.0 / 255.0);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

/// Everything printed on a certificate.
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub student_name: String,
    pub course_title: String,
    pub verification_code: Uuid,
    pub issued_at: DateTime<Utc>,
    pub verify_url: String,
    pub issuer_name: String,
    pub issuer_tagline: String,
    pub signatory: String,
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Approximate Helvetica width; good enough to centre a line.
fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * 0.5 * PT_TO_MM
}

fn centered(
    layer: &PdfLayerReference,
    text: &str,
    size_pt: f32,
    center_x: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    let x = (center_x - text_width_mm(text, size_pt) / 2.0).max(BORDER_MARGIN + 2.0);
    layer.use_text(text, size_pt, Mm(x), Mm(y), font);
}

impl CertificateDocument {
    pub fn render(&self) -> AppResult<Vec<u8>> {
        let pdf_err = |e: printpdf::Error| AppError::Pdf(e.to_string());

        let (doc, page, layer) = PdfDocument::new(
            format!("Certificate - {}", self.course_title),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Certificate",
        );
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?;

        // Border
        layer.set_outline_color(rgb(BRAND_BLUE));
        layer.set_outline_thickness(BORDER_THICKNESS_PT);
        layer.add_rect(
            Rect::new(
                Mm(BORDER_MARGIN),
                Mm(BORDER_MARGIN),
                Mm(PAGE_WIDTH - BORDER_MARGIN),
                Mm(PAGE_HEIGHT - BORDER_MARGIN),
            )
            .with_mode(PaintMode::Stroke),
        );

        let mid = PAGE_WIDTH / 2.0;

        layer.set_fill_color(rgb(BRAND_BLUE));
        centered(&layer, "Certificate of Completion", 34.0, mid, 165.0, &bold);

        layer.set_fill_color(rgb(BLACK));
        centered(&layer, "This is proudly presented to", 16.0, mid, 145.0, &regular);
        centered(&layer, &self.student_name, 26.0, mid, 128.0, &bold);
        centered(
            &layer,
            "For successfully completing the course",
            14.0,
            mid,
            113.0,
            &regular,
        );
        centered(&layer, &self.course_title, 26.0, mid, 98.0, &bold);
        centered(
            &layer,
            &format!("Issued by {} - {}.", self.issuer_name, self.issuer_tagline),
            14.0,
            mid,
            83.0,
            &regular,
        );

        layer.set_fill_color(rgb(FOOTER_GRAY));
        centered(
            &layer,
            &format!("Certificate ID: {}", self.verification_code),
            11.0,
            mid,
            70.0,
            &regular,
        );
        centered(
            &layer,
            &format!("Issued on {}", self.issued_at.format("%B %-d, %Y")),
            11.0,
            mid,
            63.0,
            &regular,
        );

        // Signatory block
        layer.set_outline_color(rgb(FOOTER_GRAY));
        layer.set_outline_thickness(0.75);
        layer.add_rect(
            Rect::new(Mm(mid - 35.0), Mm(49.8), Mm(mid + 35.0), Mm(50.0))
                .with_mode(PaintMode::Stroke),
        );
        centered(&layer, "Authorized Signatory", 11.0, mid, 44.0, &bold);
        centered(&layer, &self.signatory, 11.0, mid, 38.0, &regular);

        self.draw_qr(&layer, &regular)?;

        doc.save_to_bytes().map_err(pdf_err)
    }

    fn draw_qr(&self, layer: &PdfLayerReference, font: &IndirectFontRef) -> AppResult<()> {
        let matrix = QrMatrix::encode(&self.verify_url)?;
        let left = PAGE_WIDTH - BORDER_MARGIN - 20.0 - QR_SIZE;
        let bottom = BORDER_MARGIN + 14.0;
        let module = QR_SIZE / matrix.width as f32;

        layer.set_fill_color(rgb(BLACK));
        for my in 0..matrix.width {
            for mx in 0..matrix.width {
                if !matrix.is_dark(mx, my) {
                    continue;
                }
                let x = left + mx as f32 * module;
                let top = bottom + QR_SIZE - my as f32 * module;
                layer.add_rect(
                    Rect::new(Mm(x), Mm(top - module), Mm(x + module), Mm(top))
                        .with_mode(PaintMode::Fill),
                );
            }
        }

        layer.set_fill_color(rgb(FOOTER_GRAY));
        centered(
            layer,
            "Scan to verify certificate authenticity",
            9.0,
            left + QR_SIZE / 2.0,
            bottom - 5.0,
            font,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> CertificateDocument {
        let code = Uuid::new_v4();
        CertificateDocument {
            student_name: "Ada Lovelace".to_string(),
            course_title: "Rust Basics".to_string(),
            verification_code: code,
            issued_at: Utc::now(),
            verify_url: format!("http://127.0.0.1:8000/certificates/verify/{code}"),
            issuer_name: "EduVillage".to_string(),
            issuer_tagline: "empowering future developers".to_string(),
            signatory: "Director of Learning, EduVillage".to_string(),
        }
    }

    #[test]
    fn test_renders_pdf_document() {
        let bytes = document().render().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_text_width_estimate_scales() {
        assert!(text_width_mm("abcd", 20.0) > text_width_mm("abcd", 10.0));
        assert!(text_width_mm("abcdefgh", 10.0) > text_width_mm("abcd", 10.0));
    }
}
