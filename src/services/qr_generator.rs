use base64::{engine::general_purpose::STANDARD, Engine};
use qrcode::render::svg;
use qrcode::QrCode;

use crate::models::student::Student;

#[derive(thiserror::Error, Debug)]
pub enum QrRenderError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Student has no QR payload")]
    EmptyPayload,
}

fn encode(payload: &str) -> Result<QrCode, QrRenderError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(QrRenderError::EmptyPayload);
    }
    Ok(QrCode::new(payload.as_bytes())?)
}

/// Generates a QR code SVG for an attendance payload
pub fn generate_qr_svg(payload: &str) -> Result<String, QrRenderError> {
    let code = encode(payload)?;

    let svg = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .quiet_zone(true)
        .build();

    Ok(svg)
}

/// Generates a QR code PNG for an attendance payload
pub fn generate_qr_png(payload: &str) -> Result<Vec<u8>, QrRenderError> {
    use image::{ImageBuffer, Luma};

    let code = encode(payload)?;

    // Each module is drawn as a square of pixels, with a 4-module quiet zone
    let module_size = 10u32;
    let quiet = 4u32;
    let width = code.width() as u32;
    let img_size = (width + 2 * quiet) * module_size;

    let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_fn(img_size, img_size, |x, y| {
        let module_x = (x / module_size) as i64 - quiet as i64;
        let module_y = (y / module_size) as i64 - quiet as i64;
        let inside = (0..width as i64).contains(&module_x) && (0..width as i64).contains(&module_y);
        if inside && code[(module_x as usize, module_y as usize)] == qrcode::types::Color::Dark {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )?;

    Ok(png_data)
}

/// `data:` URI of the PNG, embedded in the printable student card
pub fn png_data_uri(payload: &str) -> Result<String, QrRenderError> {
    let png = generate_qr_png(payload)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// SVG of a student's attendance code
pub fn student_qr_svg(student: &Student) -> Result<String, QrRenderError> {
    generate_qr_svg(&student.qr_payload())
}

pub fn student_qr_png(student: &Student) -> Result<Vec<u8>, QrRenderError> {
    generate_qr_png(&student.qr_payload())
}
