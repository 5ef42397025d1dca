use base64::{engine::general_purpose::STANDARD, Engine};
use qrcode::render::svg;
use qrcode::QrCode;

#[derive(thiserror::Error, Debug)]
pub enum QrGenerationError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Generates a QR code SVG encoding the verification URL
pub fn generate_qr_svg(data: &str) -> Result<String, QrGenerationError> {
    let code = QrCode::new(data.as_bytes())?;

    let svg = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#1e3a8a"))
        .light_color(svg::Color("#ffffff"))
        .build();

    // Inline markup only; drop the XML prolog
    let start = svg.find("<svg").unwrap_or(0);
    Ok(svg[start..].to_string())
}

/// Generates a QR code PNG encoding the verification URL
pub fn generate_qr_png(data: &str) -> Result<Vec<u8>, QrGenerationError> {
    use image::{ImageBuffer, Luma};

    let code = QrCode::new(data.as_bytes())?;

    // 10x10 pixels per module plus a four-module quiet zone
    let module_size = 10u32;
    let quiet_zone = 4u32;
    let width = code.width() as u32;
    let img_size = (width + quiet_zone * 2) * module_size;

    let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_fn(img_size, img_size, |x, y| {
        let module_x = (x / module_size).checked_sub(quiet_zone);
        let module_y = (y / module_size).checked_sub(quiet_zone);

        match (module_x, module_y) {
            (Some(mx), Some(my)) if mx < width && my < width => {
                match code[(mx as usize, my as usize)] {
                    qrcode::types::Color::Dark => Luma([0u8]),
                    qrcode::types::Color::Light => Luma([255u8]),
                }
            }
            _ => Luma([255u8]),
        }
    });

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )?;

    Ok(png_data)
}

/// Wraps PNG bytes in a `data:` URL suitable for a download link
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
