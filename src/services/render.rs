use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb};
use qrcode::QrCode;
use qrcode::render::svg;
use qrcode::types::QrError;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::validation::parse_hex_color;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("QR code generation error: {0}")]
    Encode(#[from] QrError),
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid color {0}")]
    Color(String),
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    #[default]
    Svg,
    Png,
}

impl ImageKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Svg => "image/svg+xml",
            ImageKind::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderSpec<'a> {
    pub content: &'a str,
    pub foreground: &'a str,
    pub background: &'a str,
    pub size: u32,
}

pub struct RenderedImage {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

pub fn render(spec: &RenderSpec<'_>, kind: ImageKind) -> Result<RenderedImage, RenderError> {
    let bytes = match kind {
        ImageKind::Svg => render_svg(spec)?.into_bytes(),
        ImageKind::Png => render_png(spec)?,
    };
    Ok(RenderedImage { kind, bytes })
}

pub fn render_svg(spec: &RenderSpec<'_>) -> Result<String, RenderError> {
    let code = QrCode::new(spec.content.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(spec.size, spec.size)
        .dark_color(svg::Color(spec.foreground))
        .light_color(svg::Color(spec.background))
        .quiet_zone(true)
        .build())
}

pub fn render_png(spec: &RenderSpec<'_>) -> Result<Vec<u8>, RenderError> {
    let dark = color(spec.foreground)?;
    let light = color(spec.background)?;
    let code = QrCode::new(spec.content.as_bytes())?;
    let pixels = code
        .render::<Rgb<u8>>()
        .min_dimensions(spec.size, spec.size)
        .dark_color(dark)
        .light_color(light)
        .quiet_zone(true)
        .build();

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(pixels).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn color(hex: &str) -> Result<Rgb<u8>, RenderError> {
    parse_hex_color(hex)
        .map(Rgb)
        .ok_or_else(|| RenderError::Color(hex.to_string()))
}
