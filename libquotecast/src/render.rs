//! Quote image rendering
//!
//! Layout is computed by a pure function over a text-measuring closure, so
//! it can be checked without a font. [`ImageRenderer`] rasterizes that
//! layout onto a black and gold 4:5 canvas and writes it as a JPEG.

use std::io::Write;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut, text_size};
use tracing::debug;

use crate::error::RenderError;
use crate::generation::strip_quote_marks;
use crate::types::Quote;

pub const CANVAS_WIDTH: u32 = 1080;
pub const CANVAS_HEIGHT: u32 = 1350;
pub const LINE_HEIGHT: f32 = 85.0;
pub const QUOTE_FONT_SIZE: f32 = 68.0;
pub const AUTHOR_FONT_SIZE: f32 = 36.0;
pub const FOOTER_FONT_SIZE: f32 = 24.0;
pub const FOOTER_TAG: &str = "#mindset";
const JPEG_QUALITY: u8 = 95;

const GOLD: [u8; 3] = [212, 175, 55];
const GOLD_TEXT: [u8; 3] = [0xDD, 0xC2, 0x72];

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `quote` signed with `handle`, returning the artifact path
    async fn render(&self, quote: &Quote, handle: &str) -> Result<PathBuf, RenderError>;
}

/// A single horizontally centered line of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Baseline position from the top of the canvas
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub quote_lines: Vec<TextLine>,
    /// Vertical position and horizontal extent of the divider
    pub divider_y: f32,
    pub divider_x: (f32, f32),
    pub author: TextLine,
    pub tag: TextLine,
    pub handle: TextLine,
}

/// Greedy word wrap
///
/// Words are appended while the line fits within `max_width`. The first
/// word always stays on the first line even if it alone is too wide.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for (i, word) in text.split_whitespace().enumerate() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };

        if measure(&candidate) > max_width && i > 0 {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Compute the layout for a quote on the standard canvas
pub fn layout(quote: &Quote, handle: &str, measure: impl Fn(&str) -> f32) -> Layout {
    let width = CANVAS_WIDTH as f32;
    let height = CANVAS_HEIGHT as f32;
    let content = strip_quote_marks(&quote.content);

    let mut y = height * 0.4;
    let wrapped = wrap_words(&content, width * 0.85, measure);
    let mut quote_lines = Vec::with_capacity(wrapped.len());
    for (i, text) in wrapped.into_iter().enumerate() {
        if i > 0 {
            y += LINE_HEIGHT;
        }
        quote_lines.push(TextLine { text, baseline: y });
    }

    let divider_y = y + LINE_HEIGHT * 0.5;
    let author_y = divider_y + LINE_HEIGHT * 0.8;

    Layout {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
        quote_lines,
        divider_y,
        divider_x: (width * 0.3, width * 0.7),
        author: TextLine {
            text: quote.author.clone(),
            baseline: author_y,
        },
        tag: TextLine {
            text: FOOTER_TAG.to_string(),
            baseline: height - 100.0,
        },
        handle: TextLine {
            text: format!("@{}", handle),
            baseline: height - 40.0,
        },
    }
}

/// Gold blended over black at `alpha`
fn gold(alpha: f32) -> Rgb<u8> {
    shade(GOLD, alpha)
}

fn shade(color: [u8; 3], alpha: f32) -> Rgb<u8> {
    let a = alpha.clamp(0.0, 1.0);
    Rgb([
        (color[0] as f32 * a).round() as u8,
        (color[1] as f32 * a).round() as u8,
        (color[2] as f32 * a).round() as u8,
    ])
}

fn draw_background(canvas: &mut RgbImage) {
    let w = canvas.width() as i32;
    let h = canvas.height() as i32;

    let pattern = gold(0.1);
    let mut i = -h;
    while i < w + h {
        draw_line_segment_mut(canvas, (i as f32, 0.0), ((i + h) as f32, h as f32), pattern);
        i += 40;
    }

    let corner = gold(0.3);
    let (wf, hf) = (w as f32, h as f32);
    let (inset, size) = (30.0, 100.0);
    let brackets = [
        [(inset, size), (inset, inset), (size, inset)],
        [(wf - size, inset), (wf - inset, inset), (wf - inset, size)],
        [(inset, hf - size), (inset, hf - inset), (size, hf - inset)],
        [(wf - size, hf - inset), (wf - inset, hf - inset), (wf - inset, hf - size)],
    ];
    for [a, b, c] in brackets {
        for offset in [0.0, 1.0] {
            let shift = |p: (f32, f32)| (p.0 + offset, p.1 + offset);
            draw_line_segment_mut(canvas, shift(a), shift(b), corner);
            draw_line_segment_mut(canvas, shift(b), shift(c), corner);
        }
    }
}

fn draw_centered(
    canvas: &mut RgbImage,
    font: &FontVec,
    size: f32,
    color: Rgb<u8>,
    line: &TextLine,
) {
    let scale = PxScale::from(size);
    let (text_width, _) = text_size(scale, font, &line.text);
    let x = (canvas.width() as i32 - text_width as i32) / 2;
    // draw_text_mut positions the top of the glyph box; the layout stores baselines
    let y = (line.baseline - size * 0.8).round() as i32;
    draw_text_mut(canvas, color, x, y, scale, font, &line.text);
}

/// Rasterize a layout with the given font
pub fn rasterize(layout: &Layout, font: &FontVec) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(layout.width, layout.height, Rgb([0, 0, 0]));
    draw_background(&mut canvas);

    let text_color = shade(GOLD_TEXT, 1.0);
    for line in &layout.quote_lines {
        draw_centered(&mut canvas, font, QUOTE_FONT_SIZE, text_color, line);
    }

    for offset in [-1.0, 0.0, 1.0] {
        let y = layout.divider_y + offset;
        draw_line_segment_mut(
            &mut canvas,
            (layout.divider_x.0, y),
            (layout.divider_x.1, y),
            text_color,
        );
    }

    draw_centered(&mut canvas, font, AUTHOR_FONT_SIZE, gold(0.8), &layout.author);
    draw_centered(&mut canvas, font, FOOTER_FONT_SIZE, gold(0.5), &layout.tag);
    draw_centered(&mut canvas, font, FOOTER_FONT_SIZE, gold(0.3), &layout.handle);
    canvas
}

/// Load a TrueType/OpenType font from disk
///
/// # Errors
///
/// Returns `RenderError::Font` if the file is unreadable or not a font.
pub fn load_font(path: &Path) -> Result<FontVec, RenderError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))
}

fn write_jpeg(canvas: &RgbImage, path: &Path) -> Result<(), RenderError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        encoder.encode_image(canvas)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders quotes to a JPEG at a fixed output path
pub struct ImageRenderer {
    font_path: PathBuf,
    output_path: PathBuf,
}

impl ImageRenderer {
    pub fn new(font_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            font_path,
            output_path,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn render_blocking(
        font_path: &Path,
        output_path: &Path,
        quote: &Quote,
        handle: &str,
    ) -> Result<PathBuf, RenderError> {
        let font = load_font(font_path)?;
        let scale = PxScale::from(QUOTE_FONT_SIZE);
        let layout = layout(quote, handle, |s| text_size(scale, &font, s).0 as f32);
        debug!("Laid out quote on {} lines", layout.quote_lines.len());

        let canvas = rasterize(&layout, &font);
        write_jpeg(&canvas, output_path)?;
        Ok(output_path.to_path_buf())
    }
}

#[async_trait]
impl Renderer for ImageRenderer {
    async fn render(&self, quote: &Quote, handle: &str) -> Result<PathBuf, RenderError> {
        let font_path = self.font_path.clone();
        let output_path = self.output_path.clone();
        let quote = quote.clone();
        let handle = handle.to_string();

        tokio::task::spawn_blocking(move || {
            Self::render_blocking(&font_path, &output_path, &quote, &handle)
        })
        .await
        .map_err(|e| RenderError::Io(std::io::Error::other(e.to_string())))?
    }
}
