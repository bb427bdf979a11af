//! Draws pictures with upper half blocks: every cell shows two pixels, the
//! top one as foreground and the bottom one as background.

use image::{
    imageops::FilterType,
    DynamicImage,
    Rgba,
};
use ratatui::{
    style::{
        Color,
        Style,
    },
    text::{
        Line,
        Span,
    },
};

use crate::notes::NoteKey;

const HALF_BLOCK: &str = "▀";

/// Downscales `image` to fit `width` x `height` cells, keeping its aspect ratio.
pub fn to_lines(image: &DynamicImage, width: u16, height: u16) -> Vec<Line<'static>> {
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let scaled = image.resize(width as u32, height as u32 * 2, FilterType::Triangle).to_rgba8();
    let (w, h) = scaled.dimensions();

    (0..h)
        .step_by(2)
        .map(|y| {
            let spans = (0..w)
                .map(|x| {
                    let top = color(scaled.get_pixel(x, y));
                    let bottom = if y + 1 < h { color(scaled.get_pixel(x, y + 1)) } else { Color::Reset };
                    Span::styled(HALF_BLOCK, Style::default().fg(top).bg(bottom))
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}

fn color(pixel: &Rgba<u8>) -> Color {
    let [r, g, b, _] = pixel.0;
    Color::Rgb(r, g, b)
}

/// Rendered cells of the last drawn image, reused while the note and the
/// area stay the same.
#[derive(Default)]
pub struct ImageCells {
    key: Option<(NoteKey, u16, u16)>,
    lines: Vec<Line<'static>>,
}

impl ImageCells {
    pub fn get(&mut self, key: &NoteKey, image: &DynamicImage, width: u16, height: u16) -> &[Line<'static>] {
        let wanted = (key.clone(), width, height);
        if self.key.as_ref() != Some(&wanted) {
            self.lines = to_lines(image, width, height);
            self.key = Some(wanted);
        }
        &self.lines
    }
}
