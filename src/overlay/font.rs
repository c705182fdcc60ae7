//! Minimal 5x7 bitmap font for overlay label tags.
//!
//! Covers lowercase letters, digits, and the punctuation used by tag text
//! ("label (87.6%)"). Uppercase input is folded to lowercase; characters
//! without a glyph advance the cursor without drawing.

use image::{Rgb, RgbImage};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Blank columns between glyphs, pre-scale.
pub const GLYPH_SPACING: u32 = 1;

/// Pixel width of `text` at `scale`, including inter-glyph spacing.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale.max(1);
    text.chars().count() as u32 * advance
}

/// Pixel height of a text line at `scale`.
pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale.max(1)
}

/// Draw one line of text with its top-left corner at (x, y).
///
/// Pixels falling outside the canvas are clipped; coordinates may be
/// negative.
pub fn draw_text(canvas: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>, scale: u32) {
    let scale = scale.max(1) as i64;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) as i64 * scale;
    let mut cursor_x = x;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            draw_glyph(canvas, cursor_x, y, &rows, color, scale);
        }
        cursor_x += advance;
    }
}

fn draw_glyph(canvas: &mut RgbImage, x: i64, y: i64, rows: &[u8; 7], color: Rgb<u8>, scale: i64) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH as i64 {
            if bits & (0b10000 >> col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + col * scale + dx;
                    let py = y + row as i64 * scale + dy;
                    if px >= 0 && px < width && py >= 0 && py < height {
                        canvas.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

/// Glyph rows, top to bottom; bit 4 is the leftmost column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c.to_ascii_lowercase() {
        ' ' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'b' => [0b10000, 0b10000, 0b10110, 0b11001, 0b10001, 0b10001, 0b11110],
        'c' => [0b00000, 0b00000, 0b01110, 0b10000, 0b10000, 0b10001, 0b01110],
        'd' => [0b00001, 0b00001, 0b01101, 0b10011, 0b10001, 0b10001, 0b01111],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        'f' => [0b00110, 0b01001, 0b01000, 0b11100, 0b01000, 0b01000, 0b01000],
        'g' => [0b00000, 0b01111, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'h' => [0b10000, 0b10000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'i' => [0b00100, 0b00000, 0b01100, 0b00100, 0b00100, 0b00100, 0b01110],
        'j' => [0b00010, 0b00000, 0b00110, 0b00010, 0b00010, 0b10010, 0b01100],
        'k' => [0b10000, 0b10000, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010],
        'l' => [0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'm' => [0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10101, 0b10101],
        'n' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'o' => [0b00000, 0b00000, 0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
        'p' => [0b00000, 0b00000, 0b11110, 0b10001, 0b11110, 0b10000, 0b10000],
        'q' => [0b00000, 0b00000, 0b01101, 0b10011, 0b01111, 0b00001, 0b00001],
        'r' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10000, 0b10000, 0b10000],
        's' => [0b00000, 0b00000, 0b01110, 0b10000, 0b01110, 0b00001, 0b11110],
        't' => [0b01000, 0b01000, 0b11100, 0b01000, 0b01000, 0b01001, 0b00110],
        'u' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10001, 0b10011, 0b01101],
        'v' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'w' => [0b00000, 0b00000, 0b10001, 0b10001, 0b10101, 0b10101, 0b01010],
        'x' => [0b00000, 0b00000, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001],
        'y' => [0b00000, 0b00000, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'z' => [0b00000, 0b00000, 0b11111, 0b00010, 0b00100, 0b01000, 0b11111],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: Rgb<u8> = Rgb([255, 255, 255]);
    const PAPER: Rgb<u8> = Rgb([0, 0, 0]);

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, PAPER)
    }

    fn lit_pixels(canvas: &RgbImage) -> usize {
        canvas.pixels().filter(|p| **p == INK).count()
    }

    #[test]
    fn text_width_counts_spacing_and_scale() {
        assert_eq!(text_width("abc", 1), 3 * 6);
        assert_eq!(text_width("abc", 2), 3 * 12);
        assert_eq!(text_width("", 2), 0);
    }

    #[test]
    fn uppercase_folds_to_lowercase() {
        assert_eq!(glyph('A'), glyph('a'));
        assert_eq!(glyph('Z'), glyph('z'));
    }

    #[test]
    fn tag_text_characters_all_have_glyphs() {
        for c in "abcdefghijklmnopqrstuvwxyz0123456789 ().%-_".chars() {
            assert!(glyph(c).is_some(), "missing glyph for {:?}", c);
        }
    }

    #[test]
    fn draw_marks_pixels_scaled() {
        let mut one = blank(16, 16);
        draw_text(&mut one, 0, 0, ".", INK, 1);
        let single = lit_pixels(&one);
        assert!(single > 0);

        let mut two = blank(32, 32);
        draw_text(&mut two, 0, 0, ".", INK, 2);
        assert_eq!(lit_pixels(&two), single * 4);
    }

    #[test]
    fn drawing_off_canvas_clips_instead_of_panicking() {
        let mut canvas = blank(10, 10);
        draw_text(&mut canvas, -40, -40, "person", INK, 2);
        draw_text(&mut canvas, 8, 8, "person", INK, 2);
        draw_text(&mut canvas, 500, 500, "person", INK, 2);
    }

    #[test]
    fn unknown_characters_draw_nothing() {
        let mut canvas = blank(32, 16);
        draw_text(&mut canvas, 0, 0, "\u{00e9}\u{4e16}", INK, 1);
        assert_eq!(lit_pixels(&canvas), 0);
    }
}
