//! Chunky block lettering for banners and the revealed title.

use std::collections::HashMap;

use once_cell::sync::Lazy;

const ROWS: usize = 7;
const COLS: usize = 5;
/// Each lit pixel is drawn two cells wide so letters look square.
const CELL: usize = 2;
const GAP: usize = 2;
const SHADOW: usize = 1;
const FILL: char = '█';
const SHADE: char = '░';

/// Rows of a glyph, most significant of the low five bits on the left.
type Bitmap = [u8; ROWS];

const TABLE: &[(char, Bitmap)] = &[
    ('A', [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('B', [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('C', [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
    ('D', [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110]),
    ('E', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110]),
    ('H', [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111]),
    ('J', [0b00001, 0b00001, 0b00001, 0b00001, 0b10001, 0b10001, 0b01110]),
    ('K', [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
    ('L', [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', [0b10001, 0b11001, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('N', [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001]),
    ('O', [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('Q', [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
    ('R', [0b11110, 0b10001, 0b10001, 0b11110, 0b10010, 0b10001, 0b10001]),
    ('S', [0b01110, 0b10001, 0b10000, 0b01110, 0b00001, 0b10001, 0b01110]),
    ('T', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('U', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('V', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
    ('W', [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
    ('X', [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
    ('Y', [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('Z', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
    ('0', [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', [0b00100, 0b01100, 0b10100, 0b00100, 0b00100, 0b00100, 0b11111]),
    ('2', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110]),
    ('4', [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', [0b11111, 0b10000, 0b10000, 0b11110, 0b00001, 0b10001, 0b01110]),
    ('6', [0b01110, 0b10001, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000]),
    ('8', [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b10001, 0b01110]),
    (' ', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000]),
    ('?', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100]),
    ('.', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100]),
    (',', [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000]),
    ('\'', [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000]),
    ('!', [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100]),
    ('&', [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101]),
    ('-', [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
    (':', [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000]),
    ('(', [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010]),
    (')', [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000]),
];

static GLYPHS: Lazy<HashMap<char, Bitmap>> = Lazy::new(|| TABLE.iter().copied().collect());

const FALLBACK: Bitmap = [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100];

fn glyph(ch: char) -> &'static Bitmap {
    GLYPHS.get(&ch.to_ascii_uppercase()).unwrap_or(&FALLBACK)
}

/// Height in rows of any rendered text, shadow included.
pub fn height() -> usize {
    ROWS + SHADOW
}

/// Width in columns that [`render`] would produce for `text`.
pub fn width(text: &str) -> usize {
    let count = text.chars().count();
    if count == 0 {
        return 0;
    }
    count * COLS * CELL + (count - 1) * GAP + SHADOW * CELL
}

/// Render `text` in block letters with a drop shadow.
///
/// Characters without a glyph render as `?`.
pub fn render(text: &str) -> Vec<String> {
    let total = width(text);
    let mut canvas = vec![vec![' '; total]; height()];

    for layer in [SHADE, FILL] {
        let (dy, dx) = if layer == SHADE {
            (SHADOW, SHADOW * CELL)
        } else {
            (0, 0)
        };
        for (index, ch) in text.chars().enumerate() {
            let left = index * (COLS * CELL + GAP);
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in (0..COLS).filter(|col| bits & (1 << (COLS - 1 - col)) != 0) {
                    for offset in 0..CELL {
                        let cell = &mut canvas[row + dy][left + col * CELL + offset + dx];
                        if layer == FILL || *cell == ' ' {
                            *cell = layer;
                        }
                    }
                }
            }
        }
    }

    canvas
        .into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect()
}

/// Render `text` only if it fits in `max_width` columns.
pub fn render_within(text: &str, max_width: usize) -> Option<Vec<String>> {
    (width(text) <= max_width).then(|| render(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_dimensions() {
        let lines = render("CENSORDLE");
        assert_eq!(lines.len(), height());
        assert!(lines.iter().all(|line| line.chars().count() <= width("CENSORDLE")));
        assert!(lines[0].starts_with(' '));
        assert!(lines[0].contains(FILL));
        assert!(lines[ROWS].contains(SHADE));
        assert!(!lines[ROWS].contains(FILL));
    }

    #[test]
    fn lowercase_matches_uppercase() {
        assert_eq!(render("up"), render("UP"));
    }

    #[test]
    fn unknown_characters_fall_back() {
        assert_eq!(render("é"), render("?"));
    }

    #[test]
    fn empty_text_renders_blank_rows() {
        assert!(render("").iter().all(String::is_empty));
        assert_eq!(width(""), 0);
    }

    #[test]
    fn render_within_respects_width() {
        assert!(render_within("ALIEN", width("ALIEN")).is_some());
        assert!(render_within("ALIEN", width("ALIEN") - 1).is_none());
    }
}
