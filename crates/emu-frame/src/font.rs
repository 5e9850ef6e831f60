//! The built-in 8×8 bitmap font.
//!
//! 128 glyphs of 8 row bytes each, bit 7 = leftmost pixel. The binary is
//! produced by `dev/make_font.py` and copied into the font region at
//! `$E800` on every reset, where guest code may read (or overwrite) it.

/// Number of glyphs in the font.
pub const GLYPH_COUNT: usize = 128;

/// Rows (and pixels per row) of a glyph.
pub const GLYPH_SIZE: usize = 8;

/// The font image, 128 × 8 bytes.
pub static FONT: &[u8; GLYPH_COUNT * GLYPH_SIZE] = include_bytes!("../data/font.bin");

/// The 8 row bytes of a glyph. Codes above 127 wrap into the table.
#[must_use]
pub fn glyph(code: u8) -> &'static [u8] {
    let index = usize::from(code % GLYPH_COUNT as u8) * GLYPH_SIZE;
    &FONT[index..index + GLYPH_SIZE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_is_blank() {
        assert!(glyph(b' ').iter().all(|&row| row == 0));
    }

    #[test]
    fn printable_glyphs_have_pixels() {
        for code in 0x21..0x7F {
            assert!(
                glyph(code).iter().any(|&row| row != 0),
                "glyph {code:#04x} is empty"
            );
        }
    }

    #[test]
    fn rows_are_msb_leftmost() {
        // '|' is a centred vertical bar: every row has the same single pixel
        // in the left half of the cell.
        let bar = glyph(b'|');
        assert!(bar.iter().all(|&row| row == bar[0]));
        assert!(bar[0] & 0xF0 != 0);
    }
}
