use std::fmt;

use bitvec::{BitArr, array::BitArray};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Monochrome 64x32 pixel grid. Only clear and XOR-blit mutate it.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: BitArray::ZERO,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Pixel at column `x`, row `y`. Coordinates wrap around the screen edges.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::offset(x, y)]
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.not_any()
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.count_ones()
    }

    fn offset(x: usize, y: usize) -> usize {
        (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
    }

    /// XORs one sprite row into the grid, MSB at column `x`. Columns past the
    /// right edge wrap to the left, rows past the bottom wrap to the top.
    ///
    /// Returns true if any pixel was switched from on to off.
    pub fn blit_row(&mut self, sprite: u8, x: usize, y: usize) -> bool {
        let mut erased = false;
        for bit in 0..8 {
            if (sprite >> (7 - bit)) & 1 == 0 {
                continue;
            }
            let index = Self::offset(x + bit, y);
            let current = self.pixels[index];
            erased |= current;
            self.pixels.set(index, !current);
        }
        erased
    }

    /// Draws consecutive sprite rows starting at `(x, y)`, one row per byte.
    /// Returns true if any row erased a pixel.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        rows.iter()
            .enumerate()
            .fold(false, |collision, (row, &byte)| {
                self.blit_row(byte, x, y + row) | collision
            })
    }

    /// Iterates the grid row by row.
    pub fn rows(&self) -> impl Iterator<Item = &bitvec::slice::BitSlice> {
        self.pixels[..DISPLAY_WIDTH * DISPLAY_HEIGHT].chunks(DISPLAY_WIDTH)
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for pixel in row.iter().by_vals() {
                f.write_str(if pixel { "█" } else { " " })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("lit_pixels", &self.lit_pixels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_sets_pixels_msb_first() {
        let mut fb = Framebuffer::new();
        assert!(!fb.blit_row(0b1010_0001, 3, 4));
        let lit: Vec<usize> = (0..8).filter(|i| fb.pixel(3 + i, 4)).collect();
        assert_eq!(lit, vec![0, 2, 7]);
        assert_eq!(fb.lit_pixels(), 3);
    }

    #[test]
    fn zero_bits_never_erase() {
        let mut fb = Framebuffer::new();
        fb.blit_row(0xFF, 0, 0);
        assert!(!fb.blit_row(0x00, 0, 0));
        assert_eq!(fb.lit_pixels(), 8);
    }

    #[test]
    fn double_draw_restores_and_reports_collision() {
        let mut fb = Framebuffer::new();
        fb.blit_row(0b1000_0000, 10, 10);
        let before = fb.clone();

        let sprite = [0xF0, 0x90, 0x90, 0x90, 0xF0];
        assert!(fb.draw_sprite(10, 10, &sprite));
        assert!(fb.draw_sprite(10, 10, &sprite));
        assert_eq!(fb, before);
    }

    #[test]
    fn second_pass_collides_on_empty_screen() {
        let mut fb = Framebuffer::new();
        let sprite = [0x3C, 0x42];
        assert!(!fb.draw_sprite(5, 5, &sprite));
        assert!(fb.draw_sprite(5, 5, &sprite));
        assert!(fb.is_blank());
    }

    #[test]
    fn coordinates_wrap_at_edges() {
        let mut fb = Framebuffer::new();
        fb.blit_row(0xFF, 60, 31);
        for x in 60..64 {
            assert!(fb.pixel(x, 31));
        }
        for x in 0..4 {
            assert!(fb.pixel(x, 31));
        }
        assert!(!fb.pixel(4, 31));

        fb.clear();
        fb.draw_sprite(0, 31, &[0x80, 0x80]);
        assert!(fb.pixel(0, 31));
        assert!(fb.pixel(0, 0));
    }

    #[test]
    fn clear_resets_everything() {
        let mut fb = Framebuffer::new();
        for i in 0..20 {
            fb.draw_sprite(i * 3, i, &[0xA5, 0x5A, 0xFF]);
        }
        assert!(!fb.is_blank());
        fb.clear();
        assert_eq!(fb, Framebuffer::new());
    }

    #[test]
    fn renders_as_text() {
        let mut fb = Framebuffer::new();
        fb.blit_row(0xC0, 0, 0);
        let text = fb.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines[0].starts_with("██ "));
        assert_eq!(lines[0].chars().count(), DISPLAY_WIDTH);
        assert!(lines[1].chars().all(|c| c == ' '));
    }
}
